//! Advertising Data: Local Name

use super::*;

/// An advertised local name
///
/// A local name within an advertising payload is either complete or shortened, indicated by the
/// AD type of the structure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LocalName<'a> {
    name: &'a str,
    complete: bool,
}

impl<'a> LocalName<'a> {
    const SHORTENED: AdType = AdType::ShortenedLocalName;
    const COMPLETE: AdType = AdType::CompleteLocalName;

    pub fn new(name: &'a str, complete: bool) -> Self {
        LocalName { name, complete }
    }

    /// True if this is the complete name of the device
    pub fn is_complete(&self) -> bool {
        self.complete
    }
}

impl AsRef<str> for LocalName<'_> {
    fn as_ref(&self) -> &str {
        self.name
    }
}

impl core::ops::Deref for LocalName<'_> {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.name
    }
}

impl IntoAdStruct for LocalName<'_> {
    fn data_len(&self) -> usize {
        self.name.len()
    }

    fn convert_into<'a>(&self, b: &'a mut [u8]) -> Result<AdStruct<'a>, ConvertError> {
        let ad_type = if self.complete { Self::COMPLETE } else { Self::SHORTENED };

        let mut writer = StructWriter::new(b, ad_type, self.data_len())?;

        writer.extend(self.name.as_bytes());

        Ok(writer.finish())
    }
}

impl<'a> TryFromAdStruct<'a> for LocalName<'a> {
    fn try_from_ad_struct(ad: AdStruct<'a>) -> Result<Self, Error> {
        let complete = if ad.ad_type() == Self::COMPLETE.value() {
            true
        } else if ad.ad_type() == Self::SHORTENED.value() {
            false
        } else {
            return Err(Error::WrongAdType);
        };

        let name = core::str::from_utf8(ad.data())?;

        Ok(LocalName { name, complete })
    }
}
