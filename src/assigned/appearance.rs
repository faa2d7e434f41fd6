//! Advertising Data: Appearance

use super::*;

/// The external appearance of the device
///
/// The value is an assigned number describing the general category of the device (watch,
/// thermometer, keyboard and so on) used by peers when presenting it to a user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Appearance(pub u16);

impl Appearance {
    const AD_TYPE: AdType = AdType::Appearance;

    pub fn category(&self) -> u16 {
        self.0
    }
}

impl IntoAdStruct for Appearance {
    fn data_len(&self) -> usize {
        2
    }

    fn convert_into<'a>(&self, b: &'a mut [u8]) -> Result<AdStruct<'a>, ConvertError> {
        let mut writer = StructWriter::new(b, Self::AD_TYPE, self.data_len())?;

        writer.extend(&self.0.to_le_bytes());

        Ok(writer.finish())
    }
}

impl TryFromAdStruct<'_> for Appearance {
    fn try_from_ad_struct(ad: AdStruct<'_>) -> Result<Self, Error> {
        if ad.ad_type() != Self::AD_TYPE.value() {
            return Err(Error::WrongAdType);
        }

        match ad.data() {
            [lo, hi] => Ok(Appearance(u16::from_le_bytes([*lo, *hi]))),
            _ => Err(Error::BadLength),
        }
    }
}
