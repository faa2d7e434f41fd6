//! Advertising Data: Flags

use super::*;

/// The standard advertising flags
///
/// Only the LE flags of the first octet are modeled; BR/EDR is not supported by this library.
/// A received flags structure keeps its raw octets, so unknown bits survive a decode and
/// re-encode round trip.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Flags {
    bits: u8,
}

impl Flags {
    const AD_TYPE: AdType = AdType::Flags;

    const LIMITED_DISCOVERY: u8 = 1 << 0;
    const GENERAL_DISCOVERY: u8 = 1 << 1;
    const LE_ONLY: u8 = 1 << 2;

    /// Create a flags structure with no flag set
    pub fn new() -> Self {
        Flags::default()
    }

    /// Discoverable only for a limited time period
    pub fn limited_discovery(&self) -> bool {
        self.bits & Self::LIMITED_DISCOVERY != 0
    }

    pub fn set_limited_discovery(&mut self, enable: bool) -> &mut Self {
        self.set(Self::LIMITED_DISCOVERY, enable)
    }

    /// Will advertise until discovered
    pub fn general_discovery(&self) -> bool {
        self.bits & Self::GENERAL_DISCOVERY != 0
    }

    pub fn set_general_discovery(&mut self, enable: bool) -> &mut Self {
        self.set(Self::GENERAL_DISCOVERY, enable)
    }

    /// BR/EDR not supported
    pub fn le_only(&self) -> bool {
        self.bits & Self::LE_ONLY != 0
    }

    pub fn set_le_only(&mut self, enable: bool) -> &mut Self {
        self.set(Self::LE_ONLY, enable)
    }

    /// The raw first octet of the flags data
    pub fn bits(&self) -> u8 {
        self.bits
    }

    pub fn from_bits(bits: u8) -> Self {
        Flags { bits }
    }

    fn set(&mut self, mask: u8, enable: bool) -> &mut Self {
        if enable {
            self.bits |= mask;
        } else {
            self.bits &= !mask;
        }

        self
    }
}

impl IntoAdStruct for Flags {
    fn data_len(&self) -> usize {
        1
    }

    fn convert_into<'a>(&self, b: &'a mut [u8]) -> Result<AdStruct<'a>, ConvertError> {
        let mut writer = StructWriter::new(b, Self::AD_TYPE, self.data_len())?;

        writer.push(self.bits);

        Ok(writer.finish())
    }
}

impl TryFromAdStruct<'_> for Flags {
    fn try_from_ad_struct(ad: AdStruct<'_>) -> Result<Self, Error> {
        if ad.ad_type() != Self::AD_TYPE.value() {
            return Err(Error::WrongAdType);
        }

        let bits = *ad.data().first().ok_or(Error::BadLength)?;

        Ok(Flags { bits })
    }
}
