//! Advertising Data: Tx Power Level

use super::*;

/// The advertised transmit power level in dBm
///
/// A scanner can combine this with the received signal strength to estimate path loss.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TxPower(pub i8);

impl TxPower {
    const AD_TYPE: AdType = AdType::TxPowerLevel;

    pub fn level(&self) -> i8 {
        self.0
    }
}

impl IntoAdStruct for TxPower {
    fn data_len(&self) -> usize {
        1
    }

    fn convert_into<'a>(&self, b: &'a mut [u8]) -> Result<AdStruct<'a>, ConvertError> {
        let mut writer = StructWriter::new(b, Self::AD_TYPE, self.data_len())?;

        writer.push(self.0 as u8);

        Ok(writer.finish())
    }
}

impl TryFromAdStruct<'_> for TxPower {
    fn try_from_ad_struct(ad: AdStruct<'_>) -> Result<Self, Error> {
        if ad.ad_type() != Self::AD_TYPE.value() {
            return Err(Error::WrongAdType);
        }

        match ad.data() {
            [level] => Ok(TxPower(*level as i8)),
            _ => Err(Error::BadLength),
        }
    }
}
