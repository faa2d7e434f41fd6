//! Advertising Data: Manufacturer Specific Data

use super::*;

/// Manufacturer specific data
///
/// The data is prefixed on air with the company identifier assigned to the manufacturer by the
/// Bluetooth SIG. The payload after the identifier is entirely vendor defined.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ManufacturerData<'a> {
    company_id: u16,
    data: &'a [u8],
}

impl<'a> ManufacturerData<'a> {
    const AD_TYPE: AdType = AdType::ManufacturerSpecificData;

    pub fn new(company_id: u16, data: &'a [u8]) -> Self {
        ManufacturerData { company_id, data }
    }

    /// The assigned company identifier
    pub fn company_id(&self) -> u16 {
        self.company_id
    }

    /// The vendor defined payload after the company identifier
    pub fn data(&self) -> &'a [u8] {
        self.data
    }
}

impl IntoAdStruct for ManufacturerData<'_> {
    fn data_len(&self) -> usize {
        2 + self.data.len()
    }

    fn convert_into<'a>(&self, b: &'a mut [u8]) -> Result<AdStruct<'a>, ConvertError> {
        let mut writer = StructWriter::new(b, Self::AD_TYPE, self.data_len())?;

        writer.extend(&self.company_id.to_le_bytes());
        writer.extend(self.data);

        Ok(writer.finish())
    }
}

impl<'a> TryFromAdStruct<'a> for ManufacturerData<'a> {
    fn try_from_ad_struct(ad: AdStruct<'a>) -> Result<Self, Error> {
        if ad.ad_type() != Self::AD_TYPE.value() {
            return Err(Error::WrongAdType);
        }

        if ad.data().len() < 2 {
            return Err(Error::BadLength);
        }

        let (raw_id, data) = ad.data().split_at(2);

        Ok(ManufacturerData {
            company_id: u16::from_le_bytes([raw_id[0], raw_id[1]]),
            data,
        })
    }
}
