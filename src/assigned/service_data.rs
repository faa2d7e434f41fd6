//! Advertising Data: Service Data

use super::*;
use crate::uuid::Uuid;

/// Service data within an advertising payload
///
/// The data is prefixed on air with the UUID of the service it belongs to. The AD type is
/// selected from the UUID width, either the 16-bit or the 128-bit service data type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServiceData<'a> {
    uuid: Uuid,
    data: &'a [u8],
}

impl<'a> ServiceData<'a> {
    pub fn new(uuid: Uuid, data: &'a [u8]) -> Self {
        ServiceData { uuid, data }
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// The data after the UUID prefix
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    fn uuid_width(&self) -> usize {
        if self.uuid.is_16_bit() {
            2
        } else {
            16
        }
    }
}

impl IntoAdStruct for ServiceData<'_> {
    fn data_len(&self) -> usize {
        self.uuid_width() + self.data.len()
    }

    fn convert_into<'a>(&self, b: &'a mut [u8]) -> Result<AdStruct<'a>, ConvertError> {
        let short_bytes;
        let full_bytes;

        let (ad_type, uuid_bytes): (_, &[u8]) = match u16::try_from(self.uuid) {
            Ok(short) => {
                short_bytes = short.to_le_bytes();
                (AdType::ServiceData16bitUuid, &short_bytes[..])
            }
            Err(_) => {
                full_bytes = self.uuid.to_le_bytes();
                (AdType::ServiceData128bitUuid, &full_bytes[..])
            }
        };

        let mut writer = StructWriter::new(b, ad_type, self.data_len())?;

        writer.extend(uuid_bytes);
        writer.extend(self.data);

        Ok(writer.finish())
    }
}

impl<'a> TryFromAdStruct<'a> for ServiceData<'a> {
    fn try_from_ad_struct(ad: AdStruct<'a>) -> Result<Self, Error> {
        let uuid_width = if ad.ad_type() == AdType::ServiceData16bitUuid.value() {
            2
        } else if ad.ad_type() == AdType::ServiceData128bitUuid.value() {
            16
        } else {
            return Err(Error::WrongAdType);
        };

        if ad.data().len() < uuid_width {
            return Err(Error::BadLength);
        }

        let (raw_uuid, data) = ad.data().split_at(uuid_width);

        let uuid = if uuid_width == 2 {
            Uuid::from_u16(u16::from_le_bytes([raw_uuid[0], raw_uuid[1]]))
        } else {
            let mut bytes = [0u8; 16];

            bytes.copy_from_slice(raw_uuid);

            Uuid::from_le_bytes(bytes)
        };

        Ok(ServiceData { uuid, data })
    }
}
