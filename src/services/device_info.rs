//! The device information service (0x180A)

use super::{require_characteristic, ServiceClient};
use crate::adapter::{Adapter, LocalService, RemoteService};
use crate::attribute::{Properties, Property};
use crate::characteristic::{Characteristic, ValueFormat};
use crate::radio::{BleRadio, Connection};
use crate::uuid::Uuid;
use crate::Error;

pub const SERVICE_UUID: Uuid = Uuid::from_u16(0x180A);

const MODEL_NUMBER: Uuid = Uuid::from_u16(0x2A24);
const SERIAL_NUMBER: Uuid = Uuid::from_u16(0x2A25);
const FIRMWARE_REVISION: Uuid = Uuid::from_u16(0x2A26);
const HARDWARE_REVISION: Uuid = Uuid::from_u16(0x2A27);
const SOFTWARE_REVISION: Uuid = Uuid::from_u16(0x2A28);
const MANUFACTURER: Uuid = Uuid::from_u16(0x2A29);
const PNP_ID: Uuid = Uuid::from_u16(0x2A50);

/// A client for the device information service of a peer
///
/// Characteristics the peer chose not to expose read as [`Error::NoSuchCharacteristic`].
pub struct DeviceInfoService<A: Adapter> {
    connection: Connection<A>,
    service: RemoteService,
}

impl<A: Adapter> DeviceInfoService<A> {
    fn read_string(&self, uuid: Uuid) -> Result<String, Error> {
        let remote = require_characteristic(&self.service, uuid)?;

        self.connection.bind_characteristic(remote).read()
    }

    pub fn model_number(&self) -> Result<String, Error> {
        self.read_string(MODEL_NUMBER)
    }

    pub fn serial_number(&self) -> Result<String, Error> {
        self.read_string(SERIAL_NUMBER)
    }

    pub fn firmware_revision(&self) -> Result<String, Error> {
        self.read_string(FIRMWARE_REVISION)
    }

    pub fn hardware_revision(&self) -> Result<String, Error> {
        self.read_string(HARDWARE_REVISION)
    }

    pub fn software_revision(&self) -> Result<String, Error> {
        self.read_string(SOFTWARE_REVISION)
    }

    pub fn manufacturer(&self) -> Result<String, Error> {
        self.read_string(MANUFACTURER)
    }

    /// Vendor id source, vendor id, product id, product version
    pub fn pnp_id(&self) -> Result<(u8, u16, u16, u16), Error> {
        let remote = require_characteristic(&self.service, PNP_ID)?;

        self.connection.bind_characteristic(remote).read()
    }
}

impl<A: Adapter> ServiceClient<A> for DeviceInfoService<A> {
    const UUID: Uuid = SERVICE_UUID;

    fn bind(connection: &Connection<A>, service: &RemoteService) -> Result<Self, Error> {
        Ok(DeviceInfoService {
            connection: connection.clone(),
            service: service.clone(),
        })
    }
}

/// The device information published by the local GATT server
///
/// Every field is optional; only the populated ones become characteristics. The values are
/// fixed at registration time.
#[derive(Clone, Debug, Default)]
pub struct DeviceInfo {
    pub model_number: Option<String>,
    pub serial_number: Option<String>,
    pub firmware_revision: Option<String>,
    pub hardware_revision: Option<String>,
    pub software_revision: Option<String>,
    pub manufacturer: Option<String>,
    pub pnp_id: Option<(u8, u16, u16, u16)>,
}

impl DeviceInfo {
    /// Register the populated fields as a device information service
    pub fn register<A: Adapter>(&self, radio: &BleRadio<A>) -> Result<(), Error> {
        let read_only: Properties = [Property::Read].into_iter().collect();

        let mut service = LocalService::new(SERVICE_UUID);

        let strings = [
            (MODEL_NUMBER, &self.model_number),
            (SERIAL_NUMBER, &self.serial_number),
            (FIRMWARE_REVISION, &self.firmware_revision),
            (HARDWARE_REVISION, &self.hardware_revision),
            (SOFTWARE_REVISION, &self.software_revision),
            (MANUFACTURER, &self.manufacturer),
        ];

        for (uuid, value) in strings {
            if let Some(value) = value {
                service = service.with_characteristic(
                    Characteristic::new(uuid)
                        .with_properties(read_only)
                        .with_max_length(value.len())
                        .fixed_length()
                        .with_initial_value(value.clone().into_bytes()),
                );
            }
        }

        if let Some(pnp_id) = self.pnp_id {
            service = service.with_characteristic(
                Characteristic::new(PNP_ID)
                    .with_properties(read_only)
                    .with_max_length(7)
                    .fixed_length()
                    .with_initial_value(pnp_id.encode()),
            );
        }

        radio.adapter().borrow_mut().register_service(&service)?;

        Ok(())
    }
}
