//! The battery service (0x180F)

use super::{require_characteristic, ServiceClient};
use crate::adapter::{Adapter, CharacteristicHandle, LocalService, RemoteService};
use crate::attribute::Property;
use crate::characteristic::{BoundCharacteristic, Characteristic, RangedU8, ValueError};
use crate::radio::{BleRadio, Connection};
use crate::uuid::Uuid;
use crate::Error;
use std::cell::RefCell;
use std::rc::Rc;

pub const SERVICE_UUID: Uuid = Uuid::from_u16(0x180F);

const BATTERY_LEVEL: Uuid = Uuid::from_u16(0x2A19);

/// The battery level as a percentage
pub type BatteryLevel = RangedU8<0, 100>;

/// A client for the battery service of a peer
pub struct BatteryService<A: Adapter> {
    level: BoundCharacteristic<A>,
}

impl<A: Adapter> BatteryService<A> {
    /// Read the peer's battery level percentage
    ///
    /// A peer reporting a value above 100 is rejected as out of range.
    pub fn level(&self) -> Result<u8, Error> {
        let level: BatteryLevel = self.level.read()?;

        Ok(level.get())
    }
}

impl<A: Adapter> ServiceClient<A> for BatteryService<A> {
    const UUID: Uuid = SERVICE_UUID;

    fn bind(connection: &Connection<A>, service: &RemoteService) -> Result<Self, Error> {
        let remote = require_characteristic(service, BATTERY_LEVEL)?;

        Ok(BatteryService {
            level: connection.bind_characteristic(remote),
        })
    }
}

/// The battery service published by the local GATT server
///
/// Subscribed peers are notified on every level change.
pub struct LocalBatteryService<A: Adapter> {
    adapter: Rc<RefCell<A>>,
    level: CharacteristicHandle,
}

impl<A: Adapter> LocalBatteryService<A> {
    /// Register the service with an initial level
    pub fn register(radio: &BleRadio<A>, initial_level: u8) -> Result<Self, Error> {
        let initial = BatteryLevel::new(initial_level)?;

        let service = LocalService::new(SERVICE_UUID).with_characteristic(
            Characteristic::new(BATTERY_LEVEL)
                .with_properties([Property::Read, Property::Notify].into_iter().collect())
                .with_max_length(1)
                .fixed_length()
                .with_initial_value(vec![initial.get()]),
        );

        let handles = radio.adapter().borrow_mut().register_service(&service)?;

        let level = handles
            .into_iter()
            .find(|(uuid, _)| *uuid == BATTERY_LEVEL)
            .map(|(_, handle)| handle)
            .ok_or(Error::NoSuchCharacteristic(BATTERY_LEVEL))?;

        Ok(LocalBatteryService {
            adapter: radio.adapter().clone(),
            level,
        })
    }

    /// Publish a new battery level percentage
    pub fn set_level(&self, level: u8) -> Result<(), Error> {
        let level = BatteryLevel::new(level)?;

        self.adapter
            .borrow_mut()
            .write_local(self.level, &[level.get()])?;

        Ok(())
    }

    /// The currently published level
    pub fn level(&self) -> Result<u8, Error> {
        let raw = self.adapter.borrow().read_local(self.level)?;

        match raw.as_slice() {
            [level] => Ok(*level),
            _ => Err(Error::Value(ValueError::WrongSize {
                expected: 1,
                actual: raw.len(),
            })),
        }
    }
}
