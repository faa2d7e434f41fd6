//! Standard service implementations
//!
//! Each service comes in two shapes: a client that binds to the service on a connected peer,
//! and a registration helper that publishes the service from the local GATT server.

pub mod battery;
pub mod device_info;
pub mod hid;
pub mod nordic;

pub use battery::{BatteryService, LocalBatteryService};
pub use device_info::{DeviceInfo, DeviceInfoService};
pub use hid::{HidServer, ReportInfo};
pub use nordic::{UartServer, UartService};

use crate::adapter::{Adapter, RemoteService};
use crate::radio::Connection;
use crate::uuid::Uuid;
use crate::Error;

/// A typed client for one service of a connected peer
///
/// Obtained through [`Connection::service`], which discovers `UUID` on the peer and hands the
/// result to `bind`.
pub trait ServiceClient<A: Adapter>: Sized {
    /// The service class UUID this client binds to
    const UUID: Uuid;

    /// Build the client from the discovered service
    fn bind(connection: &Connection<A>, service: &RemoteService) -> Result<Self, Error>;
}

/// Find a characteristic in a discovered service or fail with its UUID
pub(crate) fn require_characteristic<'a>(
    service: &'a RemoteService,
    uuid: Uuid,
) -> Result<&'a crate::adapter::RemoteCharacteristic, Error> {
    service
        .characteristic(uuid)
        .ok_or(Error::NoSuchCharacteristic(uuid))
}
