//! An Ergonomic Bluetooth Low Energy Library
//!
//! The primary purpose of easy-ble is to put a friendly layer on top of a native BLE backend.
//! The backend (anything implementing [`Adapter`](adapter::Adapter)) owns the protocol stack
//! and the radio; this library owns everything an application actually wants to say: building
//! and parsing advertisements, scanning with filters, connecting, and talking to GATT services
//! through typed characteristics.
//!
//! The entry point is [`BleRadio`](radio::BleRadio):
//!
//! ```ignore
//! let radio = easy_ble::radio::BleRadio::new(adapter)?;
//!
//! let mut seen = std::collections::HashSet::new();
//!
//! for entry in radio.start_scan(&[AdvertisementKind::Any], ScanParameters::default())? {
//!     if seen.insert(entry.address()) {
//!         println!("{} at {} dBm", entry.address(), entry.rssi());
//!     }
//! }
//! ```

pub mod adapter;
pub mod address;
pub mod advertising;
pub mod assigned;
pub mod attribute;
pub mod characteristic;
pub mod radio;
pub mod scan;
pub mod services;
pub mod uuid;

pub use address::{AddressKind, DeviceAddress};
pub use uuid::Uuid;

use adapter::AdapterError;
use assigned::ConvertError;
use characteristic::ValueError;

/// The error type of this library
///
/// Native failures arrive wrapped in [`Adapter`](Error::Adapter), everything else is a fault
/// this library detected before or after talking to the adapter.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// There is no usable adapter
    NoAdapter,
    /// The native adapter reported a failure
    Adapter(AdapterError),
    /// A scanned advertisement cannot be modified
    AdvertisementImmutable,
    /// The peer does not have the requested service
    NoSuchService(Uuid),
    /// The service does not have the requested characteristic
    NoSuchCharacteristic(Uuid),
    /// The link to the peer is gone
    NotConnected,
    /// Connecting by advertisement needs an advertisement captured from a scan
    PeerAddressUnknown,
    /// A characteristic value could not be converted
    Value(ValueError),
    /// A scan parameter combination is invalid
    InvalidScanParameters(&'static str),
    /// An advertising structure could not be encoded
    AdvertisingData(ConvertError),
    /// A HID report map could not be interpreted
    InvalidReportMap(&'static str),
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            Error::NoAdapter => f.write_str("no usable adapter"),
            Error::Adapter(e) => write!(f, "{}", e),
            Error::AdvertisementImmutable => {
                f.write_str("a scanned advertisement cannot be modified")
            }
            Error::NoSuchService(uuid) => write!(f, "the peer has no service {}", uuid),
            Error::NoSuchCharacteristic(uuid) => {
                write!(f, "the service has no characteristic {}", uuid)
            }
            Error::NotConnected => f.write_str("not connected"),
            Error::PeerAddressUnknown => {
                f.write_str("the advertisement does not carry a peer address")
            }
            Error::Value(e) => write!(f, "{}", e),
            Error::InvalidScanParameters(reason) => {
                write!(f, "invalid scan parameters: {}", reason)
            }
            Error::AdvertisingData(e) => write!(f, "{}", e),
            Error::InvalidReportMap(reason) => {
                write!(f, "invalid HID report map: {}", reason)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Adapter(e) => Some(e),
            Error::Value(e) => Some(e),
            Error::AdvertisingData(e) => Some(e),
            _ => None,
        }
    }
}

impl From<AdapterError> for Error {
    fn from(e: AdapterError) -> Self {
        Error::Adapter(e)
    }
}

impl From<ValueError> for Error {
    fn from(e: ValueError) -> Self {
        Error::Value(e)
    }
}

impl From<ConvertError> for Error {
    fn from(e: ConvertError) -> Self {
        Error::AdvertisingData(e)
    }
}
