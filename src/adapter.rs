//! The native adapter boundary
//!
//! Everything below the GAP layer lives behind [`Adapter`]: the protocol stack, the radio
//! timing, and the GATT transactions are the adapter's problem. This crate only prepares
//! payloads and parameters for it and interprets what comes back.

use crate::attribute::Properties;
use crate::characteristic::Characteristic;
use crate::scan::{ScanEntry, ScanParameters};
use crate::uuid::Uuid;
use crate::DeviceAddress;
use std::time::Duration;

/// A failure reported by the native adapter
///
/// These pass through to the caller unchanged. No retry is attempted on any of them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AdapterError {
    /// The adapter is switched off or missing
    Unavailable,
    /// The adapter cannot perform the requested operation
    Unsupported,
    /// The platform denied access to the adapter
    PermissionDenied,
    /// Another operation of the same kind is already running
    Busy,
    /// The operation did not finish within its time limit
    TimedOut,
    /// The referenced connection is gone
    NotConnected,
    /// The referenced handle is not known to the adapter
    UnknownHandle,
    /// Any other failure, with the adapter's reason
    Failure(String),
}

impl core::fmt::Display for AdapterError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            AdapterError::Unavailable => f.write_str("adapter unavailable"),
            AdapterError::Unsupported => f.write_str("operation not supported by the adapter"),
            AdapterError::PermissionDenied => f.write_str("adapter access denied"),
            AdapterError::Busy => f.write_str("adapter busy"),
            AdapterError::TimedOut => f.write_str("adapter operation timed out"),
            AdapterError::NotConnected => f.write_str("not connected"),
            AdapterError::UnknownHandle => f.write_str("unknown handle"),
            AdapterError::Failure(reason) => write!(f, "adapter failure: {}", reason),
        }
    }
}

impl std::error::Error for AdapterError {}

/// Opaque identifier of one link, scoped to the adapter that produced it
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConnectionHandle(u32);

impl ConnectionHandle {
    pub const fn new(raw: u32) -> Self {
        ConnectionHandle(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Opaque identifier of one characteristic, scoped to the adapter that produced it
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CharacteristicHandle(u16);

impl CharacteristicHandle {
    pub const fn new(raw: u16) -> Self {
        CharacteristicHandle(raw)
    }

    pub const fn raw(self) -> u16 {
        self.0
    }
}

/// A characteristic found by remote service discovery
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteCharacteristic {
    pub handle: CharacteristicHandle,
    pub uuid: Uuid,
    pub properties: Properties,
}

/// A service found by remote service discovery
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteService {
    pub uuid: Uuid,
    pub characteristics: Vec<RemoteCharacteristic>,
}

impl RemoteService {
    /// The first characteristic with the given UUID
    pub fn characteristic(&self, uuid: Uuid) -> Option<&RemoteCharacteristic> {
        self.characteristics.iter().find(|c| c.uuid == uuid)
    }
}

/// A local service definition handed to the adapter for registration
#[derive(Clone, Debug)]
pub struct LocalService {
    pub uuid: Uuid,
    pub secondary: bool,
    pub characteristics: Vec<Characteristic>,
}

impl LocalService {
    pub fn new(uuid: Uuid) -> Self {
        LocalService {
            uuid,
            secondary: false,
            characteristics: Vec::new(),
        }
    }

    pub fn with_characteristic(mut self, characteristic: Characteristic) -> Self {
        self.characteristics.push(characteristic);
        self
    }
}

/// Parameters of an advertising session
#[derive(Clone, Debug, PartialEq)]
pub struct AdvertisingParameters {
    /// Accept connection requests while advertising
    pub connectable: bool,
    /// Time between two advertising events
    pub interval: Duration,
    /// Stop advertising after this long, or advertise until stopped
    pub timeout: Option<Duration>,
}

impl Default for AdvertisingParameters {
    fn default() -> Self {
        AdvertisingParameters {
            connectable: true,
            interval: Duration::from_millis(100),
            timeout: None,
        }
    }
}

/// The interface a native BLE backend implements
///
/// Handles are only meaningful on the adapter that issued them. An operation on a handle from
/// another adapter returns [`AdapterError::UnknownHandle`].
pub trait Adapter {
    /// The entry iterator of a running scan
    type ScanEntries: Iterator<Item = ScanEntry>;

    /// True when the radio is powered and usable
    fn enabled(&self) -> bool;

    fn set_enabled(&mut self, enabled: bool) -> Result<(), AdapterError>;

    /// The advertised device name
    fn name(&self) -> Result<String, AdapterError>;

    fn set_name(&mut self, name: &str) -> Result<(), AdapterError>;

    /// The device address of the adapter itself
    fn address(&self) -> Result<DeviceAddress, AdapterError>;

    /// Begin advertising the given payload
    fn start_advertising(
        &mut self,
        data: &[u8],
        scan_response: Option<&[u8]>,
        parameters: &AdvertisingParameters,
    ) -> Result<(), AdapterError>;

    fn stop_advertising(&mut self) -> Result<(), AdapterError>;

    fn advertising(&self) -> bool;

    /// Begin a scan, returning the adapter-owned stream of reports
    fn start_scan(&mut self, parameters: &ScanParameters) -> Result<Self::ScanEntries, AdapterError>;

    fn stop_scan(&mut self) -> Result<(), AdapterError>;

    /// Initiate a connection to a peer
    fn connect(
        &mut self,
        address: DeviceAddress,
        timeout: Duration,
    ) -> Result<ConnectionHandle, AdapterError>;

    fn disconnect(&mut self, connection: ConnectionHandle) -> Result<(), AdapterError>;

    fn connected(&self, connection: ConnectionHandle) -> bool;

    /// Pair with the peer, optionally storing the keys for future reconnects
    fn pair(&mut self, connection: ConnectionHandle, bond: bool) -> Result<(), AdapterError>;

    fn connection_interval(&self, connection: ConnectionHandle) -> Result<Duration, AdapterError>;

    fn set_connection_interval(
        &mut self,
        connection: ConnectionHandle,
        interval: Duration,
    ) -> Result<(), AdapterError>;

    /// Discover one service and its characteristics on the peer
    ///
    /// `Ok(None)` means the peer does not have the service.
    fn discover_service(
        &mut self,
        connection: ConnectionHandle,
        uuid: Uuid,
    ) -> Result<Option<RemoteService>, AdapterError>;

    fn read_characteristic(
        &mut self,
        connection: ConnectionHandle,
        characteristic: CharacteristicHandle,
    ) -> Result<Vec<u8>, AdapterError>;

    fn write_characteristic(
        &mut self,
        connection: ConnectionHandle,
        characteristic: CharacteristicHandle,
        value: &[u8],
        with_response: bool,
    ) -> Result<(), AdapterError>;

    /// Enable or disable notifications from the peer for a characteristic
    ///
    /// Notified values accumulate in a per-characteristic buffer drained by
    /// [`read_buffered`](Adapter::read_buffered).
    fn subscribe(
        &mut self,
        connection: ConnectionHandle,
        characteristic: CharacteristicHandle,
        enable: bool,
    ) -> Result<(), AdapterError>;

    /// Drain buffered stream bytes of a characteristic into `buffer`
    ///
    /// Returns the number of bytes written into `buffer`. For a local characteristic this
    /// drains the bytes the peer wrote, for a remote one the notified values.
    fn read_buffered(
        &mut self,
        connection: ConnectionHandle,
        characteristic: CharacteristicHandle,
        buffer: &mut [u8],
    ) -> Result<usize, AdapterError>;

    /// The number of buffered stream bytes of a characteristic
    fn buffered_len(
        &self,
        connection: ConnectionHandle,
        characteristic: CharacteristicHandle,
    ) -> Result<usize, AdapterError>;

    /// Throw away the buffered stream bytes of a characteristic
    fn clear_buffered(
        &mut self,
        connection: ConnectionHandle,
        characteristic: CharacteristicHandle,
    ) -> Result<(), AdapterError>;

    /// Register a local service with the GATT server
    ///
    /// Returns the handle of every characteristic, keyed by its UUID in definition order.
    fn register_service(
        &mut self,
        service: &LocalService,
    ) -> Result<Vec<(Uuid, CharacteristicHandle)>, AdapterError>;

    /// Set the value of a local characteristic and notify subscribed peers
    fn write_local(
        &mut self,
        characteristic: CharacteristicHandle,
        value: &[u8],
    ) -> Result<(), AdapterError>;

    /// The current value of a local characteristic
    fn read_local(&self, characteristic: CharacteristicHandle) -> Result<Vec<u8>, AdapterError>;
}
