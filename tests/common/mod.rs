//! An in-memory adapter for exercising the radio facade
//!
//! The mock keeps its whole world in shared state so a test can inject peers and inspect what
//! the facade asked for, while the facade owns the adapter itself.

use easy_ble::adapter::{
    Adapter, AdapterError, AdvertisingParameters, CharacteristicHandle, ConnectionHandle,
    LocalService, RemoteCharacteristic, RemoteService,
};
use easy_ble::scan::{ScanEntry, ScanParameters};
use easy_ble::uuid::Uuid;
use easy_ble::DeviceAddress;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

#[derive(Default)]
pub struct MockPeer {
    pub services: Vec<RemoteService>,
    /// Values of the peer's characteristics
    pub values: HashMap<CharacteristicHandle, Vec<u8>>,
    /// Writes into the key are echoed into the buffered bytes of the value
    pub echo: HashMap<CharacteristicHandle, CharacteristicHandle>,
}

#[derive(Default)]
pub struct MockState {
    pub enabled: bool,
    pub name: String,
    pub advertising: bool,
    pub advertised_data: Option<Vec<u8>>,
    pub scan_response: Option<Vec<u8>>,
    pub advertising_parameters: Option<AdvertisingParameters>,
    pub scanning: bool,
    pub scan_reports: Vec<ScanEntry>,
    pub last_scan_parameters: Option<ScanParameters>,

    pub peers: HashMap<DeviceAddress, MockPeer>,
    connections: HashMap<ConnectionHandle, (DeviceAddress, bool)>,
    next_connection: u32,
    next_characteristic: u16,

    /// Buffered stream bytes per connection and characteristic
    buffered: HashMap<(ConnectionHandle, CharacteristicHandle), Vec<u8>>,
    pub subscriptions: Vec<(ConnectionHandle, CharacteristicHandle, bool)>,

    pub local_services: Vec<LocalService>,
    pub local_registrations: Vec<(Uuid, CharacteristicHandle)>,
    pub local_values: HashMap<CharacteristicHandle, Vec<u8>>,
}

impl MockState {
    fn characteristic_handle(&mut self) -> CharacteristicHandle {
        self.next_characteristic += 1;

        CharacteristicHandle::new(self.next_characteristic)
    }

    fn connection(
        &self,
        connection: ConnectionHandle,
    ) -> Result<&(DeviceAddress, bool), AdapterError> {
        self.connections
            .get(&connection)
            .ok_or(AdapterError::UnknownHandle)
    }

    fn peer_of(&self, connection: ConnectionHandle) -> Result<&MockPeer, AdapterError> {
        let (address, alive) = self.connection(connection)?;

        if !alive {
            return Err(AdapterError::NotConnected);
        }

        self.peers.get(address).ok_or(AdapterError::NotConnected)
    }
}

/// The adapter handed to the radio, sharing its state with the test
#[derive(Clone)]
pub struct MockAdapter {
    state: Rc<RefCell<MockState>>,
}

impl MockAdapter {
    pub fn new() -> Self {
        let state = MockState {
            enabled: true,
            name: String::from("mock"),
            ..MockState::default()
        };

        MockAdapter {
            state: Rc::new(RefCell::new(state)),
        }
    }

    pub fn state(&self) -> Rc<RefCell<MockState>> {
        self.state.clone()
    }

    /// Queue a report for the next scan
    pub fn report(&self, entry: ScanEntry) {
        self.state.borrow_mut().scan_reports.push(entry);
    }

    /// Add a connectable peer with one service
    ///
    /// Returns the handles of the service's characteristics in definition order.
    pub fn add_peer_service(
        &self,
        address: DeviceAddress,
        service: Uuid,
        characteristics: &[(Uuid, easy_ble::attribute::Properties, Vec<u8>)],
    ) -> Vec<CharacteristicHandle> {
        let mut state = self.state.borrow_mut();

        let mut handles = Vec::new();
        let mut remote = Vec::new();
        let mut values = Vec::new();

        for (uuid, properties, value) in characteristics {
            let handle = state.characteristic_handle();

            handles.push(handle);
            values.push((handle, value.clone()));

            remote.push(RemoteCharacteristic {
                handle,
                uuid: *uuid,
                properties: *properties,
            });
        }

        let peer = state.peers.entry(address).or_default();

        peer.services.push(RemoteService {
            uuid: service,
            characteristics: remote,
        });

        peer.values.extend(values);

        handles
    }

    /// Echo writes into `rx` back out as buffered bytes of `tx`
    pub fn echo(&self, address: DeviceAddress, rx: CharacteristicHandle, tx: CharacteristicHandle) {
        self.state
            .borrow_mut()
            .peers
            .entry(address)
            .or_default()
            .echo
            .insert(rx, tx);
    }

    /// Queue bytes as if the connected peer wrote them to a local characteristic
    pub fn inject_buffered(
        &self,
        connection: ConnectionHandle,
        characteristic: CharacteristicHandle,
        bytes: &[u8],
    ) {
        self.state
            .borrow_mut()
            .buffered
            .entry((connection, characteristic))
            .or_default()
            .extend_from_slice(bytes);
    }

    /// Drop the link as if the peer walked away
    pub fn drop_connection(&self, connection: ConnectionHandle) {
        if let Some((_, alive)) = self.state.borrow_mut().connections.get_mut(&connection) {
            *alive = false;
        }
    }
}

impl Adapter for MockAdapter {
    type ScanEntries = std::vec::IntoIter<ScanEntry>;

    fn enabled(&self) -> bool {
        self.state.borrow().enabled
    }

    fn set_enabled(&mut self, enabled: bool) -> Result<(), AdapterError> {
        self.state.borrow_mut().enabled = enabled;

        Ok(())
    }

    fn name(&self) -> Result<String, AdapterError> {
        Ok(self.state.borrow().name.clone())
    }

    fn set_name(&mut self, name: &str) -> Result<(), AdapterError> {
        self.state.borrow_mut().name = name.to_owned();

        Ok(())
    }

    fn address(&self) -> Result<DeviceAddress, AdapterError> {
        Ok(DeviceAddress::public([0xEE, 0xFF, 0xC0, 0x00, 0x00, 0xC0]))
    }

    fn start_advertising(
        &mut self,
        data: &[u8],
        scan_response: Option<&[u8]>,
        parameters: &AdvertisingParameters,
    ) -> Result<(), AdapterError> {
        let mut state = self.state.borrow_mut();

        if state.advertising {
            return Err(AdapterError::Busy);
        }

        state.advertising = true;
        state.advertised_data = Some(data.to_vec());
        state.scan_response = scan_response.map(<[u8]>::to_vec);
        state.advertising_parameters = Some(parameters.clone());

        Ok(())
    }

    fn stop_advertising(&mut self) -> Result<(), AdapterError> {
        self.state.borrow_mut().advertising = false;

        Ok(())
    }

    fn advertising(&self) -> bool {
        self.state.borrow().advertising
    }

    fn start_scan(&mut self, parameters: &ScanParameters) -> Result<Self::ScanEntries, AdapterError> {
        let mut state = self.state.borrow_mut();

        state.scanning = true;
        state.last_scan_parameters = Some(parameters.clone());

        Ok(state.scan_reports.clone().into_iter())
    }

    fn stop_scan(&mut self) -> Result<(), AdapterError> {
        self.state.borrow_mut().scanning = false;

        Ok(())
    }

    fn connect(
        &mut self,
        address: DeviceAddress,
        _timeout: Duration,
    ) -> Result<ConnectionHandle, AdapterError> {
        let mut state = self.state.borrow_mut();

        if !state.peers.contains_key(&address) {
            return Err(AdapterError::TimedOut);
        }

        state.next_connection += 1;

        let handle = ConnectionHandle::new(state.next_connection);

        state.connections.insert(handle, (address, true));

        Ok(handle)
    }

    fn disconnect(&mut self, connection: ConnectionHandle) -> Result<(), AdapterError> {
        let mut state = self.state.borrow_mut();

        match state.connections.get_mut(&connection) {
            Some((_, alive)) => {
                *alive = false;
                Ok(())
            }
            None => Err(AdapterError::UnknownHandle),
        }
    }

    fn connected(&self, connection: ConnectionHandle) -> bool {
        self.state
            .borrow()
            .connections
            .get(&connection)
            .is_some_and(|(_, alive)| *alive)
    }

    fn pair(&mut self, connection: ConnectionHandle, _bond: bool) -> Result<(), AdapterError> {
        self.state.borrow().peer_of(connection).map(|_| ())
    }

    fn connection_interval(&self, connection: ConnectionHandle) -> Result<Duration, AdapterError> {
        self.state.borrow().peer_of(connection)?;

        Ok(Duration::from_millis(30))
    }

    fn set_connection_interval(
        &mut self,
        connection: ConnectionHandle,
        _interval: Duration,
    ) -> Result<(), AdapterError> {
        self.state.borrow().peer_of(connection).map(|_| ())
    }

    fn discover_service(
        &mut self,
        connection: ConnectionHandle,
        uuid: Uuid,
    ) -> Result<Option<RemoteService>, AdapterError> {
        let state = self.state.borrow();

        let peer = state.peer_of(connection)?;

        Ok(peer.services.iter().find(|s| s.uuid == uuid).cloned())
    }

    fn read_characteristic(
        &mut self,
        connection: ConnectionHandle,
        characteristic: CharacteristicHandle,
    ) -> Result<Vec<u8>, AdapterError> {
        let state = self.state.borrow();

        state
            .peer_of(connection)?
            .values
            .get(&characteristic)
            .cloned()
            .ok_or(AdapterError::UnknownHandle)
    }

    fn write_characteristic(
        &mut self,
        connection: ConnectionHandle,
        characteristic: CharacteristicHandle,
        value: &[u8],
        _with_response: bool,
    ) -> Result<(), AdapterError> {
        let mut state = self.state.borrow_mut();

        let echo = state.peer_of(connection)?.echo.get(&characteristic).copied();

        let (address, _) = *state.connection(connection)?;

        let peer = state.peers.get_mut(&address).unwrap();

        peer.values.insert(characteristic, value.to_vec());

        if let Some(tx) = echo {
            state
                .buffered
                .entry((connection, tx))
                .or_default()
                .extend_from_slice(value);
        }

        Ok(())
    }

    fn subscribe(
        &mut self,
        connection: ConnectionHandle,
        characteristic: CharacteristicHandle,
        enable: bool,
    ) -> Result<(), AdapterError> {
        let mut state = self.state.borrow_mut();

        state.peer_of(connection)?;

        state.subscriptions.push((connection, characteristic, enable));

        Ok(())
    }

    fn read_buffered(
        &mut self,
        connection: ConnectionHandle,
        characteristic: CharacteristicHandle,
        buffer: &mut [u8],
    ) -> Result<usize, AdapterError> {
        let mut state = self.state.borrow_mut();

        state.connection(connection)?;

        let queue = state.buffered.entry((connection, characteristic)).or_default();

        let count = queue.len().min(buffer.len());

        buffer[..count].copy_from_slice(&queue[..count]);

        queue.drain(..count);

        Ok(count)
    }

    fn buffered_len(
        &self,
        connection: ConnectionHandle,
        characteristic: CharacteristicHandle,
    ) -> Result<usize, AdapterError> {
        let state = self.state.borrow();

        state.connection(connection)?;

        Ok(state
            .buffered
            .get(&(connection, characteristic))
            .map_or(0, Vec::len))
    }

    fn clear_buffered(
        &mut self,
        connection: ConnectionHandle,
        characteristic: CharacteristicHandle,
    ) -> Result<(), AdapterError> {
        let mut state = self.state.borrow_mut();

        state.connection(connection)?;

        state.buffered.remove(&(connection, characteristic));

        Ok(())
    }

    fn register_service(
        &mut self,
        service: &LocalService,
    ) -> Result<Vec<(Uuid, CharacteristicHandle)>, AdapterError> {
        let mut state = self.state.borrow_mut();

        let mut handles = Vec::new();

        for characteristic in &service.characteristics {
            let handle = state.characteristic_handle();

            handles.push((characteristic.uuid(), handle));

            let initial = characteristic.initial_value().map_or(Vec::new(), <[u8]>::to_vec);

            state.local_values.insert(handle, initial);
        }

        state.local_registrations.extend(handles.iter().copied());
        state.local_services.push(service.clone());

        Ok(handles)
    }

    fn write_local(
        &mut self,
        characteristic: CharacteristicHandle,
        value: &[u8],
    ) -> Result<(), AdapterError> {
        let mut state = self.state.borrow_mut();

        match state.local_values.get_mut(&characteristic) {
            Some(stored) => {
                *stored = value.to_vec();
                Ok(())
            }
            None => Err(AdapterError::UnknownHandle),
        }
    }

    fn read_local(&self, characteristic: CharacteristicHandle) -> Result<Vec<u8>, AdapterError> {
        self.state
            .borrow()
            .local_values
            .get(&characteristic)
            .cloned()
            .ok_or(AdapterError::UnknownHandle)
    }
}
