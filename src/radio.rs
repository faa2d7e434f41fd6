//! The radio facade
//!
//! [`BleRadio`] is the one object an application needs: it scans, advertises, and connects,
//! delegating the heavy lifting to the [`Adapter`] it wraps. A successful connect produces a
//! [`Connection`] through which remote services are discovered and bound.

use crate::adapter::{Adapter, AdvertisingParameters, ConnectionHandle, RemoteService};
use crate::advertising::{Advertisement, AdvertisementKind, MAX_LEGACY_PAYLOAD};
use crate::characteristic::BoundCharacteristic;
use crate::scan::{ScanParameters, ScanResults};
use crate::services::ServiceClient;
use crate::uuid::Uuid;
use crate::{DeviceAddress, Error};
use log::{debug, trace};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

/// The high level interface to a BLE adapter
pub struct BleRadio<A: Adapter> {
    adapter: Rc<RefCell<A>>,
    connections: RefCell<Vec<Connection<A>>>,
    tx_power: Cell<i8>,
}

impl<A: Adapter> BleRadio<A> {
    /// Wrap an adapter, powering it on if it is not already
    pub fn new(mut adapter: A) -> Result<Self, Error> {
        if !adapter.enabled() {
            adapter.set_enabled(true).map_err(|_| Error::NoAdapter)?;
        }

        Ok(BleRadio {
            adapter: Rc::new(RefCell::new(adapter)),
            connections: RefCell::new(Vec::new()),
            tx_power: Cell::new(0),
        })
    }

    /// The advertised device name
    pub fn name(&self) -> Result<String, Error> {
        Ok(self.adapter.borrow().name()?)
    }

    pub fn set_name(&self, name: &str) -> Result<(), Error> {
        Ok(self.adapter.borrow_mut().set_name(name)?)
    }

    /// The transmit power in dBm advertised in the default scan response
    pub fn tx_power(&self) -> i8 {
        self.tx_power.get()
    }

    pub fn set_tx_power(&self, level: i8) {
        self.tx_power.set(level);
    }

    /// The adapter's own device address
    pub fn address(&self) -> Result<DeviceAddress, Error> {
        Ok(self.adapter.borrow().address()?)
    }

    /// The adapter's own address as raw little endian bytes
    pub fn address_bytes(&self) -> Result<[u8; 6], Error> {
        Ok(self.address()?.bytes())
    }

    /// Begin advertising
    ///
    /// When no scan response is supplied and the payload fits a legacy PDU, a default scan
    /// response carrying the radio name and transmit power is generated. Larger payloads are
    /// passed through untouched for the adapter to send extended.
    pub fn start_advertising(
        &self,
        advertisement: &Advertisement,
        scan_response: Option<&Advertisement>,
        parameters: &AdvertisingParameters,
    ) -> Result<(), Error> {
        let data = advertisement.to_bytes();

        let generated;

        let scan_response = match scan_response {
            Some(scan_response) => Some(scan_response.to_bytes()),
            None if data.len() <= MAX_LEGACY_PAYLOAD => {
                generated = self.default_scan_response()?;
                generated.as_ref().map(|a| a.to_bytes())
            }
            None => None,
        };

        let parameters = AdvertisingParameters {
            connectable: parameters.connectable && advertisement.connectable(),
            ..parameters.clone()
        };

        debug!(
            "advertising {} byte payload, connectable: {}",
            data.len(),
            parameters.connectable
        );

        self.adapter
            .borrow_mut()
            .start_advertising(&data, scan_response.as_deref(), &parameters)?;

        Ok(())
    }

    /// Stop the running advertising session
    pub fn stop_advertising(&self) -> Result<(), Error> {
        debug!("stopping advertising");

        Ok(self.adapter.borrow_mut().stop_advertising()?)
    }

    /// True while an advertising session is running
    pub fn advertising(&self) -> bool {
        self.adapter.borrow().advertising()
    }

    fn default_scan_response(&self) -> Result<Option<Advertisement>, Error> {
        let mut scan_response = Advertisement::new();

        scan_response.set_complete_name(&self.name()?)?;
        scan_response.set_tx_power(self.tx_power.get())?;

        if scan_response.encoded_len() <= MAX_LEGACY_PAYLOAD {
            Ok(Some(scan_response))
        } else {
            Ok(None)
        }
    }

    /// Begin a scan for the given kinds of advertisement
    ///
    /// The returned iterator yields matching entries as they are received. It ends at the
    /// timeout even if the adapter keeps reporting, and every yielded entry satisfies the
    /// minimum RSSI.
    pub fn start_scan(
        &self,
        kinds: &[AdvertisementKind],
        parameters: ScanParameters,
    ) -> Result<ScanResults<A::ScanEntries>, Error> {
        parameters.validate()?;

        debug!(
            "scan start, timeout: {:?}, minimum rssi: {}",
            parameters.timeout, parameters.minimum_rssi
        );

        let entries = self.adapter.borrow_mut().start_scan(&parameters)?;

        Ok(ScanResults::new(entries, &parameters, kinds))
    }

    /// End the running scan
    ///
    /// Entries already buffered in the results iterator still drain.
    pub fn stop_scan(&self) -> Result<(), Error> {
        debug!("scan stop");

        Ok(self.adapter.borrow_mut().stop_scan()?)
    }

    /// Connect to the device behind a scanned advertisement
    pub fn connect(
        &self,
        advertisement: &Advertisement,
        timeout: Duration,
    ) -> Result<Connection<A>, Error> {
        let address = advertisement.address().ok_or(Error::PeerAddressUnknown)?;

        self.connect_to(address, timeout)
    }

    /// Connect to a device by address
    pub fn connect_to(
        &self,
        address: DeviceAddress,
        timeout: Duration,
    ) -> Result<Connection<A>, Error> {
        debug!("connecting to {}", address);

        let handle = self.adapter.borrow_mut().connect(address, timeout)?;

        let connection = Connection::new(self.adapter.clone(), handle);

        let mut connections = self.connections.borrow_mut();

        connections.retain(Connection::connected);
        connections.push(connection.clone());

        Ok(connection)
    }

    /// True while at least one link is up
    pub fn connected(&self) -> bool {
        self.connections
            .borrow()
            .iter()
            .any(Connection::connected)
    }

    /// The live connections, dropped links pruned
    pub fn connections(&self) -> Vec<Connection<A>> {
        let mut connections = self.connections.borrow_mut();

        connections.retain(Connection::connected);

        connections.clone()
    }

    pub(crate) fn adapter(&self) -> &Rc<RefCell<A>> {
        &self.adapter
    }
}

/// One link to a peer device
///
/// Cheap to clone, every clone refers to the same link and shares the discovered service
/// cache.
pub struct Connection<A: Adapter> {
    adapter: Rc<RefCell<A>>,
    handle: ConnectionHandle,
    services: Rc<RefCell<HashMap<Uuid, Option<Rc<RemoteService>>>>>,
}

impl<A: Adapter> Connection<A> {
    fn new(adapter: Rc<RefCell<A>>, handle: ConnectionHandle) -> Self {
        Connection {
            adapter,
            handle,
            services: Rc::new(RefCell::new(HashMap::new())),
        }
    }

    pub fn handle(&self) -> ConnectionHandle {
        self.handle
    }

    /// True while the link is up
    pub fn connected(&self) -> bool {
        self.adapter.borrow().connected(self.handle)
    }

    /// Pair with the peer, optionally bonding
    pub fn pair(&self, bond: bool) -> Result<(), Error> {
        debug!("pairing, bond: {}", bond);

        Ok(self.adapter.borrow_mut().pair(self.handle, bond)?)
    }

    /// Tear the link down
    ///
    /// The discovered service cache is cleared; a later reconnect starts discovery over.
    pub fn disconnect(&self) -> Result<(), Error> {
        debug!("disconnecting {:?}", self.handle);

        self.services.borrow_mut().clear();

        Ok(self.adapter.borrow_mut().disconnect(self.handle)?)
    }

    pub fn connection_interval(&self) -> Result<Duration, Error> {
        Ok(self.adapter.borrow().connection_interval(self.handle)?)
    }

    pub fn set_connection_interval(&self, interval: Duration) -> Result<(), Error> {
        Ok(self
            .adapter
            .borrow_mut()
            .set_connection_interval(self.handle, interval)?)
    }

    /// True if the peer has the given service
    pub fn has_service(&self, uuid: Uuid) -> Result<bool, Error> {
        Ok(self.discover(uuid)?.is_some())
    }

    /// Bind a typed client to the peer's instance of a service
    pub fn service<S: ServiceClient<A>>(&self) -> Result<S, Error> {
        let remote = self
            .discover(S::UUID)?
            .ok_or(Error::NoSuchService(S::UUID))?;

        S::bind(self, &remote)
    }

    /// Look a service up in the cache, discovering on a miss
    ///
    /// Negative results are cached too, so repeated lookups of an absent service stay cheap.
    fn discover(&self, uuid: Uuid) -> Result<Option<Rc<RemoteService>>, Error> {
        if !self.connected() {
            return Err(Error::NotConnected);
        }

        if let Some(cached) = self.services.borrow().get(&uuid) {
            return Ok(cached.clone());
        }

        trace!("discovering service {}", uuid);

        let discovered = self
            .adapter
            .borrow_mut()
            .discover_service(self.handle, uuid)?
            .map(Rc::new);

        self.services.borrow_mut().insert(uuid, discovered.clone());

        Ok(discovered)
    }

    pub(crate) fn bind_characteristic(
        &self,
        remote: &crate::adapter::RemoteCharacteristic,
    ) -> BoundCharacteristic<A> {
        BoundCharacteristic::new(
            self.adapter.clone(),
            self.handle,
            remote.handle,
            remote.uuid,
            remote.properties,
        )
    }
}

impl<A: Adapter> Clone for Connection<A> {
    fn clone(&self) -> Self {
        Connection {
            adapter: self.adapter.clone(),
            handle: self.handle,
            services: self.services.clone(),
        }
    }
}
