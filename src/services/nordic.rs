//! The Nordic UART service
//!
//! A widely adopted vendor service emulating a serial line over two characteristics: the peer
//! writes into RX, the device notifies out of TX. The client and server roles use the same
//! pair with the directions swapped.

use super::{require_characteristic, ServiceClient};
use crate::adapter::{
    Adapter, AdapterError, CharacteristicHandle, ConnectionHandle, LocalService, RemoteService,
};
use crate::attribute::{Properties, Property};
use crate::characteristic::{BoundCharacteristic, Characteristic};
use crate::radio::{BleRadio, Connection};
use crate::uuid::Uuid;
use crate::Error;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

pub const SERVICE_UUID: Uuid = Uuid::from_u128(0x6E400001_B5A3_F393_E0A9_E50E24DCCA9E);

/// Written by the central, read by the peripheral
const RX_UUID: Uuid = Uuid::from_u128(0x6E400002_B5A3_F393_E0A9_E50E24DCCA9E);

/// Notified by the peripheral, read by the central
const TX_UUID: Uuid = Uuid::from_u128(0x6E400003_B5A3_F393_E0A9_E50E24DCCA9E);

/// Outgoing data is split into chunks this big, the value payload of a default MTU
const CHUNK_SIZE: usize = 20;

const POLL_INTERVAL: Duration = Duration::from_millis(2);

/// Split one newline terminated line off the front of `pending`
///
/// The newline is included in the returned line.
fn take_line(pending: &mut Vec<u8>) -> Option<Vec<u8>> {
    let end = pending.iter().position(|byte| *byte == b'\n')? + 1;

    let rest = pending.split_off(end);

    Some(core::mem::replace(pending, rest))
}

/// A serial line to a peer acting as the UART peripheral
///
/// Reads block until data arrives or the timeout passes, one second unless changed.
pub struct UartService<A: Adapter> {
    rx: BoundCharacteristic<A>,
    tx: BoundCharacteristic<A>,
    timeout: Cell<Duration>,
    pending: RefCell<Vec<u8>>,
}

impl<A: Adapter> UartService<A> {
    pub fn timeout(&self) -> Duration {
        self.timeout.get()
    }

    pub fn set_timeout(&self, timeout: Duration) {
        self.timeout.set(timeout);
    }

    /// Bytes available to read without blocking
    pub fn in_waiting(&self) -> Result<usize, Error> {
        Ok(self.pending.borrow().len() + self.tx.in_waiting()?)
    }

    fn fill_pending(&self) -> Result<(), Error> {
        let waiting = self.tx.in_waiting()?;

        if waiting > 0 {
            let mut chunk = vec![0u8; waiting];

            let count = self.tx.read_buffered(&mut chunk)?;

            chunk.truncate(count);

            self.pending.borrow_mut().extend_from_slice(&chunk);
        }

        Ok(())
    }

    /// Read up to `buffer.len()` bytes, blocking until at least one arrives or the timeout
    /// passes
    ///
    /// Returns the number of bytes read, zero on timeout.
    pub fn read(&self, buffer: &mut [u8]) -> Result<usize, Error> {
        let deadline = Instant::now() + self.timeout.get();

        loop {
            self.fill_pending()?;

            let mut pending = self.pending.borrow_mut();

            if !pending.is_empty() || buffer.is_empty() {
                let count = pending.len().min(buffer.len());

                buffer[..count].copy_from_slice(&pending[..count]);

                pending.drain(..count);

                return Ok(count);
            }

            drop(pending);

            if Instant::now() >= deadline {
                return Ok(0);
            }

            std::thread::sleep(POLL_INTERVAL);
        }
    }

    /// Fill `buffer` completely, or fail with a timeout
    pub fn read_exact(&self, buffer: &mut [u8]) -> Result<(), Error> {
        let deadline = Instant::now() + self.timeout.get();

        let mut filled = 0;

        while filled < buffer.len() {
            self.fill_pending()?;

            let mut pending = self.pending.borrow_mut();

            let count = pending.len().min(buffer.len() - filled);

            buffer[filled..filled + count].copy_from_slice(&pending[..count]);

            pending.drain(..count);

            filled += count;

            drop(pending);

            if filled < buffer.len() {
                if Instant::now() >= deadline {
                    return Err(Error::Adapter(AdapterError::TimedOut));
                }

                std::thread::sleep(POLL_INTERVAL);
            }
        }

        Ok(())
    }

    /// Read one newline terminated line, `None` if no full line arrives before the timeout
    ///
    /// Bytes of an unfinished line stay buffered for the next read.
    pub fn readline(&self) -> Result<Option<Vec<u8>>, Error> {
        let deadline = Instant::now() + self.timeout.get();

        loop {
            self.fill_pending()?;

            if let Some(line) = take_line(&mut self.pending.borrow_mut()) {
                return Ok(Some(line));
            }

            if Instant::now() >= deadline {
                return Ok(None);
            }

            std::thread::sleep(POLL_INTERVAL);
        }
    }

    /// Send bytes to the peer
    pub fn write(&self, data: &[u8]) -> Result<(), Error> {
        for chunk in data.chunks(CHUNK_SIZE) {
            self.rx.write_raw(chunk)?;
        }

        Ok(())
    }

    /// Throw away everything received but not yet read
    pub fn reset_input_buffer(&self) -> Result<(), Error> {
        self.pending.borrow_mut().clear();

        self.tx.clear_buffered()
    }
}

impl<A: Adapter> ServiceClient<A> for UartService<A> {
    const UUID: Uuid = SERVICE_UUID;

    fn bind(connection: &Connection<A>, service: &RemoteService) -> Result<Self, Error> {
        let rx = connection.bind_characteristic(require_characteristic(service, RX_UUID)?);
        let tx = connection.bind_characteristic(require_characteristic(service, TX_UUID)?);

        tx.subscribe(true)?;

        Ok(UartService {
            rx,
            tx,
            timeout: Cell::new(Duration::from_secs(1)),
            pending: RefCell::new(Vec::new()),
        })
    }
}

/// The UART service published by the local GATT server
///
/// Incoming data arrives per connection, so the read operations name the central they read
/// from. Written data is notified to every subscribed central.
pub struct UartServer<A: Adapter> {
    adapter: Rc<RefCell<A>>,
    rx: CharacteristicHandle,
    tx: CharacteristicHandle,
    timeout: Cell<Duration>,
    pending: RefCell<HashMap<ConnectionHandle, Vec<u8>>>,
}

impl<A: Adapter> UartServer<A> {
    /// Register the service
    pub fn register(radio: &BleRadio<A>) -> Result<Self, Error> {
        let writable: Properties = [Property::Write, Property::WriteWithoutResponse]
            .into_iter()
            .collect();

        let service = LocalService::new(SERVICE_UUID)
            .with_characteristic(
                Characteristic::new(RX_UUID)
                    .with_properties(writable)
                    .with_max_length(CHUNK_SIZE),
            )
            .with_characteristic(
                Characteristic::new(TX_UUID)
                    .with_properties([Property::Notify].into_iter().collect())
                    .with_max_length(CHUNK_SIZE),
            );

        let handles = radio.adapter().borrow_mut().register_service(&service)?;

        let find = |uuid: Uuid| {
            handles
                .iter()
                .find(|(u, _)| *u == uuid)
                .map(|(_, handle)| *handle)
                .ok_or(Error::NoSuchCharacteristic(uuid))
        };

        Ok(UartServer {
            adapter: radio.adapter().clone(),
            rx: find(RX_UUID)?,
            tx: find(TX_UUID)?,
            timeout: Cell::new(Duration::from_secs(1)),
            pending: RefCell::new(HashMap::new()),
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout.get()
    }

    pub fn set_timeout(&self, timeout: Duration) {
        self.timeout.set(timeout);
    }

    fn fill_pending(&self, connection: &Connection<A>) -> Result<(), Error> {
        let mut adapter = self.adapter.borrow_mut();

        let waiting = adapter.buffered_len(connection.handle(), self.rx)?;

        if waiting > 0 {
            let mut chunk = vec![0u8; waiting];

            let count = adapter.read_buffered(connection.handle(), self.rx, &mut chunk)?;

            chunk.truncate(count);

            self.pending
                .borrow_mut()
                .entry(connection.handle())
                .or_default()
                .extend_from_slice(&chunk);
        }

        Ok(())
    }

    /// Bytes the given central has written but the application has not read
    pub fn in_waiting(&self, connection: &Connection<A>) -> Result<usize, Error> {
        self.fill_pending(connection)?;

        Ok(self
            .pending
            .borrow()
            .get(&connection.handle())
            .map_or(0, Vec::len))
    }

    /// Read up to `buffer.len()` bytes written by the given central
    pub fn read(&self, connection: &Connection<A>, buffer: &mut [u8]) -> Result<usize, Error> {
        let deadline = Instant::now() + self.timeout.get();

        loop {
            self.fill_pending(connection)?;

            let mut pending = self.pending.borrow_mut();

            let queue = pending.entry(connection.handle()).or_default();

            if !queue.is_empty() || buffer.is_empty() {
                let count = queue.len().min(buffer.len());

                buffer[..count].copy_from_slice(&queue[..count]);

                queue.drain(..count);

                return Ok(count);
            }

            drop(pending);

            if Instant::now() >= deadline {
                return Ok(0);
            }

            std::thread::sleep(POLL_INTERVAL);
        }
    }

    /// Read one newline terminated line from the given central
    pub fn readline(&self, connection: &Connection<A>) -> Result<Option<Vec<u8>>, Error> {
        let deadline = Instant::now() + self.timeout.get();

        loop {
            self.fill_pending(connection)?;

            if let Some(queue) = self.pending.borrow_mut().get_mut(&connection.handle()) {
                if let Some(line) = take_line(queue) {
                    return Ok(Some(line));
                }
            }

            if Instant::now() >= deadline {
                return Ok(None);
            }

            std::thread::sleep(POLL_INTERVAL);
        }
    }

    /// Notify bytes to every subscribed central
    pub fn write(&self, data: &[u8]) -> Result<(), Error> {
        for chunk in data.chunks(CHUNK_SIZE) {
            self.adapter.borrow_mut().write_local(self.tx, chunk)?;
        }

        Ok(())
    }

    /// Throw away everything the given central has written but the application has not read
    pub fn reset_input_buffer(&self, connection: &Connection<A>) -> Result<(), Error> {
        self.pending.borrow_mut().remove(&connection.handle());

        self.adapter
            .borrow_mut()
            .clear_buffered(connection.handle(), self.rx)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_line_splits_at_newline() {
        let mut pending = b"first\nsecond".to_vec();

        assert_eq!(Some(b"first\n".to_vec()), take_line(&mut pending));
        assert_eq!(b"second".to_vec(), pending);
        assert_eq!(None, take_line(&mut pending));
    }

    #[test]
    fn service_uuids_share_the_vendor_base() {
        for uuid in [SERVICE_UUID, RX_UUID, TX_UUID] {
            assert!(!uuid.is_16_bit());
            assert_eq!(Err(()), u16::try_from(uuid));
        }
    }
}
