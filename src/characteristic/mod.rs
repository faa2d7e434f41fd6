//! Characteristics and their value codecs
//!
//! A [`Characteristic`] describes one characteristic of a local service before it is
//! registered. A [`BoundCharacteristic`] is a live characteristic on a connected peer, through
//! which typed values move via the [`ValueFormat`] codecs.

pub mod json;
pub mod value;

pub use json::Json;
pub use value::{RangedU8, ValueError, ValueFormat};

use crate::adapter::{Adapter, CharacteristicHandle, ConnectionHandle};
use crate::attribute::{Properties, Property, SecurityMode};
use crate::uuid::Uuid;
use crate::Error;
use std::cell::RefCell;
use std::rc::Rc;

/// The declaration of a descriptor attached to a local characteristic
///
/// Descriptors carry static metadata about their characteristic, such as the report reference
/// of a HID report.
#[derive(Clone, Debug)]
pub struct Descriptor {
    uuid: Uuid,
    value: Vec<u8>,
    read_security: SecurityMode,
}

impl Descriptor {
    pub fn new(uuid: Uuid, value: Vec<u8>) -> Self {
        Descriptor {
            uuid,
            value,
            read_security: SecurityMode::Open,
        }
    }

    pub fn readable_when(mut self, security: SecurityMode) -> Self {
        self.read_security = security;
        self
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn read_security(&self) -> SecurityMode {
        self.read_security
    }
}

/// The declaration of one characteristic of a local service
#[derive(Clone, Debug)]
pub struct Characteristic {
    uuid: Uuid,
    properties: Properties,
    read_security: SecurityMode,
    write_security: SecurityMode,
    max_length: usize,
    fixed_length: bool,
    initial_value: Option<Vec<u8>>,
    descriptors: Vec<Descriptor>,
}

impl Characteristic {
    /// Create a readable characteristic with default attribute sizing
    pub fn new(uuid: Uuid) -> Self {
        Characteristic {
            uuid,
            properties: [Property::Read].into_iter().collect(),
            read_security: SecurityMode::Open,
            write_security: SecurityMode::Open,
            max_length: 20,
            fixed_length: false,
            initial_value: None,
            descriptors: Vec::new(),
        }
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    pub fn readable_when(mut self, security: SecurityMode) -> Self {
        self.read_security = security;
        self
    }

    pub fn writable_when(mut self, security: SecurityMode) -> Self {
        self.write_security = security;
        self
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    /// The value always occupies exactly `max_length` bytes
    pub fn fixed_length(mut self) -> Self {
        self.fixed_length = true;
        self
    }

    pub fn with_initial_value(mut self, value: Vec<u8>) -> Self {
        self.initial_value = Some(value);
        self
    }

    pub fn with_descriptor(mut self, descriptor: Descriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn properties(&self) -> Properties {
        self.properties
    }

    pub fn read_security(&self) -> SecurityMode {
        self.read_security
    }

    pub fn write_security(&self) -> SecurityMode {
        self.write_security
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn is_fixed_length(&self) -> bool {
        self.fixed_length
    }

    pub fn initial_value(&self) -> Option<&[u8]> {
        self.initial_value.as_deref()
    }

    pub fn descriptors(&self) -> &[Descriptor] {
        &self.descriptors
    }
}

/// A characteristic of a connected peer
///
/// Holds a shared handle on the adapter, so a bound characteristic stays usable for as long as
/// the link is up regardless of what else the application does with the radio.
pub struct BoundCharacteristic<A: Adapter> {
    adapter: Rc<RefCell<A>>,
    connection: ConnectionHandle,
    handle: CharacteristicHandle,
    uuid: Uuid,
    properties: Properties,
}

impl<A: Adapter> BoundCharacteristic<A> {
    pub(crate) fn new(
        adapter: Rc<RefCell<A>>,
        connection: ConnectionHandle,
        handle: CharacteristicHandle,
        uuid: Uuid,
        properties: Properties,
    ) -> Self {
        BoundCharacteristic {
            adapter,
            connection,
            handle,
            uuid,
            properties,
        }
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn properties(&self) -> Properties {
        self.properties
    }

    pub fn handle(&self) -> CharacteristicHandle {
        self.handle
    }

    /// Read the raw value from the peer
    pub fn read_raw(&self) -> Result<Vec<u8>, Error> {
        let raw = self
            .adapter
            .borrow_mut()
            .read_characteristic(self.connection, self.handle)?;

        Ok(raw)
    }

    /// Write a raw value to the peer
    ///
    /// An acknowledged write is used whenever the characteristic supports one.
    pub fn write_raw(&self, value: &[u8]) -> Result<(), Error> {
        let with_response = self.properties.contains(Property::Write);

        self.adapter.borrow_mut().write_characteristic(
            self.connection,
            self.handle,
            value,
            with_response,
        )?;

        Ok(())
    }

    /// Read and decode the value
    pub fn read<T: ValueFormat>(&self) -> Result<T, Error> {
        let raw = self.read_raw()?;

        Ok(T::try_decode(&raw)?)
    }

    /// Encode and write the value
    pub fn write<T: ValueFormat>(&self, value: &T) -> Result<(), Error> {
        self.write_raw(&value.encode())
    }

    /// Enable or disable notifications from the peer
    pub fn subscribe(&self, enable: bool) -> Result<(), Error> {
        self.adapter
            .borrow_mut()
            .subscribe(self.connection, self.handle, enable)?;

        Ok(())
    }

    /// Number of buffered stream bytes waiting to be read
    pub fn in_waiting(&self) -> Result<usize, Error> {
        let len = self
            .adapter
            .borrow()
            .buffered_len(self.connection, self.handle)?;

        Ok(len)
    }

    /// Drain buffered stream bytes into `buffer`, returning how many were written
    pub fn read_buffered(&self, buffer: &mut [u8]) -> Result<usize, Error> {
        let count = self
            .adapter
            .borrow_mut()
            .read_buffered(self.connection, self.handle, buffer)?;

        Ok(count)
    }

    /// Throw away any buffered stream bytes
    pub fn clear_buffered(&self) -> Result<(), Error> {
        self.adapter
            .borrow_mut()
            .clear_buffered(self.connection, self.handle)?;

        Ok(())
    }
}

impl<A: Adapter> Clone for BoundCharacteristic<A> {
    fn clone(&self) -> Self {
        BoundCharacteristic {
            adapter: self.adapter.clone(),
            connection: self.connection,
            handle: self.handle,
            uuid: self.uuid,
            properties: self.properties,
        }
    }
}
