//! Advertisement construction and interpretation
//!
//! Advertising is the first phase of BLE where devices broadcast without a connection. An
//! [`Advertisement`] is either built locally to be transmitted by the radio, or captured from a
//! scan, in which case it also carries the address and signal strength of the advertiser.

use crate::assigned::appearance::Appearance;
use crate::assigned::flags::Flags;
use crate::assigned::local_name::LocalName;
use crate::assigned::manufacturer_data::ManufacturerData;
use crate::assigned::service_classes::{self, ServiceClasses};
use crate::assigned::service_data::ServiceData;
use crate::assigned::tx_power::TxPower;
use crate::assigned::{AdStructIter, AdType, ConvertError, IntoAdStruct, HEADER_SIZE};
use crate::scan::ScanEntry;
use crate::uuid::Uuid;
use crate::{DeviceAddress, Error};
use std::collections::BTreeMap;

/// The largest payload of a legacy advertising PDU
pub const MAX_LEGACY_PAYLOAD: usize = 31;

/// A mutable, field keyed model of an advertising payload
///
/// The payload is kept as a map from the AD type octet to the data of its structures. An AD type
/// may appear more than once within one payload (service data for two different services, for
/// example), so every type maps to one or more data values.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AdvertisingData {
    fields: BTreeMap<u8, Vec<Vec<u8>>>,
}

impl AdvertisingData {
    pub fn new() -> Self {
        AdvertisingData::default()
    }

    /// Decode a raw payload
    ///
    /// Malformed trailing structures are dropped rather than reported, as a scanner is not at
    /// fault for receiving a bad payload.
    pub fn decode(raw: &[u8]) -> Self {
        let mut fields: BTreeMap<u8, Vec<Vec<u8>>> = BTreeMap::new();

        for ad in AdStructIter::new(raw).silent() {
            fields.entry(ad.ad_type()).or_default().push(ad.data().to_vec());
        }

        AdvertisingData { fields }
    }

    /// Encode into a raw payload
    pub fn encode(&self) -> Vec<u8> {
        let mut raw = Vec::with_capacity(self.encoded_len());

        for (ad_type, values) in &self.fields {
            for value in values {
                raw.push((1 + value.len()) as u8);
                raw.push(*ad_type);
                raw.extend_from_slice(value);
            }
        }

        raw
    }

    /// The number of bytes `encode` will produce
    pub fn encoded_len(&self) -> usize {
        self.fields
            .values()
            .flatten()
            .map(|value| value.len() + HEADER_SIZE)
            .sum()
    }

    /// The data of the first structure with the given AD type
    pub fn get(&self, ad_type: AdType) -> Option<&[u8]> {
        self.fields
            .get(&ad_type.value())
            .and_then(|values| values.first())
            .map(Vec::as_slice)
    }

    /// The data of every structure with the given AD type
    pub fn get_all(&self, ad_type: AdType) -> impl Iterator<Item = &[u8]> {
        self.fields
            .get(&ad_type.value())
            .into_iter()
            .flatten()
            .map(Vec::as_slice)
    }

    /// Replace all structures of the given AD type with one data value
    ///
    /// # Error
    /// `data` is larger than a length octet can describe.
    pub fn set(&mut self, ad_type: AdType, data: Vec<u8>) -> Result<(), Error> {
        Self::check_value(&data)?;

        self.fields.insert(ad_type.value(), vec![data]);

        Ok(())
    }

    /// Add a structure without replacing others of the same AD type
    ///
    /// # Error
    /// `data` is larger than a length octet can describe.
    pub fn add(&mut self, ad_type: AdType, data: Vec<u8>) -> Result<(), Error> {
        Self::check_value(&data)?;

        self.fields.entry(ad_type.value()).or_default().push(data);

        Ok(())
    }

    fn check_value(data: &[u8]) -> Result<(), Error> {
        if data.len() + 1 > u8::MAX as usize {
            return Err(Error::AdvertisingData(ConvertError {
                required: data.len() + HEADER_SIZE,
                remaining: data.len() + HEADER_SIZE,
            }));
        }

        Ok(())
    }

    pub fn remove(&mut self, ad_type: AdType) {
        self.fields.remove(&ad_type.value());
    }

    pub fn contains(&self, ad_type: AdType) -> bool {
        self.fields.contains_key(&ad_type.value())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Store a typed structure, replacing structures of the same AD type
    ///
    /// The buffer is sized for the structure, so the only failure left is data too large for
    /// the length octet.
    fn set_struct<T: IntoAdStruct>(&mut self, t: &T) -> Result<(), Error> {
        let mut buffer = vec![0u8; t.data_len() + HEADER_SIZE];

        let ad = t.convert_into(&mut buffer)?;

        self.fields.insert(ad.ad_type(), vec![ad.data().to_vec()]);

        Ok(())
    }
}

/// A kind of advertisement used for scan filtering
///
/// Every kind declares prefixes that are compared against the structures of a scanned payload.
/// [`Any`] has no prefix restrictions and matches every payload.
///
/// [`Any`]: AdvertisementKind::Any
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdvertisementKind {
    /// Any advertisement
    Any,
    /// An advertisement listing the services the device provides
    ProvidesServices,
    /// An advertisement listing the services the device would like its peer to provide
    SolicitsServices,
}

impl AdvertisementKind {
    /// The structure prefixes of this kind
    ///
    /// Each prefix is compared against the type octet onwards of the scanned structures.
    pub(crate) fn prefixes(self) -> &'static [&'static [u8]] {
        const PROVIDES: &[&[u8]] = &[
            &[AdType::IncompleteList16bitServiceClasses.value()],
            &[AdType::CompleteList16bitServiceClasses.value()],
            &[AdType::IncompleteList128bitServiceClasses.value()],
            &[AdType::CompleteList128bitServiceClasses.value()],
        ];

        const SOLICITS: &[&[u8]] = &[
            &[AdType::List16bitServiceSolicitations.value()],
            &[AdType::List128bitServiceSolicitations.value()],
        ];

        match self {
            AdvertisementKind::Any => &[],
            AdvertisementKind::ProvidesServices => PROVIDES,
            AdvertisementKind::SolicitsServices => SOLICITS,
        }
    }

    /// True when a payload may carry only one of the prefixed structures to match
    ///
    /// Only one form of service list needs to be present, so the service kinds match any of
    /// their prefixes instead of all of them.
    pub(crate) fn match_any(self) -> bool {
        !matches!(self, AdvertisementKind::Any)
    }

    /// Check a scan entry against this kind
    pub fn matches(self, entry: &ScanEntry) -> bool {
        let merged = Self::merge_prefixes(core::slice::from_ref(&self));

        entry.matches(&merged, !self.match_any())
    }

    /// Used to pick the most specific kind when several match one entry
    pub(crate) fn specificity(self) -> usize {
        self.prefixes().len()
    }

    /// Merge the prefixes of the given kinds into one length prefixed byte sequence
    ///
    /// An empty sequence is returned when any kind is unrestricted, since everything is matched
    /// anyway.
    pub(crate) fn merge_prefixes(kinds: &[AdvertisementKind]) -> Vec<u8> {
        let mut merged = Vec::new();

        for kind in kinds {
            if kind.prefixes().is_empty() {
                return Vec::new();
            }

            for prefix in kind.prefixes() {
                merged.push(prefix.len() as u8);
                merged.extend_from_slice(prefix);
            }
        }

        merged
    }
}

/// One BLE advertisement
///
/// A locally created advertisement is mutable and has no address or signal strength. An
/// advertisement captured from a scan is immutable and carries the observations of the scanner.
#[derive(Clone, Debug)]
pub struct Advertisement {
    data: AdvertisingData,
    address: Option<DeviceAddress>,
    rssi: Option<i8>,
    connectable: bool,
    scan_response: bool,
    mutable: bool,
}

impl Advertisement {
    /// Create an empty advertisement
    pub fn new() -> Self {
        Advertisement {
            data: AdvertisingData::new(),
            address: None,
            rssi: None,
            connectable: false,
            scan_response: false,
            mutable: true,
        }
    }

    /// Create a connectable advertisement listing provided services
    ///
    /// The general discovery and LE only flags are set, as is done for every discoverable
    /// peripheral.
    ///
    /// # Error
    /// A service list is larger than one AD structure can carry.
    pub fn provide_services(services: &[Uuid]) -> Result<Self, Error> {
        let mut advertisement = Self::new();

        advertisement.set_discoverable_flags()?;

        advertisement.connectable = true;

        let (classes_16, classes_128) = split_by_width(services);

        if !classes_16.is_empty() {
            advertisement.data.set_struct(&classes_16)?;
        }

        if !classes_128.is_empty() {
            advertisement.data.set_struct(&classes_128)?;
        }

        Ok(advertisement)
    }

    /// Create a connectable advertisement listing solicited services
    ///
    /// # Error
    /// A solicitation list is larger than one AD structure can carry.
    pub fn solicit_services(services: &[Uuid]) -> Result<Self, Error> {
        let mut advertisement = Self::new();

        advertisement.set_discoverable_flags()?;

        advertisement.connectable = true;

        let (classes_16, classes_128) = split_by_width(services);

        if !classes_16.is_empty() {
            advertisement.data.set_struct(&classes_16.into_solicitation())?;
        }

        if !classes_128.is_empty() {
            advertisement.data.set_struct(&classes_128.into_solicitation())?;
        }

        Ok(advertisement)
    }

    /// Create an immutable advertisement from a scanned entry
    pub fn from_entry(entry: &ScanEntry) -> Self {
        Advertisement {
            data: AdvertisingData::decode(entry.data()),
            address: Some(entry.address()),
            rssi: Some(entry.rssi()),
            connectable: entry.connectable(),
            scan_response: entry.is_scan_response(),
            mutable: false,
        }
    }

    fn set_discoverable_flags(&mut self) -> Result<(), Error> {
        let mut flags = Flags::new();

        flags.set_general_discovery(true).set_le_only(true);

        self.data.set_struct(&flags)
    }

    fn check_mutable(&self) -> Result<(), Error> {
        if self.mutable {
            Ok(())
        } else {
            Err(Error::AdvertisementImmutable)
        }
    }

    /// The address of the advertiser, present only on scanned advertisements
    pub fn address(&self) -> Option<DeviceAddress> {
        self.address
    }

    /// Signal strength of the scanned advertisement in dBm, present only on scanned
    /// advertisements
    pub fn rssi(&self) -> Option<i8> {
        self.rssi
    }

    pub fn connectable(&self) -> bool {
        self.connectable
    }

    pub fn set_connectable(&mut self, connectable: bool) -> Result<(), Error> {
        self.check_mutable()?;

        self.connectable = connectable;

        Ok(())
    }

    /// True if this was captured from a scan response rather than an advertising PDU
    pub fn is_scan_response(&self) -> bool {
        self.scan_response
    }

    /// True for locally created advertisements
    pub fn is_mutable(&self) -> bool {
        self.mutable
    }

    /// The advertising flags, empty when the structure is absent
    pub fn flags(&self) -> Flags {
        self.data
            .get(AdType::Flags)
            .and_then(|data| data.first())
            .map(|bits| Flags::from_bits(*bits))
            .unwrap_or_default()
    }

    pub fn set_flags(&mut self, flags: Flags) -> Result<(), Error> {
        self.check_mutable()?;

        self.data.set_struct(&flags)
    }

    /// The complete local name
    pub fn complete_name(&self) -> Option<&str> {
        self.data
            .get(AdType::CompleteLocalName)
            .and_then(|data| core::str::from_utf8(data).ok())
    }

    pub fn set_complete_name(&mut self, name: &str) -> Result<(), Error> {
        self.check_mutable()?;

        self.data.set_struct(&LocalName::new(name, true))
    }

    /// The shortened local name
    pub fn short_name(&self) -> Option<&str> {
        self.data
            .get(AdType::ShortenedLocalName)
            .and_then(|data| core::str::from_utf8(data).ok())
    }

    pub fn set_short_name(&mut self, name: &str) -> Result<(), Error> {
        self.check_mutable()?;

        self.data.set_struct(&LocalName::new(name, false))
    }

    /// The advertised transmit power level in dBm
    pub fn tx_power(&self) -> Option<i8> {
        match self.data.get(AdType::TxPowerLevel) {
            Some([level]) => Some(*level as i8),
            _ => None,
        }
    }

    pub fn set_tx_power(&mut self, level: i8) -> Result<(), Error> {
        self.check_mutable()?;

        self.data.set_struct(&TxPower(level))
    }

    /// The appearance category of the device
    pub fn appearance(&self) -> Option<u16> {
        match self.data.get(AdType::Appearance) {
            Some([lo, hi]) => Some(u16::from_le_bytes([*lo, *hi])),
            _ => None,
        }
    }

    pub fn set_appearance(&mut self, category: u16) -> Result<(), Error> {
        self.check_mutable()?;

        self.data.set_struct(&Appearance(category))
    }

    /// The provided service class UUIDs, across all four list forms
    pub fn services(&self) -> Vec<Uuid> {
        let mut services = Vec::new();

        for ad_type in [
            AdType::IncompleteList16bitServiceClasses,
            AdType::CompleteList16bitServiceClasses,
        ] {
            for data in self.data.get_all(ad_type) {
                for chunk in data.chunks_exact(2) {
                    services.push(Uuid::from_u16(u16::from_le_bytes([chunk[0], chunk[1]])));
                }
            }
        }

        for ad_type in [
            AdType::IncompleteList128bitServiceClasses,
            AdType::CompleteList128bitServiceClasses,
        ] {
            for data in self.data.get_all(ad_type) {
                for chunk in data.chunks_exact(16) {
                    let mut bytes = [0u8; 16];

                    bytes.copy_from_slice(chunk);

                    services.push(Uuid::from_le_bytes(bytes));
                }
            }
        }

        services
    }

    /// The solicited service class UUIDs
    pub fn solicited_services(&self) -> Vec<Uuid> {
        let mut services = Vec::new();

        for data in self.data.get_all(AdType::List16bitServiceSolicitations) {
            for chunk in data.chunks_exact(2) {
                services.push(Uuid::from_u16(u16::from_le_bytes([chunk[0], chunk[1]])));
            }
        }

        for data in self.data.get_all(AdType::List128bitServiceSolicitations) {
            for chunk in data.chunks_exact(16) {
                let mut bytes = [0u8; 16];

                bytes.copy_from_slice(chunk);

                services.push(Uuid::from_le_bytes(bytes));
            }
        }

        services
    }

    /// True if the advertisement lists the given provided service
    pub fn provides_service(&self, uuid: Uuid) -> bool {
        self.services().contains(&uuid)
    }

    /// The manufacturer specific data as a company identifier and payload
    pub fn manufacturer_data(&self) -> Option<(u16, &[u8])> {
        let data = self.data.get(AdType::ManufacturerSpecificData)?;

        let (raw_id, payload) = data.split_first_chunk::<2>()?;

        Some((u16::from_le_bytes(*raw_id), payload))
    }

    pub fn set_manufacturer_data(&mut self, company_id: u16, data: &[u8]) -> Result<(), Error> {
        self.check_mutable()?;

        self.data.set_struct(&ManufacturerData::new(company_id, data))
    }

    /// The service data belonging to the given service
    pub fn service_data(&self, uuid: Uuid) -> Option<&[u8]> {
        let (ad_type, prefix) = service_data_prefix(uuid);

        self.data
            .get_all(ad_type)
            .find(|data| data.starts_with(&prefix))
            .map(|data| &data[prefix.len()..])
    }

    pub fn set_service_data(&mut self, uuid: Uuid, data: &[u8]) -> Result<(), Error> {
        self.check_mutable()?;

        let mut buffer = vec![0u8; ServiceData::new(uuid, data).data_len() + HEADER_SIZE];

        let ad = ServiceData::new(uuid, data).convert_into(&mut buffer)?;

        let value = ad.data().to_vec();

        let (ad_type, prefix) = service_data_prefix(uuid);

        // replace the entry for this service only, other services keep their data
        let entries = self.data.fields.entry(ad_type.value()).or_default();

        match entries.iter_mut().find(|entry| entry.starts_with(&prefix)) {
            Some(entry) => *entry = value,
            None => entries.push(value),
        }

        Ok(())
    }

    /// The raw payload bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        self.data.encode()
    }

    /// The number of bytes of the encoded payload
    pub fn encoded_len(&self) -> usize {
        self.data.encoded_len()
    }
}

impl Default for Advertisement {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Advertisement {
    /// Two advertisements are equal when their payloads are equal
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl core::fmt::Display for Advertisement {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "<Advertisement")?;

        if let Some(address) = self.address {
            write!(f, " address={}", address)?;
        }

        if let Some(rssi) = self.rssi {
            write!(f, " rssi={}", rssi)?;
        }

        if let Some(name) = self.complete_name().or_else(|| self.short_name()) {
            write!(f, " name={:?}", name)?;
        }

        write!(f, ">")
    }
}

/// The AD type and on air UUID prefix under which the data of a service is stored
///
/// A 16-bit service UUID goes on air as its two byte assigned number, not as the low bytes of
/// the full 128-bit form.
fn service_data_prefix(uuid: Uuid) -> (AdType, Vec<u8>) {
    match u16::try_from(uuid) {
        Ok(short) => (AdType::ServiceData16bitUuid, short.to_le_bytes().to_vec()),
        Err(_) => (AdType::ServiceData128bitUuid, uuid.to_le_bytes().to_vec()),
    }
}

fn split_by_width(services: &[Uuid]) -> (ServiceClasses<u16>, ServiceClasses<u128>) {
    let mut classes_16 = service_classes::new_16(true);
    let mut classes_128 = service_classes::new_128(true);

    for uuid in services {
        if !classes_16.add(*uuid) {
            classes_128.add(*uuid);
        }
    }

    (classes_16, classes_128)
}
