//! Advertising Data: Service Class UUID lists
//!
//! A device advertises the services it provides as lists of service class UUIDs. There is a
//! complete and an incomplete list version for each UUID width, and a parallel pair of
//! solicitation lists for services a device would like its peer to provide.

use super::*;
use crate::uuid::Uuid;
use std::collections::BTreeSet;

mod sealed {
    use crate::assigned::{AdType, StructWriter};
    use crate::uuid::Uuid;

    /// Width specific details of a service class list element
    pub trait UuidWidth: Ord + Copy {
        const INCOMPLETE: AdType;
        const COMPLETE: AdType;
        const SOLICITATION: AdType;
        const WIDTH: usize;

        fn try_from_uuid(uuid: Uuid) -> Option<Self>;

        fn into_uuid(self) -> Uuid;

        fn write_le(self, writer: &mut StructWriter<'_>);

        fn read_le(raw: &[u8]) -> Self;
    }

    impl UuidWidth for u16 {
        const INCOMPLETE: AdType = AdType::IncompleteList16bitServiceClasses;
        const COMPLETE: AdType = AdType::CompleteList16bitServiceClasses;
        const SOLICITATION: AdType = AdType::List16bitServiceSolicitations;
        const WIDTH: usize = 2;

        fn try_from_uuid(uuid: Uuid) -> Option<Self> {
            uuid.try_into().ok()
        }

        fn into_uuid(self) -> Uuid {
            Uuid::from_u16(self)
        }

        fn write_le(self, writer: &mut StructWriter<'_>) {
            writer.extend(&self.to_le_bytes())
        }

        fn read_le(raw: &[u8]) -> Self {
            u16::from_le_bytes([raw[0], raw[1]])
        }
    }

    impl UuidWidth for u128 {
        const INCOMPLETE: AdType = AdType::IncompleteList128bitServiceClasses;
        const COMPLETE: AdType = AdType::CompleteList128bitServiceClasses;
        const SOLICITATION: AdType = AdType::List128bitServiceSolicitations;
        const WIDTH: usize = 16;

        fn try_from_uuid(uuid: Uuid) -> Option<Self> {
            Some(uuid.into())
        }

        fn into_uuid(self) -> Uuid {
            Uuid::from_u128(self)
        }

        fn write_le(self, writer: &mut StructWriter<'_>) {
            writer.extend(&self.to_le_bytes())
        }

        fn read_le(raw: &[u8]) -> Self {
            let mut bytes = [0u8; 16];

            bytes.copy_from_slice(raw);

            u128::from_le_bytes(bytes)
        }
    }
}

use sealed::UuidWidth;

/// Marker for which AD types a list element width uses
///
/// Implemented for `u16` and `u128` only; the encoding details stay internal to this module.
pub trait ClassUuid: UuidWidth {}

impl ClassUuid for u16 {}

impl ClassUuid for u128 {}

/// Create a service class list of 16-bit UUIDs
///
/// `complete` indicates whether the list is the complete list of provided services.
pub fn new_16(complete: bool) -> ServiceClasses<u16> {
    ServiceClasses::new(complete)
}

/// Create a service class list of 128-bit UUIDs
///
/// `complete` indicates whether the list is the complete list of provided services.
pub fn new_128(complete: bool) -> ServiceClasses<u128> {
    ServiceClasses::new(complete)
}

/// A list of service class UUIDs
///
/// The list is a set, so a UUID cannot appear twice within one list. Elements are either 16-bit
/// or 128-bit values; a UUID that does not fit the element width is rejected by [`add`].
///
/// [`add`]: ServiceClasses::add
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceClasses<T: ClassUuid> {
    set: BTreeSet<T>,
    complete: bool,
}

impl<T: ClassUuid> ServiceClasses<T> {
    fn new(complete: bool) -> Self {
        ServiceClasses {
            set: BTreeSet::new(),
            complete,
        }
    }

    /// True if this is a complete list of the provided service classes
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Add a UUID to the list
    ///
    /// Returns false, without adding, when the UUID cannot be represented at the element width
    /// of this list.
    pub fn add(&mut self, uuid: Uuid) -> bool {
        match T::try_from_uuid(uuid) {
            Some(v) => {
                self.set.insert(v);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, uuid: Uuid) -> bool {
        T::try_from_uuid(uuid).map(|v| self.set.contains(&v)).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Iterate over the listed UUIDs
    pub fn iter(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.set.iter().map(|v| v.into_uuid())
    }

    /// Reinterpret this as a solicitation list
    ///
    /// A solicitation list has the same data format under a different AD type and no
    /// complete/incomplete distinction.
    pub fn into_solicitation(self) -> ServiceSolicitations<T> {
        ServiceSolicitations(self)
    }

    fn parse(ad: AdStruct<'_>, complete: bool) -> Result<Self, Error> {
        let chunks = ad.data().chunks_exact(T::WIDTH);

        if !chunks.remainder().is_empty() {
            return Err(Error::UnevenData);
        }

        let set = chunks.map(T::read_le).collect();

        Ok(ServiceClasses { set, complete })
    }
}

impl<T: ClassUuid> IntoAdStruct for ServiceClasses<T> {
    fn data_len(&self) -> usize {
        T::WIDTH * self.set.len()
    }

    fn convert_into<'a>(&self, b: &'a mut [u8]) -> Result<AdStruct<'a>, ConvertError> {
        let ad_type = if self.complete { T::COMPLETE } else { T::INCOMPLETE };

        let mut writer = StructWriter::new(b, ad_type, self.data_len())?;

        for v in &self.set {
            v.write_le(&mut writer);
        }

        Ok(writer.finish())
    }
}

impl<T: ClassUuid> TryFromAdStruct<'_> for ServiceClasses<T> {
    fn try_from_ad_struct(ad: AdStruct<'_>) -> Result<Self, Error> {
        if ad.ad_type() == T::COMPLETE.value() {
            Self::parse(ad, true)
        } else if ad.ad_type() == T::INCOMPLETE.value() {
            Self::parse(ad, false)
        } else {
            Err(Error::WrongAdType)
        }
    }
}

impl<T: ClassUuid> core::iter::FromIterator<Uuid> for ServiceClasses<T> {
    /// Collect UUIDs into a complete list, dropping any that do not fit the element width
    fn from_iter<I: IntoIterator<Item = Uuid>>(iter: I) -> Self {
        let mut classes = Self::new(true);

        for uuid in iter {
            classes.add(uuid);
        }

        classes
    }
}

/// A list of solicited service class UUIDs
///
/// Solicited services are the services a device would like to use over a connection, rather
/// than the services it provides.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceSolicitations<T: ClassUuid>(ServiceClasses<T>);

impl<T: ClassUuid> ServiceSolicitations<T> {
    pub fn iter(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.0.iter()
    }

    pub fn contains(&self, uuid: Uuid) -> bool {
        self.0.contains(uuid)
    }
}

impl<T: ClassUuid> IntoAdStruct for ServiceSolicitations<T> {
    fn data_len(&self) -> usize {
        self.0.data_len()
    }

    fn convert_into<'a>(&self, b: &'a mut [u8]) -> Result<AdStruct<'a>, ConvertError> {
        let mut writer = StructWriter::new(b, T::SOLICITATION, self.data_len())?;

        for v in &self.0.set {
            v.write_le(&mut writer);
        }

        Ok(writer.finish())
    }
}

impl<T: ClassUuid> TryFromAdStruct<'_> for ServiceSolicitations<T> {
    fn try_from_ad_struct(ad: AdStruct<'_>) -> Result<Self, Error> {
        if ad.ad_type() != T::SOLICITATION.value() {
            return Err(Error::WrongAdType);
        }

        ServiceClasses::parse(ad, true).map(ServiceSolicitations)
    }
}
