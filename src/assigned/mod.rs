//! Assigned numbers and the advertising data formats
//!
//! An advertising payload is a contiguous series of *AD structures*. Every structure has the
//! same container format of one byte for the length, one byte for the assigned AD type, and zero
//! or more bytes of data. The assigned numbers come from the Bluetooth SIG
//! [assigned numbers](https://www.bluetooth.com/specifications/assigned-numbers/) document.
//!
//! The types within the submodules model individual AD structures. They convert into raw
//! structures with [`IntoAdStruct`] and are recovered from scanned payloads with
//! [`TryFromAdStruct`].

pub mod appearance;
pub mod flags;
pub mod local_name;
pub mod manufacturer_data;
pub mod service_classes;
pub mod service_data;
pub mod tx_power;

/// Size of the header of an AD structure (the length and the type octet)
pub(crate) const HEADER_SIZE: usize = 2;

/// AD type assigned numbers used within advertising payloads
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AdType {
    Flags,
    IncompleteList16bitServiceClasses,
    CompleteList16bitServiceClasses,
    IncompleteList32bitServiceClasses,
    CompleteList32bitServiceClasses,
    IncompleteList128bitServiceClasses,
    CompleteList128bitServiceClasses,
    ShortenedLocalName,
    CompleteLocalName,
    TxPowerLevel,
    List16bitServiceSolicitations,
    List128bitServiceSolicitations,
    ServiceData16bitUuid,
    Appearance,
    ServiceData128bitUuid,
    ManufacturerSpecificData,
}

impl AdType {
    pub const fn value(self) -> u8 {
        match self {
            AdType::Flags => 0x01,
            AdType::IncompleteList16bitServiceClasses => 0x02,
            AdType::CompleteList16bitServiceClasses => 0x03,
            AdType::IncompleteList32bitServiceClasses => 0x04,
            AdType::CompleteList32bitServiceClasses => 0x05,
            AdType::IncompleteList128bitServiceClasses => 0x06,
            AdType::CompleteList128bitServiceClasses => 0x07,
            AdType::ShortenedLocalName => 0x08,
            AdType::CompleteLocalName => 0x09,
            AdType::TxPowerLevel => 0x0A,
            AdType::List16bitServiceSolicitations => 0x14,
            AdType::List128bitServiceSolicitations => 0x15,
            AdType::ServiceData16bitUuid => 0x16,
            AdType::Appearance => 0x19,
            AdType::ServiceData128bitUuid => 0x21,
            AdType::ManufacturerSpecificData => 0xFF,
        }
    }
}

/// Errors from interpreting raw AD structures
#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    /// The AD type of the structure is not the expected type
    WrongAdType,
    /// The length octet does not agree with the available bytes
    BadLength,
    /// The data did not divide evenly into its element size
    UnevenData,
    /// The data was assumed to be UTF-8 formatted but it is not
    Utf8(core::str::Utf8Error),
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match *self {
            Error::WrongAdType => write!(f, "unexpected AD type"),
            Error::BadLength => write!(
                f,
                "the length of the structure is larger than the remaining bytes of the payload"
            ),
            Error::UnevenData => write!(f, "data does not divide evenly into its element size"),
            Error::Utf8(e) => write!(f, "invalid UTF-8, valid up to {}", e.valid_up_to()),
        }
    }
}

impl From<core::str::Utf8Error> for Error {
    fn from(e: core::str::Utf8Error) -> Self {
        Error::Utf8(e)
    }
}

/// Error when an AD structure does not fit within a payload buffer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConvertError {
    /// Bytes needed for the structure
    pub required: usize,
    /// Bytes remaining within the buffer
    pub remaining: usize,
}

impl core::fmt::Display for ConvertError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "advertising structure of {} bytes does not fit within the {} remaining bytes",
            self.required, self.remaining
        )
    }
}

impl std::error::Error for ConvertError {}

/// A view over one raw AD structure
///
/// The wrapped bytes always contain a complete structure, length octet included.
#[derive(Clone, Copy, Debug)]
pub struct AdStruct<'a>(&'a [u8]);

impl<'a> AdStruct<'a> {
    /// Try to take an `AdStruct` from the front of `bytes`
    ///
    /// On success the structure is returned along with the rest of the bytes after it. `None` is
    /// returned for a zero length octet, which marks an early termination of the payload; any
    /// bytes after it are to be ignored.
    pub fn try_new(bytes: &'a [u8]) -> Result<Option<(Self, &'a [u8])>, Error> {
        match bytes.first().copied() {
            None | Some(0) => Ok(None),
            Some(len) if (len as usize) < bytes.len() => {
                let (this, rest) = bytes.split_at(1 + len as usize);

                Ok(Some((AdStruct(this), rest)))
            }
            Some(_) => Err(Error::BadLength),
        }
    }

    /// The raw AD type octet
    pub fn ad_type(&self) -> u8 {
        self.0[1]
    }

    /// The data bytes after the type octet
    pub fn data(&self) -> &'a [u8] {
        &self.0[2..]
    }

    /// The type octet followed by the data bytes
    ///
    /// This is the part of the structure that scan filter prefixes are compared against.
    pub fn type_and_data(&self) -> &'a [u8] {
        &self.0[1..]
    }

    /// The total size of the structure, length octet included
    pub fn size(&self) -> usize {
        self.0.len()
    }

    /// Try to convert this structure into the type `T`
    pub fn try_into<T>(self) -> Result<T, Error>
    where
        T: TryFromAdStruct<'a>,
    {
        T::try_from_ad_struct(self)
    }
}

/// An iterator over the AD structures of a payload
///
/// Iteration ends when the payload is exhausted or a zero length octet is reached.
#[derive(Clone, Copy, Debug)]
pub struct AdStructIter<'a>(&'a [u8]);

impl<'a> AdStructIter<'a> {
    pub fn new(payload: &'a [u8]) -> Self {
        AdStructIter(payload)
    }

    /// Create an iterator that does not report errors
    ///
    /// A scanner is not at fault when it receives a malformed payload, so instead of surfacing
    /// an error this ends the iteration at the first bad structure.
    pub fn silent(self) -> impl Iterator<Item = AdStruct<'a>> + 'a {
        struct Silent<'a>(&'a [u8]);

        impl<'a> Iterator for Silent<'a> {
            type Item = AdStruct<'a>;

            fn next(&mut self) -> Option<Self::Item> {
                AdStruct::try_new(self.0).ok().flatten().map(|(ad, rest)| {
                    self.0 = rest;
                    ad
                })
            }
        }

        Silent(self.0)
    }
}

impl<'a> Iterator for AdStructIter<'a> {
    type Item = Result<AdStruct<'a>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        match AdStruct::try_new(self.0) {
            Ok(None) => None,
            Ok(Some((ad, rest))) => {
                self.0 = rest;
                Some(Ok(ad))
            }
            Err(e) => {
                self.0 = &[];
                Some(Err(e))
            }
        }
    }
}

/// A trait for converting a local type into an AD structure
pub trait IntoAdStruct {
    /// The length of the data portion of the structure
    fn data_len(&self) -> usize;

    /// Convert into a structure at the start of `b`
    ///
    /// # Error
    /// `b` is too small for the structure.
    fn convert_into<'a>(&self, b: &'a mut [u8]) -> Result<AdStruct<'a>, ConvertError>;
}

/// A trait for attempting to convert an AD structure into a local type
pub trait TryFromAdStruct<'a>: Sized {
    fn try_from_ad_struct(ad: AdStruct<'a>) -> Result<Self, Error>;
}

/// An intermediary for writing an AD structure into a buffer
///
/// The data octets are appended after the header, and `finish` fills out the header once the
/// length is known.
pub(crate) struct StructWriter<'a> {
    buffer: &'a mut [u8],
    // length octet value, starts at one for the type octet
    len: usize,
}

impl<'a> StructWriter<'a> {
    /// The largest value the length octet can hold
    const MAX_LEN: usize = u8::MAX as usize;

    pub(crate) fn new(buffer: &'a mut [u8], ad_type: AdType, data_len: usize) -> Result<Self, ConvertError> {
        if buffer.len() < data_len + HEADER_SIZE || data_len + 1 > Self::MAX_LEN {
            return Err(ConvertError {
                required: data_len + HEADER_SIZE,
                remaining: buffer.len(),
            });
        }

        buffer[1] = ad_type.value();

        Ok(StructWriter { buffer, len: 1 })
    }

    /// Append a data octet
    ///
    /// The caller keeps within the `data_len` given to `new`.
    pub(crate) fn push(&mut self, byte: u8) {
        self.len += 1;

        self.buffer[self.len] = byte;
    }

    /// Append data octets
    pub(crate) fn extend(&mut self, bytes: &[u8]) {
        self.buffer[self.len + 1..self.len + 1 + bytes.len()].copy_from_slice(bytes);

        self.len += bytes.len();
    }

    /// Fill out the header and return the completed structure
    pub(crate) fn finish(self) -> AdStruct<'a> {
        self.buffer[0] = self.len as u8;

        AdStruct(&self.buffer[..1 + self.len])
    }
}

/// A payload builder backed by a vector
///
/// This appends AD structures to a growing payload, so adding only fails for a structure whose
/// data cannot fit its length octet. Use this to assemble raw advertising data out of the types
/// within this module.
///
/// ```
/// # use easy_ble::assigned::{local_name::LocalName, PayloadBuilder};
///
/// let mut builder = PayloadBuilder::new();
///
/// builder.add(&LocalName::new("My Device", true)).unwrap();
///
/// assert_eq!(
///     builder.into_inner(),
///     [0x0a, 0x09, 0x4d, 0x79, 0x20, 0x44, 0x65, 0x76, 0x69, 0x63, 0x65]
/// );
/// ```
#[derive(Clone, Debug, Default)]
pub struct PayloadBuilder(Vec<u8>);

impl PayloadBuilder {
    pub fn new() -> Self {
        PayloadBuilder(Vec::new())
    }

    /// Append a structure to the payload
    ///
    /// # Error
    /// The data of the structure is larger than a length octet can describe.
    pub fn add<T: IntoAdStruct>(&mut self, t: &T) -> Result<&mut Self, ConvertError> {
        let start = self.0.len();

        self.0.resize(start + t.data_len() + HEADER_SIZE, 0);

        match t.convert_into(&mut self.0[start..]) {
            Ok(_) => Ok(self),
            Err(e) => {
                self.0.truncate(start);

                Err(e)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl core::ops::Deref for PayloadBuilder {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn struct_from_bytes() {
        let payload = [0x02, 0x01, 0x06, 0x03, 0x03, 0x0F, 0x18];

        let (first, rest) = AdStruct::try_new(&payload).unwrap().unwrap();

        assert_eq!(0x01, first.ad_type());
        assert_eq!(&[0x06], first.data());
        assert_eq!(3, first.size());

        let (second, rest) = AdStruct::try_new(rest).unwrap().unwrap();

        assert_eq!(0x03, second.ad_type());
        assert_eq!(&[0x0F, 0x18], second.data());
        assert!(rest.is_empty());
    }

    #[test]
    fn zero_length_terminates() {
        let payload = [0x00, 0x02, 0x01, 0x06];

        assert!(AdStruct::try_new(&payload).unwrap().is_none());
    }

    #[test]
    fn truncated_struct_is_an_error() {
        let payload = [0x05, 0x09, 0x41];

        assert_eq!(Err(Error::BadLength), AdStruct::try_new(&payload).map(|_| ()));
    }

    #[test]
    fn iterator_stops_at_early_termination() {
        let payload = [0x02, 0x01, 0x06, 0x00, 0x03, 0x03, 0x0F, 0x18];

        let types: Vec<u8> = AdStructIter::new(&payload)
            .map(|r| r.unwrap().ad_type())
            .collect();

        assert_eq!(vec![0x01], types);
    }

    #[test]
    fn builder_rejects_data_too_large_for_the_length_octet() {
        use manufacturer_data::ManufacturerData;

        let mut builder = PayloadBuilder::new();

        let oversized = vec![0u8; 300];

        assert!(builder.add(&ManufacturerData::new(0x004C, &oversized)).is_err());
        assert!(builder.is_empty());
    }

    #[test]
    fn silent_iterator_swallows_errors() {
        // second struct claims more bytes than remain
        let payload = [0x02, 0x01, 0x06, 0x09, 0x09, 0x41];

        let count = AdStructIter::new(&payload).silent().count();

        assert_eq!(1, count);
    }
}
