//! Byte codecs for characteristic values

/// A failure converting between a characteristic value and its byte form
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValueError {
    /// The raw value has the wrong number of bytes
    WrongSize { expected: usize, actual: usize },
    /// A text value is not valid UTF-8
    Utf8,
    /// The value is outside the permitted range of the characteristic
    OutOfRange,
    /// A structured value could not be converted, with the codec's reason
    Codec(String),
}

impl core::fmt::Display for ValueError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            ValueError::WrongSize { expected, actual } => {
                write!(f, "expected a {} byte value, got {} bytes", expected, actual)
            }
            ValueError::Utf8 => f.write_str("value is not valid UTF-8"),
            ValueError::OutOfRange => f.write_str("value is out of range"),
            ValueError::Codec(reason) => write!(f, "value conversion failed: {}", reason),
        }
    }
}

impl std::error::Error for ValueError {}

/// Conversion between a value type and the bytes of a characteristic
///
/// `encode_into` is given a buffer of exactly [`encoded_len`] bytes.
///
/// [`encoded_len`]: ValueFormat::encoded_len
pub trait ValueFormat: Sized {
    /// The number of bytes of the encoded value
    fn encoded_len(&self) -> usize;

    /// Write the encoded value into `buffer`
    fn encode_into(&self, buffer: &mut [u8]);

    /// Parse a value from its byte form
    fn try_decode(raw: &[u8]) -> Result<Self, ValueError>;

    /// Encode into a freshly allocated buffer
    fn encode(&self) -> Vec<u8> {
        let mut buffer = vec![0u8; self.encoded_len()];

        self.encode_into(&mut buffer);

        buffer
    }
}

macro_rules! impl_le_number {
    ($($ty:ty),+) => {
        $(
            impl ValueFormat for $ty {
                fn encoded_len(&self) -> usize {
                    core::mem::size_of::<$ty>()
                }

                fn encode_into(&self, buffer: &mut [u8]) {
                    buffer.copy_from_slice(&self.to_le_bytes());
                }

                fn try_decode(raw: &[u8]) -> Result<Self, ValueError> {
                    let bytes = raw.try_into().map_err(|_| ValueError::WrongSize {
                        expected: core::mem::size_of::<$ty>(),
                        actual: raw.len(),
                    })?;

                    Ok(<$ty>::from_le_bytes(bytes))
                }
            }
        )+
    };
}

impl_le_number!(u8, i8, u16, i16, u32, i32, f32);

impl ValueFormat for String {
    fn encoded_len(&self) -> usize {
        self.len()
    }

    fn encode_into(&self, buffer: &mut [u8]) {
        buffer.copy_from_slice(self.as_bytes());
    }

    fn try_decode(raw: &[u8]) -> Result<Self, ValueError> {
        core::str::from_utf8(raw)
            .map(str::to_owned)
            .map_err(|_| ValueError::Utf8)
    }
}

impl ValueFormat for Vec<u8> {
    fn encoded_len(&self) -> usize {
        self.len()
    }

    fn encode_into(&self, buffer: &mut [u8]) {
        buffer.copy_from_slice(self);
    }

    fn try_decode(raw: &[u8]) -> Result<Self, ValueError> {
        Ok(raw.to_vec())
    }
}

/// The PnP ID layout of the device information service
///
/// Vendor id source, vendor id, product id, product version.
impl ValueFormat for (u8, u16, u16, u16) {
    fn encoded_len(&self) -> usize {
        7
    }

    fn encode_into(&self, buffer: &mut [u8]) {
        buffer[0] = self.0;
        buffer[1..3].copy_from_slice(&self.1.to_le_bytes());
        buffer[3..5].copy_from_slice(&self.2.to_le_bytes());
        buffer[5..7].copy_from_slice(&self.3.to_le_bytes());
    }

    fn try_decode(raw: &[u8]) -> Result<Self, ValueError> {
        if raw.len() != 7 {
            return Err(ValueError::WrongSize {
                expected: 7,
                actual: raw.len(),
            });
        }

        Ok((
            raw[0],
            u16::from_le_bytes([raw[1], raw[2]]),
            u16::from_le_bytes([raw[3], raw[4]]),
            u16::from_le_bytes([raw[5], raw[6]]),
        ))
    }
}

/// A `u8` restricted to an inclusive range
///
/// A value outside `MIN..=MAX`, coming from either side of the link, is rejected rather than
/// clamped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct RangedU8<const MIN: u8, const MAX: u8>(u8);

impl<const MIN: u8, const MAX: u8> RangedU8<MIN, MAX> {
    pub fn new(value: u8) -> Result<Self, ValueError> {
        if (MIN..=MAX).contains(&value) {
            Ok(RangedU8(value))
        } else {
            Err(ValueError::OutOfRange)
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl<const MIN: u8, const MAX: u8> ValueFormat for RangedU8<MIN, MAX> {
    fn encoded_len(&self) -> usize {
        1
    }

    fn encode_into(&self, buffer: &mut [u8]) {
        buffer[0] = self.0;
    }

    fn try_decode(raw: &[u8]) -> Result<Self, ValueError> {
        match raw {
            [value] => Self::new(*value),
            _ => Err(ValueError::WrongSize {
                expected: 1,
                actual: raw.len(),
            }),
        }
    }
}
