//! Bluetooth UUIDs
//!
//! A Bluetooth UUID differs from the UUID of
//! [RFC 4122](https://datatracker.ietf.org/doc/html/rfc4122) in that the specification reserves a
//! region of the UUID space for shortened identifiers. Services and characteristics assigned by
//! the Bluetooth SIG use a 16-bit (or rarely a 32-bit) value that maps onto the Bluetooth base
//! UUID, while vendor defined services use a full 128-bit value.

use serde::{Deserialize, Serialize};

/// A Bluetooth UUID
///
/// The full 128-bit value is always stored. A UUID created from a 16-bit or 32-bit assigned
/// number compares equal to the same identifier expanded onto the Bluetooth base UUID.
///
/// ```
/// # use easy_ble::Uuid;
///
/// let battery_service = Uuid::from_u16(0x180F);
///
/// assert!(battery_service.is_16_bit());
///
/// // A vendor UUID occupies the full 128 bits
/// let nordic_uart: Uuid = "6E400001-B5A3-F393-E0A9-E50E24DCCA9E".parse().unwrap();
///
/// assert!(!nordic_uart.is_16_bit());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uuid {
    value: u128,
}

impl Uuid {
    /// The Bluetooth base UUID (Vol 3, Part B, sec 2.5.1)
    const BASE: u128 = 0x0000000000001000800000805F9B34FB;

    /// Create a UUID from a 16-bit assigned number
    pub const fn from_u16(v: u16) -> Self {
        Uuid {
            value: ((v as u128) << 96) | Self::BASE,
        }
    }

    /// Create a UUID from a 32-bit assigned number
    pub const fn from_u32(v: u32) -> Self {
        Uuid {
            value: ((v as u128) << 96) | Self::BASE,
        }
    }

    /// Create a UUID from a full 128-bit value
    pub const fn from_u128(v: u128) -> Self {
        Uuid { value: v }
    }

    /// True if the UUID lies within the 16-bit shortened region
    pub fn is_16_bit(&self) -> bool {
        self.value & !((u16::MAX as u128) << 96) == Self::BASE
    }

    /// True if the UUID lies within the 32-bit shortened region
    pub fn is_32_bit(&self) -> bool {
        self.value & !((u32::MAX as u128) << 96) == Self::BASE
    }

    /// The UUID in the little endian byte order used on air
    pub fn to_le_bytes(self) -> [u8; 16] {
        self.value.to_le_bytes()
    }

    /// Create a UUID from the little endian byte order used on air
    pub fn from_le_bytes(bytes: [u8; 16]) -> Self {
        Uuid {
            value: u128::from_le_bytes(bytes),
        }
    }
}

impl core::fmt::Debug for Uuid {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        core::fmt::Display::fmt(self, f)
    }
}

/// Displays the shortest form of the UUID
///
/// A UUID within a shortened region is displayed as the assigned number, anything else is
/// displayed in the hyphenated [8]-[4]-[4]-[4]-[12] format.
impl core::fmt::Display for Uuid {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        if let Ok(v) = u16::try_from(*self) {
            write!(f, "{:#06x}", v)
        } else if let Ok(v) = u32::try_from(*self) {
            write!(f, "{:#010x}", v)
        } else {
            let b = self.value.to_be_bytes();

            write!(
                f,
                "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-\
                 {:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
                b[0],
                b[1],
                b[2],
                b[3],
                b[4],
                b[5],
                b[6],
                b[7],
                b[8],
                b[9],
                b[10],
                b[11],
                b[12],
                b[13],
                b[14],
                b[15]
            )
        }
    }
}

impl From<u16> for Uuid {
    fn from(v: u16) -> Uuid {
        Uuid::from_u16(v)
    }
}

impl From<u32> for Uuid {
    fn from(v: u32) -> Uuid {
        Uuid::from_u32(v)
    }
}

impl From<u128> for Uuid {
    fn from(v: u128) -> Uuid {
        Uuid::from_u128(v)
    }
}

impl From<Uuid> for u128 {
    fn from(uuid: Uuid) -> u128 {
        uuid.value
    }
}

impl TryFrom<Uuid> for u16 {
    type Error = ();

    /// Try to extract the 16-bit shortened form
    fn try_from(uuid: Uuid) -> Result<u16, ()> {
        if uuid.is_16_bit() {
            Ok((uuid.value >> 96) as u16)
        } else {
            Err(())
        }
    }
}

impl TryFrom<Uuid> for u32 {
    type Error = ();

    /// Try to extract the 32-bit shortened form
    fn try_from(uuid: Uuid) -> Result<u32, ()> {
        if uuid.is_32_bit() {
            Ok((uuid.value >> 96) as u32)
        } else {
            Err(())
        }
    }
}

#[cfg(feature = "uuid-crate")]
impl From<::uuid::Uuid> for Uuid {
    fn from(uuid: ::uuid::Uuid) -> Uuid {
        Uuid::from_u128(u128::from_be_bytes(*uuid.as_bytes()))
    }
}

#[cfg(feature = "uuid-crate")]
impl From<Uuid> for ::uuid::Uuid {
    fn from(uuid: Uuid) -> ::uuid::Uuid {
        ::uuid::Uuid::from_bytes(uuid.value.to_be_bytes())
    }
}

/// Error when parsing a UUID from its string format
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UuidParseError {
    /// The string did not have the [8]-[4]-[4]-[4]-[12] field layout
    BadLayout,
    /// A character within a field was not a hexadecimal digit
    BadDigit,
}

impl core::fmt::Display for UuidParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match *self {
            UuidParseError::BadLayout => write!(f, "expected the format [8]-[4]-[4]-[4]-[12]"),
            UuidParseError::BadDigit => write!(f, "non-hexadecimal digit within a field"),
        }
    }
}

/// Parse a UUID from the hyphenated format
///
/// The expected format is the 16 octet [8]-[4]-[4]-[4]-[12] layout, where each number is the
/// count of hexadecimal characters in the field, e.g. `"6E400001-B5A3-F393-E0A9-E50E24DCCA9E"`.
impl core::str::FromStr for Uuid {
    type Err = UuidParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const FIELD_CHARS: [usize; 5] = [8, 4, 4, 4, 12];

        let mut fields = s.split('-');

        let mut value = 0u128;

        for chars in FIELD_CHARS {
            let field = fields.next().ok_or(UuidParseError::BadLayout)?;

            if field.len() != chars {
                return Err(UuidParseError::BadLayout);
            }

            // from_str_radix also accepts a leading sign, which has no place in a UUID
            if !field.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(UuidParseError::BadDigit);
            }

            value = (value << (chars * 4))
                | u128::from_str_radix(field, 16).map_err(|_| UuidParseError::BadDigit)?;
        }

        if fields.next().is_some() {
            return Err(UuidParseError::BadLayout);
        }

        Ok(Uuid { value })
    }
}
