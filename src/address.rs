//! Bluetooth device addresses

use serde::{Deserialize, Serialize};

/// The kind of a device address
///
/// A public address is assigned per IEEE 802-2014 while a random address is generated by the
/// device. The kind is carried alongside the address bytes on air, so two addresses with the
/// same bytes but different kinds identify different devices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AddressKind {
    Public,
    Random,
}

/// A six-byte BLE device address
///
/// The bytes are kept in the little endian order used on air. `DeviceAddress` implements `Eq`,
/// `Ord` and `Hash` so scan results can be deduplicated with a set.
///
/// ```
/// # use std::collections::HashSet;
/// # use easy_ble::DeviceAddress;
///
/// let mut seen = HashSet::new();
///
/// let address = DeviceAddress::public([0x2A, 0x0, 0x0, 0x0, 0x0, 0xC0]);
///
/// assert!(seen.insert(address));
///
/// // repeated insertion of the same address does not grow the set
/// assert!(!seen.insert(address));
/// assert_eq!(1, seen.len());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DeviceAddress {
    kind: AddressKind,
    bytes: [u8; 6],
}

impl DeviceAddress {
    /// Create a public device address
    pub const fn public(bytes: [u8; 6]) -> Self {
        DeviceAddress {
            kind: AddressKind::Public,
            bytes,
        }
    }

    /// Create a random device address
    pub const fn random(bytes: [u8; 6]) -> Self {
        DeviceAddress {
            kind: AddressKind::Random,
            bytes,
        }
    }

    /// The address bytes in little endian order
    pub fn bytes(&self) -> [u8; 6] {
        self.bytes
    }

    pub fn kind(&self) -> AddressKind {
        self.kind
    }
}

impl core::fmt::Debug for DeviceAddress {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        core::fmt::Display::fmt(self, f)
    }
}

/// Displays the address as colon separated hex, most significant byte first
impl core::fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        let b = &self.bytes;

        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            b[5], b[4], b[3], b[2], b[1], b[0]
        )
    }
}

/// Error when parsing a device address from text
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddressParseError;

impl core::fmt::Display for AddressParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "expected six colon separated hexadecimal octets")
    }
}

/// Parse a public address from `XX:XX:XX:XX:XX:XX` text
///
/// The text is taken most significant byte first, matching the `Display` output.
impl core::str::FromStr for DeviceAddress {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 6];

        let mut octets = s.split(':');

        for byte in bytes.iter_mut().rev() {
            let octet = octets.next().ok_or(AddressParseError)?;

            if octet.len() != 2 || !octet.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(AddressParseError);
            }

            *byte = u8::from_str_radix(octet, 16).map_err(|_| AddressParseError)?;
        }

        if octets.next().is_some() {
            return Err(AddressParseError);
        }

        Ok(DeviceAddress::public(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_msb_first() {
        let address = DeviceAddress::public([0x66, 0x55, 0x44, 0x33, 0x22, 0x11]);

        assert_eq!("11:22:33:44:55:66", format!("{}", address));
    }

    #[test]
    fn parse_round_trip() {
        let address: DeviceAddress = "C0:11:22:33:44:2A".parse().unwrap();

        assert_eq!([0x2A, 0x44, 0x33, 0x22, 0x11, 0xC0], address.bytes());
        assert_eq!("C0:11:22:33:44:2A", format!("{}", address));
    }

    #[test]
    fn parse_rejects_bad_text() {
        assert!("C0:11:22:33:44".parse::<DeviceAddress>().is_err());
        assert!("C0:11:22:33:44:2A:00".parse::<DeviceAddress>().is_err());
        assert!("C0:11:22:33:44:ZZ".parse::<DeviceAddress>().is_err());
        assert!("C011:22:33:44:2A".parse::<DeviceAddress>().is_err());
    }

    #[test]
    fn kinds_are_distinct() {
        let bytes = [1, 2, 3, 4, 5, 6];

        assert_ne!(DeviceAddress::public(bytes), DeviceAddress::random(bytes));
    }
}
