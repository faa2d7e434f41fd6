//! Attribute permissions and characteristic properties

/// Security requirement for reading or writing an attribute
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum SecurityMode {
    /// The attribute cannot be accessed at all
    NoAccess,
    /// No security required
    #[default]
    Open,
    /// An encrypted link, no man in the middle protection
    EncryptNoMitm,
    /// An encrypted link with man in the middle protection
    EncryptWithMitm,
    /// An LE Secure Connections encrypted link with man in the middle protection
    LescEncryptWithMitm,
    /// Signed writes, no man in the middle protection
    SignedNoMitm,
    /// Signed writes with man in the middle protection
    SignedWithMitm,
}

/// One characteristic property
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Property {
    Broadcast,
    Read,
    WriteWithoutResponse,
    Write,
    Notify,
    Indicate,
}

impl Property {
    const ALL: [Property; 6] = [
        Property::Broadcast,
        Property::Read,
        Property::WriteWithoutResponse,
        Property::Write,
        Property::Notify,
        Property::Indicate,
    ];

    /// The bit of this property within the characteristic properties octet
    pub fn bit(self) -> u8 {
        match self {
            Property::Broadcast => 1 << 0,
            Property::Read => 1 << 1,
            Property::WriteWithoutResponse => 1 << 2,
            Property::Write => 1 << 3,
            Property::Notify => 1 << 4,
            Property::Indicate => 1 << 5,
        }
    }
}

/// The property set of a characteristic
///
/// Stored as the raw properties octet of the characteristic declaration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Properties {
    bits: u8,
}

impl Properties {
    pub fn new() -> Self {
        Properties::default()
    }

    pub fn contains(&self, property: Property) -> bool {
        self.bits & property.bit() != 0
    }

    pub fn set(&mut self, property: Property) -> &mut Self {
        self.bits |= property.bit();
        self
    }

    pub fn clear(&mut self, property: Property) -> &mut Self {
        self.bits &= !property.bit();
        self
    }

    pub fn bits(&self) -> u8 {
        self.bits
    }

    /// Build from the raw properties octet, ignoring bits without a meaning here
    pub fn from_bits(bits: u8) -> Self {
        let known: u8 = Property::ALL.iter().map(|property| property.bit()).sum();

        Properties { bits: bits & known }
    }

    pub fn iter(&self) -> impl Iterator<Item = Property> + '_ {
        Property::ALL.into_iter().filter(|property| self.contains(*property))
    }
}

impl FromIterator<Property> for Properties {
    fn from_iter<I: IntoIterator<Item = Property>>(iter: I) -> Self {
        let mut properties = Properties::new();

        for property in iter {
            properties.set(property);
        }

        properties
    }
}
