//! Descriptor values held by the registry.
//!
//! A [`Descriptor`] is an immutable byte block in USB wire format, tagged with the
//! [`DescriptorKind`] it was built as. The kind set is closed: it lists exactly the descriptors a
//! device of this crate advertises through GET_DESCRIPTOR. Sub-descriptors that only travel
//! inside another descriptor (interface, DFU functional, platform capability) are encoded by
//! their parent and never registered on their own.

mod builders;

pub use builders::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DescriptorType {
    Device = 0x01,
    Configuration = 0x02,
    String = 0x03,
    Interface = 0x04,
    Bos = 0x0F,
    DeviceCapability = 0x10,
    DfuFunctional = 0x21,
}

impl DescriptorType {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DescriptorKind {
    Device,
    /// Configuration header followed by every interface and functional descriptor it owns.
    Configuration,
    /// String index 0: the list of supported LANGIDs.
    LanguageIds,
    /// UTF-16LE text string at index 1..N.
    Text,
    /// The `MSFT100` signature string served at string index 0xEE.
    MicrosoftOsString,
    /// BOS header followed by its device capability descriptors.
    Bos,
}

impl DescriptorKind {
    pub fn descriptor_type(self) -> DescriptorType {
        match self {
            Self::Device => DescriptorType::Device,
            Self::Configuration => DescriptorType::Configuration,
            Self::LanguageIds | Self::Text | Self::MicrosoftOsString => DescriptorType::String,
            Self::Bos => DescriptorType::Bos,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Device => "device",
            Self::Configuration => "configuration",
            Self::LanguageIds => "language ID",
            Self::Text => "string",
            Self::MicrosoftOsString => "Microsoft OS string",
            Self::Bos => "BOS",
        }
    }

    /// Whether the descriptor carries a `wTotalLength` field at bytes 2..4.
    pub fn has_total_length(self) -> bool {
        matches!(self, Self::Configuration | Self::Bos)
    }
}

/// Identity of a registered descriptor as requested by GET_DESCRIPTOR's `wValue`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DescriptorKey {
    pub descriptor_type: u8,
    pub index: u8,
}

impl DescriptorKey {
    pub fn new(descriptor_type: DescriptorType, index: u8) -> Self {
        Self {
            descriptor_type: descriptor_type.as_u8(),
            index,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Descriptor {
    kind: DescriptorKind,
    bytes: Box<[u8]>,
}

impl Descriptor {
    /// Wraps an already-encoded descriptor. The registry checks the header against `kind` when
    /// the table is built.
    pub fn from_bytes(kind: DescriptorKind, bytes: impl Into<Box<[u8]>>) -> Self {
        Self {
            kind,
            bytes: bytes.into(),
        }
    }

    pub fn kind(&self) -> DescriptorKind {
        self.kind
    }

    pub fn descriptor_type(&self) -> DescriptorType {
        self.kind.descriptor_type()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// `bLength`: the size of this descriptor's own header.
    pub fn header_len(&self) -> Option<u8> {
        self.bytes.first().copied()
    }

    /// `wTotalLength` for descriptors that aggregate sub-descriptors.
    pub fn total_len(&self) -> Option<u16> {
        if !self.kind.has_total_length() {
            return None;
        }
        let field = self.bytes.get(2..4)?;
        Some(u16::from_le_bytes([field[0], field[1]]))
    }
}
