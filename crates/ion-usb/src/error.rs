use crate::descriptor::DescriptorKey;

/// Reason a control request was not handled. The transport answers every one of these with a
/// STALL handshake on endpoint 0.
#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
pub enum Unsupported {
    #[error("no descriptor registered for type 0x{descriptor_type:02x} index {index}")]
    UnknownDescriptor { descriptor_type: u8, index: u8 },

    #[error("no vendor extension registered for vendor code {0}")]
    UnknownVendorCode(u8),

    #[error("vendor code {vendor_code} does not handle wIndex=0x{index:04x} wValue=0x{value:04x}")]
    UnknownSubRequest {
        vendor_code: u8,
        index: u16,
        value: u16,
    },

    #[error(transparent)]
    InvalidConfiguration(#[from] ConfigurationError),

    #[error("unsupported request bmRequestType=0x{request_type:02x} bRequest=0x{request:02x}")]
    Request { request_type: u8, request: u8 },
}

#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("configuration value {requested} is not supported (device only has configuration {supported})")]
    InvalidValue { requested: u16, supported: u8 },
}

/// Errors produced while encoding a descriptor into its wire form.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("{what} descriptor would be {len} bytes (limit is {max})")]
    TooLong {
        what: &'static str,
        len: usize,
        max: usize,
    },

    #[error("language ID list must not be empty")]
    NoLanguages,
}

/// Errors produced while validating the descriptor table.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("descriptor {0:?} registered twice")]
    DuplicateKey(DescriptorKey),

    #[error("required {0} descriptor is missing")]
    MissingDescriptor(&'static str),

    #[error("{what} descriptor registered at index {index} (must be {expected})")]
    UnexpectedIndex {
        what: &'static str,
        index: u8,
        expected: u8,
    },

    #[error("descriptor {key:?} declares {declared} bytes but encodes {actual}")]
    LengthMismatch {
        key: DescriptorKey,
        declared: usize,
        actual: usize,
    },

    #[error("descriptor {key:?} carries type byte 0x{found:02x}")]
    TypeMismatch { key: DescriptorKey, found: u8 },

    #[error("string descriptor index {0} is exhausted")]
    IndexOverflow(u8),
}

/// Errors produced while assembling a [`crate::Device`].
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("WebUSB and Microsoft OS extensions share vendor code {0}")]
    VendorCodeCollision(u8),

    #[error("configuration value must be non-zero")]
    ZeroConfigurationValue,

    #[error("bcdUSB 0x{0:04x} hides the BOS descriptor from hosts (need at least 0x0201)")]
    UsbVersionTooLow(u16),
}
