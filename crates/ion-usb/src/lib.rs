//! Endpoint-0 support for a DFU-mode USB device.
//!
//! The crate is split the same way the control transfer is:
//! - [`setup`] decodes the 8-byte SETUP packet.
//! - [`descriptor`] encodes descriptors and [`registry`] holds the validated, immutable table the
//!   host enumerates through GET_DESCRIPTOR.
//! - [`vendor`] serves WebUSB and Microsoft OS 1.0 vendor requests.
//! - [`configuration`] tracks SET_CONFIGURATION / GET_CONFIGURATION.
//! - [`dispatch`] routes one request to whichever of the above owns it; [`pipe`] drives the
//!   SETUP / data / status stages on top of it.
//!
//! [`Device`] wires everything together from a [`DeviceIdentity`].

pub mod class;
pub mod configuration;
pub mod descriptor;
pub mod dispatch;
pub mod error;
pub mod pipe;
pub mod registry;
pub mod setup;
pub mod vendor;

mod device;

pub use class::InterfaceRequestHandler;
pub use configuration::ConfigurationState;
pub use descriptor::{Descriptor, DescriptorKey, DescriptorKind, DescriptorType};
pub use device::{
    Device, DeviceIdentity, DFU_INTERFACE_CLASS, DFU_INTERFACE_PROTOCOL, DFU_INTERFACE_SUBCLASS,
    MIN_BOS_USB_VERSION, STRING_INTERFACE, STRING_MANUFACTURER, STRING_PRODUCT,
    STRING_SERIAL_NUMBER,
};
pub use dispatch::ControlRequestDispatcher;
pub use error::{BuildError, ConfigurationError, DescriptorError, RegistryError, Unsupported};
pub use pipe::{ControlPipe, UsbHandshake, EP0_TRANSFER_BUFFER_LEN};
pub use registry::{DescriptorRegistry, RegistryBuilder};
pub use setup::SetupPacket;
pub use vendor::{MicrosoftOsProvider, VendorExtensions, WebUsbProvider};
