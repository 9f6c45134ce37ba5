//! Assembly of the complete device from a single identity value.

use serde::{Deserialize, Serialize};

use crate::class::InterfaceRequestHandler;
use crate::configuration::ConfigurationState;
use crate::descriptor::{
    self, BosDescriptor, ConfigurationDescriptor, DeviceDescriptor, DfuFunctionalDescriptor,
    InterfaceDescriptor, UrlDescriptor, WebUsbPlatformCapability, MICROSOFT_OS_STRING_INDEX,
};
use crate::dispatch::ControlRequestDispatcher;
use crate::error::BuildError;
use crate::pipe::ControlPipe;
use crate::registry::DescriptorRegistry;
use crate::vendor::{MicrosoftOsProvider, VendorExtensions, WebUsbProvider};

/// String indices, in the order the text descriptors are registered.
pub const STRING_MANUFACTURER: u8 = 1;
pub const STRING_PRODUCT: u8 = 2;
pub const STRING_SERIAL_NUMBER: u8 = 3;
pub const STRING_INTERFACE: u8 = 4;

/// Lowest `bcdUSB` at which hosts request the BOS descriptor.
pub const MIN_BOS_USB_VERSION: u16 = 0x0201;

/// DFU interface triple: Application Specific / Device Firmware Upgrade / DFU mode.
pub const DFU_INTERFACE_CLASS: u8 = 0xFE;
pub const DFU_INTERFACE_SUBCLASS: u8 = 0x01;
pub const DFU_INTERFACE_PROTOCOL: u8 = 0x02;

/// Everything that identifies the device to a host. Fixed for the lifetime of the device.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeviceIdentity {
    /// `bcdUSB`; at least [`MIN_BOS_USB_VERSION`] since the device always advertises a BOS.
    pub usb_version: u16,
    pub max_packet_size0: u8,
    pub vendor_id: u16,
    pub product_id: u16,
    pub device_release: u16,
    pub manufacturer: String,
    pub product: String,
    pub serial_number: String,
    /// DfuSe memory layout string of the DFU interface.
    pub interface_name: String,
    pub configuration_value: u8,
    pub max_power: u8,
    pub dfu_attributes: u8,
    pub dfu_detach_timeout_ms: u16,
    pub dfu_transfer_size: u16,
    pub landing_page: String,
    pub landing_page_index: u8,
    pub webusb_vendor_code: u8,
    pub microsoft_os_vendor_code: u8,
}

impl Default for DeviceIdentity {
    fn default() -> Self {
        Self {
            usb_version: 0x0210,
            max_packet_size0: 64,
            vendor_id: 0x0483,
            product_id: 0xA291,
            device_release: 0x0001,
            manufacturer: "NumWorks".to_owned(),
            product: "Calculator".to_owned(),
            serial_number: "12345".to_owned(),
            interface_name: "@Flash/0x08000000/04*016Kg,01*064Kg,07*128Kg".to_owned(),
            configuration_value: 1,
            max_power: 0x32,
            // Will detach, manifestation tolerant, can upload, can download.
            dfu_attributes: 0b1111,
            dfu_detach_timeout_ms: 0,
            dfu_transfer_size: 2048,
            landing_page: "https://workshop.numworks.com".to_owned(),
            landing_page_index: 1,
            webusb_vendor_code: 1,
            microsoft_os_vendor_code: 2,
        }
    }
}

impl DeviceIdentity {
    pub fn device_descriptor(&self) -> DeviceDescriptor {
        DeviceDescriptor {
            usb_version: self.usb_version,
            // Class is defined per interface.
            device_class: 0,
            device_subclass: 0,
            device_protocol: 0,
            max_packet_size0: self.max_packet_size0,
            vendor_id: self.vendor_id,
            product_id: self.product_id,
            device_release: self.device_release,
            manufacturer_string: STRING_MANUFACTURER,
            product_string: STRING_PRODUCT,
            serial_number_string: STRING_SERIAL_NUMBER,
            num_configurations: 1,
        }
    }

    pub fn dfu_interface(&self) -> InterfaceDescriptor {
        InterfaceDescriptor {
            interface_number: 0,
            alternate_setting: 0,
            num_endpoints: 0,
            interface_class: DFU_INTERFACE_CLASS,
            interface_subclass: DFU_INTERFACE_SUBCLASS,
            interface_protocol: DFU_INTERFACE_PROTOCOL,
            interface_string: STRING_INTERFACE,
            functional: Some(DfuFunctionalDescriptor {
                attributes: self.dfu_attributes,
                detach_timeout_ms: self.dfu_detach_timeout_ms,
                transfer_size: self.dfu_transfer_size,
                dfu_version: 0x0100,
            }),
        }
    }

    pub fn configuration_descriptor(&self) -> ConfigurationDescriptor {
        ConfigurationDescriptor {
            configuration_value: self.configuration_value,
            configuration_string: 0,
            attributes: 0x80, // bus powered, no remote wakeup
            max_power: self.max_power,
            interfaces: vec![self.dfu_interface()],
        }
    }

    pub fn bos_descriptor(&self) -> BosDescriptor {
        BosDescriptor {
            capabilities: vec![WebUsbPlatformCapability {
                vendor_code: self.webusb_vendor_code,
                landing_page_index: self.landing_page_index,
            }],
        }
    }

    /// Checks the values the descriptor encoders cannot.
    pub fn validate(&self) -> Result<(), BuildError> {
        if self.configuration_value == 0 {
            return Err(BuildError::ZeroConfigurationValue);
        }
        if self.usb_version < MIN_BOS_USB_VERSION {
            return Err(BuildError::UsbVersionTooLow(self.usb_version));
        }
        Ok(())
    }

    /// Builds the descriptor table in registration order: device, configuration, LANGIDs,
    /// manufacturer, product, serial number, interface name, BOS, and the Microsoft OS string at
    /// index 0xEE.
    pub fn registry(&self) -> Result<DescriptorRegistry, BuildError> {
        let mut builder = DescriptorRegistry::builder();
        builder.push(self.device_descriptor().build())?;
        builder.push(self.configuration_descriptor().build()?)?;
        builder.push(descriptor::english_language_ids())?;
        for s in [
            &self.manufacturer,
            &self.product,
            &self.serial_number,
            &self.interface_name,
        ] {
            builder.push(descriptor::text(s)?)?;
        }
        builder.push(self.bos_descriptor().build()?)?;
        builder.insert(
            MICROSOFT_OS_STRING_INDEX,
            descriptor::microsoft_os_string(self.microsoft_os_vendor_code),
        )?;
        Ok(builder.build()?)
    }

    pub fn vendor_extensions(&self) -> Result<VendorExtensions, BuildError> {
        let webusb = WebUsbProvider::new(
            self.webusb_vendor_code,
            self.landing_page_index,
            &UrlDescriptor::parse(&self.landing_page),
        )?;
        let microsoft_os = MicrosoftOsProvider::winusb(self.microsoft_os_vendor_code, 0);
        VendorExtensions::new(webusb, microsoft_os)
    }
}

/// A fully assembled device: descriptor table, vendor extensions and configuration state behind
/// an endpoint-0 control pipe.
pub struct Device {
    pipe: ControlPipe,
}

impl Device {
    pub fn new(identity: &DeviceIdentity) -> Result<Self, BuildError> {
        Ok(Self {
            pipe: ControlPipe::new(Self::dispatcher(identity)?),
        })
    }

    /// Like [`Device::new`], forwarding DFU class requests to `handler`.
    pub fn with_interface_handler(
        identity: &DeviceIdentity,
        handler: Box<dyn InterfaceRequestHandler>,
    ) -> Result<Self, BuildError> {
        let dispatcher = Self::dispatcher(identity)?.with_interface_handler(handler);
        Ok(Self {
            pipe: ControlPipe::new(dispatcher),
        })
    }

    /// Builds the request-level dispatcher without a control pipe.
    pub fn dispatcher(identity: &DeviceIdentity) -> Result<ControlRequestDispatcher, BuildError> {
        identity.validate()?;
        let registry = identity.registry()?;
        let vendor = identity.vendor_extensions()?;
        tracing::debug!(
            descriptors = registry.len(),
            webusb_vendor_code = identity.webusb_vendor_code,
            microsoft_os_vendor_code = identity.microsoft_os_vendor_code,
            "device descriptor table built"
        );
        Ok(ControlRequestDispatcher::new(
            registry,
            vendor,
            ConfigurationState::new(identity.configuration_value),
        ))
    }

    pub fn pipe(&self) -> &ControlPipe {
        &self.pipe
    }

    pub fn pipe_mut(&mut self) -> &mut ControlPipe {
        &mut self.pipe
    }

    pub fn into_pipe(self) -> ControlPipe {
        self.pipe
    }
}
