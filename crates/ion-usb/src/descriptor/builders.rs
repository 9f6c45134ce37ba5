//! Byte-exact encoders for the descriptors a DFU-mode device advertises.
//!
//! References:
//! - USB 2.0 §9.6 (device, configuration, interface, string descriptors)
//! - USB 3.2 §9.6.2 (BOS and device capability descriptors)
//! - USB DFU 1.1 §4.2.4 (DFU functional descriptor)
//! - WebUSB CG report §4 (platform capability and URL descriptors)
//! - Microsoft OS 1.0 descriptors ("MSFT100" string descriptor)

use super::{Descriptor, DescriptorKind, DescriptorType};
use crate::error::DescriptorError;

pub const DEVICE_DESCRIPTOR_LEN: usize = 18;
pub const CONFIGURATION_DESCRIPTOR_LEN: usize = 9;
pub const INTERFACE_DESCRIPTOR_LEN: usize = 9;
pub const DFU_FUNCTIONAL_DESCRIPTOR_LEN: usize = 9;
pub const BOS_DESCRIPTOR_LEN: usize = 5;
pub const WEBUSB_PLATFORM_CAPABILITY_LEN: usize = 24;
pub const MICROSOFT_OS_STRING_DESCRIPTOR_LEN: usize = 18;

/// String index the Microsoft OS 1.0 signature descriptor is served from.
pub const MICROSOFT_OS_STRING_INDEX: u8 = 0xEE;

/// `bDescriptorType` of a WebUSB URL descriptor (returned by the GET_URL vendor request, never by
/// GET_DESCRIPTOR).
pub const WEBUSB_URL_DESCRIPTOR_TYPE: u8 = 0x03;

const PLATFORM_CAPABILITY_TYPE: u8 = 0x05;
const LANGID_EN_US: u16 = 0x0409;
const MAX_DESCRIPTOR_LEN: usize = u8::MAX as usize;

/// Little-endian encoding of {3408b638-09a9-47a0-8bfd-a0768815b665}.
pub const WEBUSB_PLATFORM_UUID: [u8; 16] = [
    0x38, 0xB6, 0x08, 0x34, 0xA9, 0x09, 0xA0, 0x47, 0x8B, 0xFD, 0xA0, 0x76, 0x88, 0x15, 0xB6, 0x65,
];

/// Standard device descriptor (USB 2.0 Table 9-8).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// `bcdUSB`. Hosts only read the BOS of devices reporting 0x0201 or later.
    pub usb_version: u16,
    pub device_class: u8,
    pub device_subclass: u8,
    pub device_protocol: u8,
    pub max_packet_size0: u8,
    pub vendor_id: u16,
    pub product_id: u16,
    pub device_release: u16,
    pub manufacturer_string: u8,
    pub product_string: u8,
    pub serial_number_string: u8,
    pub num_configurations: u8,
}

impl DeviceDescriptor {
    pub fn encode(&self) -> [u8; DEVICE_DESCRIPTOR_LEN] {
        let [usb0, usb1] = self.usb_version.to_le_bytes();
        let [vid0, vid1] = self.vendor_id.to_le_bytes();
        let [pid0, pid1] = self.product_id.to_le_bytes();
        let [rel0, rel1] = self.device_release.to_le_bytes();
        [
            DEVICE_DESCRIPTOR_LEN as u8,
            DescriptorType::Device.as_u8(),
            usb0,
            usb1,
            self.device_class,
            self.device_subclass,
            self.device_protocol,
            self.max_packet_size0,
            vid0,
            vid1,
            pid0,
            pid1,
            rel0,
            rel1,
            self.manufacturer_string,
            self.product_string,
            self.serial_number_string,
            self.num_configurations,
        ]
    }

    pub fn build(&self) -> Descriptor {
        Descriptor::from_bytes(DescriptorKind::Device, self.encode().to_vec())
    }
}

/// DFU functional descriptor (DFU 1.1 Table 4.2), transmitted right after the DFU interface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DfuFunctionalDescriptor {
    /// bit 3: will detach, bit 2: manifestation tolerant, bit 1: can upload, bit 0: can download.
    pub attributes: u8,
    pub detach_timeout_ms: u16,
    pub transfer_size: u16,
    pub dfu_version: u16,
}

impl DfuFunctionalDescriptor {
    pub fn encode(&self) -> [u8; DFU_FUNCTIONAL_DESCRIPTOR_LEN] {
        let [t0, t1] = self.detach_timeout_ms.to_le_bytes();
        let [s0, s1] = self.transfer_size.to_le_bytes();
        let [v0, v1] = self.dfu_version.to_le_bytes();
        [
            DFU_FUNCTIONAL_DESCRIPTOR_LEN as u8,
            DescriptorType::DfuFunctional.as_u8(),
            self.attributes,
            t0,
            t1,
            s0,
            s1,
            v0,
            v1,
        ]
    }
}

/// Interface descriptor (USB 2.0 Table 9-12) plus the class-functional descriptor sent with it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InterfaceDescriptor {
    pub interface_number: u8,
    pub alternate_setting: u8,
    pub num_endpoints: u8,
    pub interface_class: u8,
    pub interface_subclass: u8,
    pub interface_protocol: u8,
    pub interface_string: u8,
    pub functional: Option<DfuFunctionalDescriptor>,
}

impl InterfaceDescriptor {
    /// Bytes this interface contributes to its configuration's `wTotalLength`.
    pub fn encoded_len(&self) -> usize {
        INTERFACE_DESCRIPTOR_LEN
            + self
                .functional
                .map_or(0, |_| DFU_FUNCTIONAL_DESCRIPTOR_LEN)
    }

    pub fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&[
            INTERFACE_DESCRIPTOR_LEN as u8,
            DescriptorType::Interface.as_u8(),
            self.interface_number,
            self.alternate_setting,
            self.num_endpoints,
            self.interface_class,
            self.interface_subclass,
            self.interface_protocol,
            self.interface_string,
        ]);
        if let Some(functional) = &self.functional {
            out.extend_from_slice(&functional.encode());
        }
    }
}

/// Configuration descriptor (USB 2.0 Table 9-10). `wTotalLength` and `bNumInterfaces` are
/// derived from `interfaces`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigurationDescriptor {
    pub configuration_value: u8,
    pub configuration_string: u8,
    /// bit 7 reserved (set), bit 6 self powered, bit 5 remote wakeup.
    pub attributes: u8,
    /// In 2 mA units.
    pub max_power: u8,
    pub interfaces: Vec<InterfaceDescriptor>,
}

impl ConfigurationDescriptor {
    pub fn total_len(&self) -> usize {
        CONFIGURATION_DESCRIPTOR_LEN
            + self
                .interfaces
                .iter()
                .map(InterfaceDescriptor::encoded_len)
                .sum::<usize>()
    }

    pub fn build(&self) -> Result<Descriptor, DescriptorError> {
        let total = self.total_len();
        let total_field = u16::try_from(total).map_err(|_| DescriptorError::TooLong {
            what: "configuration",
            len: total,
            max: u16::MAX as usize,
        })?;
        let num_interfaces = self
            .interfaces
            .iter()
            .filter(|iface| iface.alternate_setting == 0)
            .count() as u8;

        let [tl0, tl1] = total_field.to_le_bytes();
        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(&[
            CONFIGURATION_DESCRIPTOR_LEN as u8,
            DescriptorType::Configuration.as_u8(),
            tl0,
            tl1,
            num_interfaces,
            self.configuration_value,
            self.configuration_string,
            self.attributes,
            self.max_power,
        ]);
        for iface in &self.interfaces {
            iface.encode_into(&mut out);
        }
        Ok(Descriptor::from_bytes(DescriptorKind::Configuration, out))
    }
}

/// WebUSB platform capability descriptor (WebUSB §4.3.1).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WebUsbPlatformCapability {
    pub vendor_code: u8,
    pub landing_page_index: u8,
}

impl WebUsbPlatformCapability {
    pub fn encode(&self) -> [u8; WEBUSB_PLATFORM_CAPABILITY_LEN] {
        let mut out = [0u8; WEBUSB_PLATFORM_CAPABILITY_LEN];
        out[0] = WEBUSB_PLATFORM_CAPABILITY_LEN as u8;
        out[1] = DescriptorType::DeviceCapability.as_u8();
        out[2] = PLATFORM_CAPABILITY_TYPE;
        out[3] = 0; // bReserved
        out[4..20].copy_from_slice(&WEBUSB_PLATFORM_UUID);
        out[20..22].copy_from_slice(&0x0100u16.to_le_bytes()); // bcdVersion 1.0
        out[22] = self.vendor_code;
        out[23] = self.landing_page_index;
        out
    }
}

/// Binary Object Store descriptor with its platform capabilities concatenated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BosDescriptor {
    pub capabilities: Vec<WebUsbPlatformCapability>,
}

impl BosDescriptor {
    pub fn total_len(&self) -> usize {
        BOS_DESCRIPTOR_LEN + self.capabilities.len() * WEBUSB_PLATFORM_CAPABILITY_LEN
    }

    pub fn build(&self) -> Result<Descriptor, DescriptorError> {
        let total = self.total_len();
        let too_long = || DescriptorError::TooLong {
            what: "BOS",
            len: total,
            max: u16::MAX as usize,
        };
        let total_field = u16::try_from(total).map_err(|_| too_long())?;
        let num_caps = u8::try_from(self.capabilities.len()).map_err(|_| too_long())?;

        let [tl0, tl1] = total_field.to_le_bytes();
        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(&[
            BOS_DESCRIPTOR_LEN as u8,
            DescriptorType::Bos.as_u8(),
            tl0,
            tl1,
            num_caps,
        ]);
        for cap in &self.capabilities {
            out.extend_from_slice(&cap.encode());
        }
        Ok(Descriptor::from_bytes(DescriptorKind::Bos, out))
    }
}

/// String descriptor 0: the LANGIDs the device's strings are available in.
pub fn language_ids(langids: &[u16]) -> Result<Descriptor, DescriptorError> {
    if langids.is_empty() {
        return Err(DescriptorError::NoLanguages);
    }
    let len = 2 + langids.len() * 2;
    if len > MAX_DESCRIPTOR_LEN {
        return Err(DescriptorError::TooLong {
            what: "language ID",
            len,
            max: MAX_DESCRIPTOR_LEN,
        });
    }
    let mut out = Vec::with_capacity(len);
    out.push(len as u8);
    out.push(DescriptorType::String.as_u8());
    for langid in langids {
        out.extend_from_slice(&langid.to_le_bytes());
    }
    Ok(Descriptor::from_bytes(DescriptorKind::LanguageIds, out))
}

/// Language list for devices that only ship en-US strings.
pub fn english_language_ids() -> Descriptor {
    let [l0, l1] = LANGID_EN_US.to_le_bytes();
    Descriptor::from_bytes(
        DescriptorKind::LanguageIds,
        vec![4, DescriptorType::String.as_u8(), l0, l1],
    )
}

/// UTF-16LE string descriptor.
pub fn text(s: &str) -> Result<Descriptor, DescriptorError> {
    let mut out = Vec::with_capacity(2 + s.len() * 2);
    out.push(0); // bLength placeholder
    out.push(DescriptorType::String.as_u8());
    for unit in s.encode_utf16() {
        out.extend_from_slice(&unit.to_le_bytes());
    }
    if out.len() > MAX_DESCRIPTOR_LEN {
        return Err(DescriptorError::TooLong {
            what: "string",
            len: out.len(),
            max: MAX_DESCRIPTOR_LEN,
        });
    }
    out[0] = out.len() as u8;
    Ok(Descriptor::from_bytes(DescriptorKind::Text, out))
}

/// Microsoft OS 1.0 string descriptor: `"MSFT100"`, the vendor code for the feature descriptor
/// requests, and a pad byte.
pub fn microsoft_os_string(vendor_code: u8) -> Descriptor {
    let mut out = Vec::with_capacity(MICROSOFT_OS_STRING_DESCRIPTOR_LEN);
    out.push(MICROSOFT_OS_STRING_DESCRIPTOR_LEN as u8);
    out.push(DescriptorType::String.as_u8());
    for unit in "MSFT100".encode_utf16() {
        out.extend_from_slice(&unit.to_le_bytes());
    }
    out.push(vendor_code);
    out.push(0); // bPad
    Descriptor::from_bytes(DescriptorKind::MicrosoftOsString, out)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum UrlScheme {
    Http = 0,
    Https = 1,
    /// The scheme is part of the URL bytes.
    Other = 255,
}

/// WebUSB URL descriptor (WebUSB §4.3.3).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UrlDescriptor {
    pub scheme: UrlScheme,
    /// URL without its scheme prefix when `scheme` is `Http` or `Https`.
    pub url: String,
}

impl UrlDescriptor {
    /// Splits a known scheme prefix off `url`. Anything else is kept verbatim with
    /// [`UrlScheme::Other`].
    pub fn parse(url: &str) -> Self {
        if let Some(rest) = url.strip_prefix("https://") {
            Self {
                scheme: UrlScheme::Https,
                url: rest.to_owned(),
            }
        } else if let Some(rest) = url.strip_prefix("http://") {
            Self {
                scheme: UrlScheme::Http,
                url: rest.to_owned(),
            }
        } else {
            Self {
                scheme: UrlScheme::Other,
                url: url.to_owned(),
            }
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, DescriptorError> {
        let len = 3 + self.url.len();
        if len > MAX_DESCRIPTOR_LEN {
            return Err(DescriptorError::TooLong {
                what: "URL",
                len,
                max: MAX_DESCRIPTOR_LEN,
            });
        }
        let mut out = Vec::with_capacity(len);
        out.push(len as u8);
        out.push(WEBUSB_URL_DESCRIPTOR_TYPE);
        out.push(self.scheme as u8);
        out.extend_from_slice(self.url.as_bytes());
        Ok(out)
    }
}
