mod util;

use ion_usb::vendor::msos::{EXTENDED_COMPAT_ID_LEN, MS_OS_EXTENDED_COMPAT_ID, MS_OS_EXTENDED_PROPERTIES};
use ion_usb::{Device, DeviceIdentity};
use util::*;

const MS_OS_VENDOR_CODE: u8 = 2;

#[test]
fn string_0xee_carries_the_msft100_signature() {
    let dispatcher = dispatcher();
    let bytes = dispatch_in(&dispatcher, get_descriptor(TYPE_STRING, 0xEE, 0x12), 64).unwrap();
    let mut expected = vec![0x12, 0x03];
    expected.extend(utf16le("MSFT100"));
    expected.extend([MS_OS_VENDOR_CODE, 0]);
    assert_eq!(bytes, expected);
}

#[test]
fn msft100_string_does_not_shift_text_indices() {
    let dispatcher = dispatcher();
    let interface = dispatch_in(&dispatcher, get_descriptor(TYPE_STRING, 4, 255), 255).unwrap();
    assert_eq!(&interface[2..4], &utf16le("@")[..]);
    assert!(dispatch_in(&dispatcher, get_descriptor(TYPE_STRING, 5, 255), 255).is_err());
}

#[test]
fn extended_compat_id_binds_winusb_to_interface_zero() {
    let dispatcher = dispatcher();
    let bytes = dispatch_in(
        &dispatcher,
        vendor_in(MS_OS_VENDOR_CODE, 0, MS_OS_EXTENDED_COMPAT_ID, 0xFF),
        255,
    )
    .unwrap();

    assert_eq!(bytes.len(), EXTENDED_COMPAT_ID_LEN);
    assert_eq!(&bytes[0..4], &40u32.to_le_bytes());
    assert_eq!(&bytes[4..6], &0x0100u16.to_le_bytes());
    assert_eq!(&bytes[6..8], &4u16.to_le_bytes());
    assert_eq!(bytes[8], 1);
    assert_eq!(&bytes[9..16], &[0; 7]);
    assert_eq!(bytes[16], 0); // bFirstInterfaceNumber
    assert_eq!(bytes[17], 1);
    assert_eq!(&bytes[18..26], b"WINUSB\0\0");
    assert_eq!(&bytes[26..34], &[0; 8]);
    assert_eq!(&bytes[34..40], &[0; 6]);
}

#[test]
fn windows_header_probe_reads_sixteen_bytes() {
    let dispatcher = dispatcher();
    let bytes = dispatch_in(
        &dispatcher,
        vendor_in(MS_OS_VENDOR_CODE, 0, MS_OS_EXTENDED_COMPAT_ID, 0x10),
        255,
    )
    .unwrap();
    assert_eq!(bytes.len(), 16);
    assert_eq!(&bytes[0..4], &40u32.to_le_bytes());
}

#[test]
fn extended_properties_and_other_pages_are_unsupported() {
    let dispatcher = dispatcher();
    for (value, index) in [
        (0, MS_OS_EXTENDED_PROPERTIES),
        (1, MS_OS_EXTENDED_COMPAT_ID),
        (0, 0x0007),
    ] {
        assert!(dispatch_in(&dispatcher, vendor_in(MS_OS_VENDOR_CODE, value, index, 255), 255).is_err());
    }
}

#[test]
fn vendor_code_comes_from_the_identity() {
    let identity = DeviceIdentity {
        microsoft_os_vendor_code: 0x20,
        ..Default::default()
    };
    let dispatcher = Device::dispatcher(&identity).unwrap();
    let string = dispatch_in(&dispatcher, get_descriptor(TYPE_STRING, 0xEE, 255), 255).unwrap();
    assert_eq!(string[16], 0x20);
    assert!(dispatch_in(&dispatcher, vendor_in(0x20, 0, MS_OS_EXTENDED_COMPAT_ID, 255), 255).is_ok());
    assert!(dispatch_in(&dispatcher, vendor_in(MS_OS_VENDOR_CODE, 0, MS_OS_EXTENDED_COMPAT_ID, 255), 255).is_err());
}
