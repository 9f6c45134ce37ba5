#![allow(dead_code)]

use ion_usb::{ControlPipe, ControlRequestDispatcher, Device, DeviceIdentity, SetupPacket, UsbHandshake};

pub const GET_DESCRIPTOR: u8 = 0x06;
pub const GET_CONFIGURATION: u8 = 0x08;
pub const SET_CONFIGURATION: u8 = 0x09;

pub const TYPE_DEVICE: u8 = 0x01;
pub const TYPE_CONFIGURATION: u8 = 0x02;
pub const TYPE_STRING: u8 = 0x03;
pub const TYPE_BOS: u8 = 0x0F;

pub fn dispatcher() -> ControlRequestDispatcher {
    Device::dispatcher(&DeviceIdentity::default()).expect("default identity should build")
}

pub fn pipe() -> ControlPipe {
    Device::new(&DeviceIdentity::default())
        .expect("default identity should build")
        .into_pipe()
}

pub fn get_descriptor(descriptor_type: u8, index: u8, length: u16) -> SetupPacket {
    SetupPacket {
        request_type: 0x80,
        request: GET_DESCRIPTOR,
        value: (u16::from(descriptor_type) << 8) | u16::from(index),
        index: 0,
        length,
    }
}

pub fn vendor_in(vendor_code: u8, value: u16, index: u16, length: u16) -> SetupPacket {
    SetupPacket {
        request_type: 0xC0,
        request: vendor_code,
        value,
        index,
        length,
    }
}

pub fn set_configuration(value: u16) -> SetupPacket {
    SetupPacket {
        request_type: 0x00,
        request: SET_CONFIGURATION,
        value,
        index: 0,
        length: 0,
    }
}

pub fn get_configuration() -> SetupPacket {
    SetupPacket {
        request_type: 0x80,
        request: GET_CONFIGURATION,
        value: 0,
        index: 0,
        length: 1,
    }
}

/// Dispatches `setup` into a buffer of `capacity` bytes and returns what was written.
pub fn dispatch_in(
    dispatcher: &ControlRequestDispatcher,
    setup: SetupPacket,
    capacity: usize,
) -> Result<Vec<u8>, ion_usb::Unsupported> {
    let mut out = vec![0u8; capacity];
    let len = dispatcher.dispatch(&setup, &mut out)?;
    out.truncate(len);
    Ok(out)
}

pub fn complete_status_in(pipe: &mut ControlPipe) -> UsbHandshake {
    let mut buf = [0u8; 0];
    pipe.handle_in(&mut buf)
}

/// Runs a device-to-host control transfer with `max_packet`-sized IN packets.
pub fn control_in(pipe: &mut ControlPipe, setup: SetupPacket, max_packet: usize) -> Vec<u8> {
    pipe.handle_setup(setup);

    let mut out = Vec::new();
    let mut buf = vec![0u8; max_packet];
    loop {
        match pipe.handle_in(&mut buf) {
            UsbHandshake::Ack { bytes } => {
                out.extend_from_slice(&buf[..bytes]);
                if bytes < buf.len() {
                    break;
                }
            }
            UsbHandshake::Nak => break,
            UsbHandshake::Stall => panic!("expected control IN data"),
        }
    }

    // Status stage (OUT ZLP).
    assert_eq!(pipe.handle_out(&[]), UsbHandshake::Ack { bytes: 0 });
    out
}

pub fn utf16le(s: &str) -> Vec<u8> {
    s.encode_utf16().flat_map(u16::to_le_bytes).collect()
}
