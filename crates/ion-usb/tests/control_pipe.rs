mod util;

use ion_usb::{SetupPacket, UsbHandshake};
use util::*;

fn set_address(address: u16) -> SetupPacket {
    SetupPacket {
        request_type: 0x00,
        request: 0x05, // SET_ADDRESS
        value: address,
        index: 0,
        length: 0,
    }
}

#[test]
fn configuration_descriptor_is_split_into_max_packet_chunks() {
    let mut pipe = pipe();
    pipe.handle_setup(get_descriptor(TYPE_CONFIGURATION, 0, 255));

    let mut sizes = Vec::new();
    let mut buf = [0u8; 8];
    loop {
        match pipe.handle_in(&mut buf) {
            UsbHandshake::Ack { bytes } => {
                sizes.push(bytes);
                if bytes < buf.len() {
                    break;
                }
            }
            other => panic!("unexpected handshake {other:?}"),
        }
    }
    assert_eq!(sizes, vec![8, 8, 8, 3]);
    assert_eq!(pipe.handle_out(&[]), UsbHandshake::Ack { bytes: 0 });
}

#[test]
fn chunked_read_reassembles_the_full_descriptor() {
    let mut pipe = pipe();
    let chunked = control_in(&mut pipe, get_descriptor(TYPE_CONFIGURATION, 0, 255), 8);
    let expected = dispatch_in(&dispatcher(), get_descriptor(TYPE_CONFIGURATION, 0, 255), 255).unwrap();
    assert_eq!(chunked, expected);
}

#[test]
fn data_stage_ends_without_zlp_when_wlength_is_reached() {
    let mut pipe = pipe();
    pipe.handle_setup(get_descriptor(TYPE_DEVICE, 0, 16));

    let mut buf = [0u8; 8];
    assert_eq!(pipe.handle_in(&mut buf), UsbHandshake::Ack { bytes: 8 });
    assert_eq!(pipe.handle_in(&mut buf), UsbHandshake::Ack { bytes: 8 });
    // Data stage is over; the device waits for the host's status packet.
    assert_eq!(pipe.handle_in(&mut buf), UsbHandshake::Nak);
    assert_eq!(pipe.handle_out(&[]), UsbHandshake::Ack { bytes: 0 });
}

#[test]
fn response_ending_on_packet_boundary_is_terminated_by_zlp() {
    let mut pipe = pipe();
    pipe.handle_setup(get_descriptor(TYPE_CONFIGURATION, 0, 255));

    let mut buf = [0u8; 9];
    for _ in 0..3 {
        assert_eq!(pipe.handle_in(&mut buf), UsbHandshake::Ack { bytes: 9 });
    }
    assert_eq!(pipe.handle_in(&mut buf), UsbHandshake::Ack { bytes: 0 });
    assert_eq!(pipe.handle_out(&[]), UsbHandshake::Ack { bytes: 0 });
}

#[test]
fn host_can_end_a_control_read_early() {
    let mut pipe = pipe();
    pipe.handle_setup(get_descriptor(TYPE_CONFIGURATION, 0, 64));

    let mut buf = [0u8; 8];
    assert_eq!(pipe.handle_in(&mut buf), UsbHandshake::Ack { bytes: 8 });
    assert_eq!(pipe.handle_out(&[]), UsbHandshake::Ack { bytes: 0 });
    // The transfer is over; further tokens are NAKed until the next SETUP.
    assert_eq!(pipe.handle_in(&mut buf), UsbHandshake::Nak);

    assert_eq!(control_in(&mut pipe, get_descriptor(TYPE_DEVICE, 0, 64), 64).len(), 18);
}

#[test]
fn data_during_control_read_stalls() {
    let mut pipe = pipe();
    pipe.handle_setup(get_descriptor(TYPE_CONFIGURATION, 0, 64));
    assert_eq!(pipe.handle_out(&[1]), UsbHandshake::Stall);
    let mut buf = [0u8; 8];
    assert_eq!(pipe.handle_in(&mut buf), UsbHandshake::Stall);
}

#[test]
fn unknown_descriptor_stalls_every_stage() {
    let mut pipe = pipe();
    pipe.handle_setup(get_descriptor(TYPE_STRING, 99, 255));

    let mut buf = [0u8; 64];
    assert_eq!(pipe.handle_in(&mut buf), UsbHandshake::Stall);
    assert_eq!(pipe.handle_out(&[]), UsbHandshake::Stall);

    // A new SETUP clears the stall.
    assert_eq!(control_in(&mut pipe, get_descriptor(TYPE_DEVICE, 0, 64), 64).len(), 18);
}

#[test]
fn set_address_takes_effect_after_status_stage() {
    let mut pipe = pipe();
    pipe.handle_setup(set_address(5));
    assert_eq!(pipe.address(), 0);

    assert_eq!(complete_status_in(&mut pipe), UsbHandshake::Ack { bytes: 0 });
    assert_eq!(pipe.address(), 5);
}

#[test]
fn new_setup_aborts_pending_set_address() {
    let mut pipe = pipe();
    pipe.handle_setup(set_address(5));
    pipe.handle_setup(set_configuration(1));

    assert_eq!(complete_status_in(&mut pipe), UsbHandshake::Ack { bytes: 0 });
    assert_eq!(pipe.address(), 0);
    assert_eq!(pipe.dispatcher().configuration().active(), 1);
}

#[test]
fn invalid_set_address_stalls() {
    let mut pipe = pipe();
    pipe.handle_setup(SetupPacket {
        index: 1,
        ..set_address(1)
    });
    assert_eq!(complete_status_in(&mut pipe), UsbHandshake::Stall);

    pipe.handle_setup(set_address(128));
    assert_eq!(complete_status_in(&mut pipe), UsbHandshake::Stall);
    assert_eq!(pipe.address(), 0);
}

#[test]
fn invalid_set_configuration_stalls_status_stage() {
    let mut pipe = pipe();
    pipe.handle_setup(set_configuration(2));
    assert_eq!(complete_status_in(&mut pipe), UsbHandshake::Stall);
    assert_eq!(pipe.dispatcher().configuration().active(), 0);
}

#[test]
fn bus_reset_clears_address_and_configuration() {
    let mut pipe = pipe();
    pipe.handle_setup(set_address(9));
    complete_status_in(&mut pipe);
    pipe.handle_setup(set_configuration(1));
    complete_status_in(&mut pipe);
    assert_eq!(pipe.address(), 9);

    pipe.reset();
    assert_eq!(pipe.address(), 0);
    assert!(!pipe.dispatcher().configuration().is_configured());
}

#[test]
fn enumeration_sequence_reads_everything_a_host_asks_for() {
    let mut pipe = pipe();
    let header = control_in(&mut pipe, get_descriptor(TYPE_DEVICE, 0, 64), 64);
    assert_eq!(header.len(), 18);
    let max_packet = usize::from(header[7]);

    pipe.handle_setup(set_address(3));
    complete_status_in(&mut pipe);

    let config_header = control_in(&mut pipe, get_descriptor(TYPE_CONFIGURATION, 0, 9), max_packet);
    let total = u16::from_le_bytes([config_header[2], config_header[3]]);
    let config = control_in(&mut pipe, get_descriptor(TYPE_CONFIGURATION, 0, total), max_packet);
    assert_eq!(config.len(), usize::from(total));

    let bos_header = control_in(&mut pipe, get_descriptor(TYPE_BOS, 0, 5), max_packet);
    let bos_total = u16::from_le_bytes([bos_header[2], bos_header[3]]);
    let bos = control_in(&mut pipe, get_descriptor(TYPE_BOS, 0, bos_total), max_packet);
    assert_eq!(bos.len(), usize::from(bos_total));

    pipe.handle_setup(set_configuration(u16::from(config[5])));
    assert_eq!(complete_status_in(&mut pipe), UsbHandshake::Ack { bytes: 0 });
    assert_eq!(pipe.address(), 3);
    assert!(pipe.dispatcher().configuration().is_configured());
}
