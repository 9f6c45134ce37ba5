#![forbid(unsafe_code)]

//! Replays a host's enumeration sequence against a device built from an identity file and prints
//! every response, one transfer per line.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use ion_usb::setup::{REQ_GET_DESCRIPTOR, REQ_SET_ADDRESS, REQ_SET_CONFIGURATION};
use ion_usb::vendor::msos::MS_OS_EXTENDED_COMPAT_ID;
use ion_usb::vendor::webusb::WEBUSB_GET_URL;
use ion_usb::{ControlPipe, Device, DeviceIdentity, SetupPacket, UsbHandshake};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(
    name = "ion-usb-descriptors",
    about = "Print the endpoint-0 responses of a DFU device, as a host would enumerate it."
)]
struct Args {
    /// JSON identity file (missing fields take the built-in defaults)
    #[arg(long, value_name = "PATH")]
    identity: Option<PathBuf>,

    /// Print the effective identity as JSON and exit
    #[arg(long, action = clap::ArgAction::SetTrue)]
    print_identity: bool,

    /// Emit one JSON object per transfer instead of plain text
    #[arg(long, action = clap::ArgAction::SetTrue)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct Transfer {
    name: &'static str,
    setup: String,
    stalled: bool,
    data: String,
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn get_descriptor(descriptor_type: u8, index: u8, length: u16) -> SetupPacket {
    SetupPacket {
        request_type: 0x80,
        request: REQ_GET_DESCRIPTOR,
        value: u16::from_be_bytes([descriptor_type, index]),
        index: 0,
        length,
    }
}

fn vendor_in(vendor_code: u8, value: u16, index: u16, length: u16) -> SetupPacket {
    SetupPacket {
        request_type: 0xC0,
        request: vendor_code,
        value,
        index,
        length,
    }
}

/// Runs one control transfer to completion. Returns `None` if the device stalled.
fn transfer(pipe: &mut ControlPipe, setup: SetupPacket, max_packet: usize) -> Option<Vec<u8>> {
    pipe.handle_setup(setup);
    let mut data = Vec::new();
    if setup.length != 0 && setup.request_type & 0x80 != 0 {
        let mut packet = vec![0u8; max_packet];
        loop {
            match pipe.handle_in(&mut packet) {
                UsbHandshake::Ack { bytes } => {
                    data.extend_from_slice(&packet[..bytes]);
                    if bytes < max_packet || data.len() >= usize::from(setup.length) {
                        break;
                    }
                }
                UsbHandshake::Stall => return None,
                UsbHandshake::Nak => break,
            }
        }
        if pipe.handle_out(&[]) == UsbHandshake::Stall {
            return None;
        }
    } else {
        let mut status = [0u8; 0];
        if pipe.handle_in(&mut status) == UsbHandshake::Stall {
            return None;
        }
    }
    Some(data)
}

fn load_identity(path: Option<&PathBuf>) -> Result<DeviceIdentity> {
    let Some(path) = path else {
        return Ok(DeviceIdentity::default());
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read identity file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse identity file {}", path.display()))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let identity = load_identity(args.identity.as_ref())?;
    if args.print_identity {
        println!("{}", serde_json::to_string_pretty(&identity)?);
        return Ok(());
    }

    let max_packet = usize::from(identity.max_packet_size0);
    if !matches!(max_packet, 8 | 16 | 32 | 64) {
        bail!("bMaxPacketSize0 must be 8, 16, 32 or 64 (got {max_packet})");
    }

    let mut pipe = Device::new(&identity)
        .context("invalid device identity")?
        .into_pipe();
    tracing::info!(
        vendor_id = identity.vendor_id,
        product_id = identity.product_id,
        "device assembled"
    );

    let sequence = [
        ("device (first packet)", get_descriptor(1, 0, 64)),
        (
            "set address",
            SetupPacket {
                request_type: 0x00,
                request: REQ_SET_ADDRESS,
                value: 1,
                index: 0,
                length: 0,
            },
        ),
        ("device", get_descriptor(1, 0, 18)),
        ("configuration header", get_descriptor(2, 0, 9)),
        ("configuration", get_descriptor(2, 0, 0xFF)),
        ("language IDs", get_descriptor(3, 0, 0xFF)),
        ("manufacturer", get_descriptor(3, 1, 0xFF)),
        ("product", get_descriptor(3, 2, 0xFF)),
        ("serial number", get_descriptor(3, 3, 0xFF)),
        ("interface", get_descriptor(3, 4, 0xFF)),
        ("Microsoft OS string", get_descriptor(3, 0xEE, 0x12)),
        (
            "extended compat ID",
            vendor_in(
                identity.microsoft_os_vendor_code,
                0,
                MS_OS_EXTENDED_COMPAT_ID,
                0xFF,
            ),
        ),
        ("BOS", get_descriptor(0x0F, 0, 0xFF)),
        (
            "WebUSB landing page",
            vendor_in(
                identity.webusb_vendor_code,
                u16::from(identity.landing_page_index),
                WEBUSB_GET_URL,
                0xFF,
            ),
        ),
        (
            "set configuration",
            SetupPacket {
                request_type: 0x00,
                request: REQ_SET_CONFIGURATION,
                value: u16::from(identity.configuration_value),
                index: 0,
                length: 0,
            },
        ),
    ];

    for (name, setup) in sequence {
        let response = transfer(&mut pipe, setup, max_packet);
        let record = Transfer {
            name,
            setup: hex(&setup.to_bytes()),
            stalled: response.is_none(),
            data: response.as_deref().map(hex).unwrap_or_default(),
        };
        if args.json {
            println!("{}", serde_json::to_string(&record)?);
        } else if record.stalled {
            println!("{:<24} {}  STALL", record.name, record.setup);
        } else {
            println!("{:<24} {}  {}", record.name, record.setup, record.data);
        }
    }

    tracing::info!(address = pipe.address(), "enumeration finished");
    Ok(())
}
