//! Boundary to the interface that owns class-specific requests.
//!
//! On a DFU-mode device this is the firmware-update state machine (DFU_DETACH, DFU_DNLOAD,
//! DFU_UPLOAD, DFU_GETSTATUS, ...). The dispatcher only routes requests addressed to the
//! interface; it never interprets them.

use crate::setup::SetupPacket;

pub trait InterfaceRequestHandler {
    /// `bInterfaceNumber` this handler answers for.
    fn interface_number(&self) -> u8;

    fn alternate_setting(&self) -> u8 {
        0
    }

    /// SET_INTERFACE. Returns `false` to stall.
    fn set_alternate_setting(&mut self, alternate_setting: u8) -> bool {
        alternate_setting == 0
    }

    /// Device-to-host class request. Returns the number of bytes written to `out`, or `None` to
    /// stall.
    fn handle_in(&self, setup: &SetupPacket, out: &mut [u8]) -> Option<usize>;

    /// Host-to-device class request with its data stage (empty when `setup.length == 0`).
    /// Returns `false` to stall.
    fn handle_out(&mut self, setup: &SetupPacket, data: &[u8]) -> bool;

    /// Bus reset.
    fn reset(&mut self) {}
}
