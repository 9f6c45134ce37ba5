//! Transaction-level endpoint-0 adapter.
//!
//! The peripheral driver delivers SETUP packets and IN/OUT tokens for endpoint 0;
//! [`ControlPipe`] tracks the stage of the current control transfer, feeds complete requests to
//! the [`ControlRequestDispatcher`] and hands back packet-sized chunks of the response.
//!
//! A new SETUP always abandons any in-flight transfer, including side effects that only take
//! effect once the status stage completes (the pending address of SET_ADDRESS).

use crate::dispatch::ControlRequestDispatcher;
use crate::setup::{RequestDirection, RequestRecipient, SetupPacket, REQ_SET_ADDRESS};

/// Largest data stage the pipe buffers. Matches the DFU `wTransferSize` the device advertises.
pub const EP0_TRANSFER_BUFFER_LEN: usize = 2048;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UsbHandshake {
    Ack { bytes: usize },
    Nak,
    Stall,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Ep0Stage {
    Idle,
    DataIn,
    DataOut,
    StatusIn,
    StatusOut,
}

#[derive(Debug)]
struct Ep0Control {
    stage: Ep0Stage,
    setup: Option<SetupPacket>,
    in_len: usize,
    in_offset: usize,
    out_expected: usize,
    out_len: usize,
    stalled: bool,
}

impl Ep0Control {
    fn new() -> Self {
        Self {
            stage: Ep0Stage::Idle,
            setup: None,
            in_len: 0,
            in_offset: 0,
            out_expected: 0,
            out_len: 0,
            stalled: false,
        }
    }

    fn begin(&mut self, setup: SetupPacket) {
        self.setup = Some(setup);
        self.in_len = 0;
        self.in_offset = 0;
        self.out_expected = 0;
        self.out_len = 0;
        self.stalled = false;

        if setup.length == 0 {
            self.stage = Ep0Stage::StatusIn;
            return;
        }

        if setup.direction() == RequestDirection::DeviceToHost {
            self.stage = Ep0Stage::DataIn;
        } else {
            self.stage = Ep0Stage::DataOut;
            self.out_expected = setup.length as usize;
        }
    }

    fn finish(&mut self) {
        self.stage = Ep0Stage::Idle;
        self.setup = None;
    }
}

pub struct ControlPipe {
    dispatcher: ControlRequestDispatcher,
    ep0: Ep0Control,
    buffer: Box<[u8]>,
    address: u8,
    pending_address: Option<u8>,
}

impl ControlPipe {
    pub fn new(dispatcher: ControlRequestDispatcher) -> Self {
        Self {
            dispatcher,
            ep0: Ep0Control::new(),
            buffer: vec![0u8; EP0_TRANSFER_BUFFER_LEN].into_boxed_slice(),
            address: 0,
            pending_address: None,
        }
    }

    pub fn dispatcher(&self) -> &ControlRequestDispatcher {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut ControlRequestDispatcher {
        &mut self.dispatcher
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Bus reset.
    pub fn reset(&mut self) {
        self.ep0 = Ep0Control::new();
        self.address = 0;
        self.pending_address = None;
        self.dispatcher.reset();
    }

    pub fn handle_setup(&mut self, setup: SetupPacket) {
        self.pending_address = None;
        self.ep0.begin(setup);

        let supported = match setup.direction() {
            RequestDirection::DeviceToHost => {
                match self.dispatcher.dispatch(&setup, &mut self.buffer) {
                    Ok(len) => {
                        self.ep0.in_len = len;
                        true
                    }
                    Err(_) => false,
                }
            }
            RequestDirection::HostToDevice if setup.length == 0 => {
                if setup.is_standard(REQ_SET_ADDRESS)
                    && setup.recipient() == RequestRecipient::Device
                {
                    self.latch_address(setup)
                } else {
                    self.dispatcher.dispatch_out(&setup, &[]).is_ok()
                }
            }
            // Data arrives in subsequent OUT packets; the request is dispatched once complete.
            RequestDirection::HostToDevice => usize::from(setup.length) <= self.buffer.len(),
        };

        if !supported {
            self.ep0.stalled = true;
        }
    }

    fn latch_address(&mut self, setup: SetupPacket) -> bool {
        if setup.index != 0 || setup.value > 127 {
            tracing::debug!(?setup, "rejecting SET_ADDRESS");
            return false;
        }
        self.pending_address = Some(setup.value as u8);
        true
    }

    pub fn handle_out(&mut self, data: &[u8]) -> UsbHandshake {
        if self.ep0.stalled {
            return UsbHandshake::Stall;
        }

        match self.ep0.stage {
            Ep0Stage::DataOut => {
                let end = self.ep0.out_len + data.len();
                if end > self.ep0.out_expected {
                    self.ep0.stalled = true;
                    return UsbHandshake::Stall;
                }
                self.buffer[self.ep0.out_len..end].copy_from_slice(data);
                self.ep0.out_len = end;

                if self.ep0.out_len == self.ep0.out_expected {
                    let Some(setup) = self.ep0.setup else {
                        self.ep0.stalled = true;
                        return UsbHandshake::Stall;
                    };
                    let received = &self.buffer[..self.ep0.out_len];
                    if self.dispatcher.dispatch_out(&setup, received).is_err() {
                        self.ep0.stalled = true;
                        return UsbHandshake::Stall;
                    }
                    self.ep0.stage = Ep0Stage::StatusIn;
                }
                UsbHandshake::Ack { bytes: data.len() }
            }
            // The host may cut a control read short by starting the status stage early.
            Ep0Stage::DataIn | Ep0Stage::StatusOut => {
                if !data.is_empty() {
                    self.ep0.stalled = true;
                    return UsbHandshake::Stall;
                }
                self.ep0.finish();
                UsbHandshake::Ack { bytes: 0 }
            }
            _ => UsbHandshake::Nak,
        }
    }

    /// Answers an IN token with up to `buf.len()` bytes (the endpoint's max packet size).
    pub fn handle_in(&mut self, buf: &mut [u8]) -> UsbHandshake {
        if self.ep0.stalled {
            return UsbHandshake::Stall;
        }

        match self.ep0.stage {
            Ep0Stage::DataIn => {
                let remaining = self.ep0.in_len.saturating_sub(self.ep0.in_offset);
                let len = buf.len().min(remaining);
                buf[..len]
                    .copy_from_slice(&self.buffer[self.ep0.in_offset..self.ep0.in_offset + len]);
                self.ep0.in_offset += len;
                // A short (or zero-length) packet ends the data stage.
                if self.ep0.in_offset >= self.ep0.in_len && len < buf.len() {
                    self.ep0.stage = Ep0Stage::StatusOut;
                } else if self.ep0.in_offset >= self.ep0.in_len
                    && self
                        .ep0
                        .setup
                        .is_some_and(|setup| self.ep0.in_len == usize::from(setup.length))
                {
                    self.ep0.stage = Ep0Stage::StatusOut;
                }
                UsbHandshake::Ack { bytes: len }
            }
            Ep0Stage::StatusIn => {
                self.ep0.finish();
                if let Some(address) = self.pending_address.take() {
                    tracing::debug!(address, "device address assigned");
                    self.address = address;
                }
                UsbHandshake::Ack { bytes: 0 }
            }
            _ => UsbHandshake::Nak,
        }
    }
}
