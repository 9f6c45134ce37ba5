//! Request-level handling of endpoint-0 control transfers.
//!
//! [`ControlRequestDispatcher`] sees one SETUP packet at a time and either produces the data-stage
//! payload (device-to-host requests), applies the request (host-to-device requests), or reports
//! why the request must be stalled. It knows nothing about packets or stages; see
//! [`crate::pipe::ControlPipe`] for the transaction-level side.

use crate::class::InterfaceRequestHandler;
use crate::configuration::ConfigurationState;
use crate::error::Unsupported;
use crate::registry::DescriptorRegistry;
use crate::setup::{
    RequestDirection, RequestKind, RequestRecipient, SetupPacket, REQ_GET_CONFIGURATION,
    REQ_GET_DESCRIPTOR, REQ_GET_INTERFACE, REQ_GET_STATUS, REQ_SET_CONFIGURATION,
    REQ_SET_INTERFACE,
};
use crate::vendor::VendorExtensions;

/// Copies as much of `data` as both the host (`requested`) and the caller's buffer allow.
///
/// Returning fewer bytes than requested is a short packet, not an error: hosts read the header
/// first and re-request with the advertised length.
pub(crate) fn clamp_into(out: &mut [u8], data: &[u8], requested: u16) -> usize {
    let len = data.len().min(usize::from(requested)).min(out.len());
    out[..len].copy_from_slice(&data[..len]);
    len
}

fn unsupported(setup: &SetupPacket) -> Unsupported {
    Unsupported::Request {
        request_type: setup.request_type,
        request: setup.request,
    }
}

pub struct ControlRequestDispatcher {
    registry: DescriptorRegistry,
    vendor: VendorExtensions,
    configuration: ConfigurationState,
    interface: Option<Box<dyn InterfaceRequestHandler>>,
}

impl ControlRequestDispatcher {
    pub fn new(
        registry: DescriptorRegistry,
        vendor: VendorExtensions,
        configuration: ConfigurationState,
    ) -> Self {
        Self {
            registry,
            vendor,
            configuration,
            interface: None,
        }
    }

    /// Routes class and alternate-setting requests for one interface to `handler`.
    pub fn with_interface_handler(mut self, handler: Box<dyn InterfaceRequestHandler>) -> Self {
        self.interface = Some(handler);
        self
    }

    pub fn registry(&self) -> &DescriptorRegistry {
        &self.registry
    }

    pub fn vendor_extensions(&self) -> &VendorExtensions {
        &self.vendor
    }

    pub fn configuration(&self) -> &ConfigurationState {
        &self.configuration
    }

    pub fn interface_handler(&self) -> Option<&dyn InterfaceRequestHandler> {
        self.interface.as_deref()
    }

    pub fn interface_handler_mut(&mut self) -> Option<&mut (dyn InterfaceRequestHandler + 'static)> {
        self.interface.as_deref_mut()
    }

    /// Bus reset: back to the unconfigured state.
    pub fn reset(&mut self) {
        self.configuration.reset();
        if let Some(handler) = self.interface.as_deref_mut() {
            handler.reset();
        }
    }

    /// Handles a device-to-host request, writing the data-stage payload into `out`.
    ///
    /// Never writes more than `min(setup.length, out.len())` bytes and never mutates any state, so
    /// repeating a request yields identical output.
    pub fn dispatch(&self, setup: &SetupPacket, out: &mut [u8]) -> Result<usize, Unsupported> {
        let result = self.dispatch_in(setup, out);
        match &result {
            Ok(len) => tracing::trace!(?setup, len, "control IN request answered"),
            Err(reason) => tracing::debug!(?setup, %reason, "stalling control IN request"),
        }
        result
    }

    /// Handles a host-to-device request whose data stage (if any) has been received into `data`.
    pub fn dispatch_out(&mut self, setup: &SetupPacket, data: &[u8]) -> Result<(), Unsupported> {
        let result = self.dispatch_out_inner(setup, data);
        match &result {
            Ok(()) => tracing::trace!(?setup, len = data.len(), "control OUT request applied"),
            Err(reason) => tracing::debug!(?setup, %reason, "stalling control OUT request"),
        }
        result
    }

    fn dispatch_in(&self, setup: &SetupPacket, out: &mut [u8]) -> Result<usize, Unsupported> {
        if setup.direction() != RequestDirection::DeviceToHost {
            return Err(unsupported(setup));
        }
        match setup.kind() {
            RequestKind::Standard => self.standard_in(setup, out),
            RequestKind::Vendor => {
                let ext = self
                    .vendor
                    .find(setup.request)
                    .ok_or(Unsupported::UnknownVendorCode(setup.request))?;
                let cap = usize::from(setup.length).min(out.len());
                ext.handle(setup, &mut out[..cap])
            }
            RequestKind::Class => {
                let handler = self.interface_for(setup).ok_or_else(|| unsupported(setup))?;
                let cap = usize::from(setup.length).min(out.len());
                let len = handler
                    .handle_in(setup, &mut out[..cap])
                    .ok_or_else(|| unsupported(setup))?;
                Ok(len.min(cap))
            }
            RequestKind::Reserved => Err(unsupported(setup)),
        }
    }

    fn standard_in(&self, setup: &SetupPacket, out: &mut [u8]) -> Result<usize, Unsupported> {
        match (setup.recipient(), setup.request) {
            (RequestRecipient::Device | RequestRecipient::Interface, REQ_GET_DESCRIPTOR) => {
                let descriptor_type = setup.descriptor_type();
                let index = setup.descriptor_index();
                let bytes = self.registry.resolve(descriptor_type, index).ok_or(
                    Unsupported::UnknownDescriptor {
                        descriptor_type,
                        index,
                    },
                )?;
                Ok(clamp_into(out, bytes, setup.length))
            }
            (RequestRecipient::Device, REQ_GET_CONFIGURATION)
                if setup.value == 0 && setup.index == 0 =>
            {
                Ok(clamp_into(
                    out,
                    &[self.configuration.active()],
                    setup.length,
                ))
            }
            // Bus powered, remote wakeup disabled.
            (RequestRecipient::Device, REQ_GET_STATUS) if setup.value == 0 && setup.index == 0 => {
                Ok(clamp_into(out, &[0, 0], setup.length))
            }
            (RequestRecipient::Interface, REQ_GET_STATUS) if setup.value == 0 => {
                self.interface_for(setup).ok_or_else(|| unsupported(setup))?;
                Ok(clamp_into(out, &[0, 0], setup.length))
            }
            (RequestRecipient::Interface, REQ_GET_INTERFACE)
                if setup.value == 0 && self.configuration.is_configured() =>
            {
                let handler = self.interface_for(setup).ok_or_else(|| unsupported(setup))?;
                Ok(clamp_into(
                    out,
                    &[handler.alternate_setting()],
                    setup.length,
                ))
            }
            _ => Err(unsupported(setup)),
        }
    }

    fn dispatch_out_inner(&mut self, setup: &SetupPacket, data: &[u8]) -> Result<(), Unsupported> {
        if setup.direction() != RequestDirection::HostToDevice {
            return Err(unsupported(setup));
        }
        match (setup.kind(), setup.recipient(), setup.request) {
            (RequestKind::Standard, RequestRecipient::Device, REQ_SET_CONFIGURATION)
                if setup.index == 0 && setup.length == 0 =>
            {
                let previous = self.configuration.active();
                if let Err(err) = self.configuration.set_active(setup.value) {
                    tracing::warn!(%err, "host selected an unsupported configuration");
                    return Err(err.into());
                }
                let active = self.configuration.active();
                if active != previous {
                    tracing::info!(previous, active, "configuration changed");
                }
                Ok(())
            }
            (RequestKind::Standard, RequestRecipient::Interface, REQ_SET_INTERFACE)
                if setup.length == 0 && self.configuration.is_configured() =>
            {
                let alternate_setting =
                    u8::try_from(setup.value).map_err(|_| unsupported(setup))?;
                let handler = self
                    .interface_for_mut(setup)
                    .ok_or_else(|| unsupported(setup))?;
                if !handler.set_alternate_setting(alternate_setting) {
                    return Err(unsupported(setup));
                }
                Ok(())
            }
            (RequestKind::Class, RequestRecipient::Interface, _) => {
                let handler = self
                    .interface_for_mut(setup)
                    .ok_or_else(|| unsupported(setup))?;
                if !handler.handle_out(setup, data) {
                    return Err(unsupported(setup));
                }
                Ok(())
            }
            _ => Err(unsupported(setup)),
        }
    }

    fn interface_number_of(&self, setup: &SetupPacket) -> Option<u8> {
        // wIndex high byte is reserved for interface recipients.
        (setup.recipient() == RequestRecipient::Interface && setup.index >> 8 == 0)
            .then_some((setup.index & 0xFF) as u8)
    }

    fn interface_for(&self, setup: &SetupPacket) -> Option<&dyn InterfaceRequestHandler> {
        let number = self.interface_number_of(setup)?;
        self.interface
            .as_deref()
            .filter(|handler| handler.interface_number() == number)
    }

    fn interface_for_mut(
        &mut self,
        setup: &SetupPacket,
    ) -> Option<&mut (dyn InterfaceRequestHandler + 'static)> {
        let number = self.interface_number_of(setup)?;
        self.interface
            .as_deref_mut()
            .filter(|handler| handler.interface_number() == number)
    }
}
