use crate::error::ConfigurationError;

/// The device's single configuration and whether the host has selected it.
///
/// `SET_CONFIGURATION(0)` returns the device to the Address state, so 0 is accepted alongside the
/// supported value. Anything else leaves the state untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConfigurationState {
    value: u8,
    active: u8,
}

impl ConfigurationState {
    pub fn new(value: u8) -> Self {
        Self { value, active: 0 }
    }

    /// `bConfigurationValue` of the only configuration the device exposes.
    pub fn value(&self) -> u8 {
        self.value
    }

    /// Currently selected configuration (0 while unconfigured).
    pub fn active(&self) -> u8 {
        self.active
    }

    pub fn is_configured(&self) -> bool {
        self.active != 0
    }

    pub fn set_active(&mut self, requested: u16) -> Result<(), ConfigurationError> {
        match u8::try_from(requested) {
            Ok(value) if value == self.value || value == 0 => {
                self.active = value;
                Ok(())
            }
            _ => Err(ConfigurationError::InvalidValue {
                requested,
                supported: self.value,
            }),
        }
    }

    /// Drops back to the unconfigured state (bus reset).
    pub fn reset(&mut self) {
        self.active = 0;
    }
}
