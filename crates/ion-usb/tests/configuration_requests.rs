mod util;

use ion_usb::{ConfigurationError, Device, DeviceIdentity, SetupPacket, Unsupported};
use util::*;

#[test]
fn set_configuration_with_the_supported_value_is_reported_back() {
    let mut dispatcher = dispatcher();
    assert_eq!(dispatch_in(&dispatcher, get_configuration(), 1).unwrap(), vec![0]);

    dispatcher.dispatch_out(&set_configuration(1), &[]).unwrap();
    assert_eq!(dispatch_in(&dispatcher, get_configuration(), 1).unwrap(), vec![1]);
    assert!(dispatcher.configuration().is_configured());
}

#[test]
fn invalid_configuration_value_is_rejected_without_changing_state() {
    let mut dispatcher = dispatcher();
    dispatcher.dispatch_out(&set_configuration(1), &[]).unwrap();

    for bad in [2u16, 0x80, 0x0100] {
        assert_eq!(
            dispatcher.dispatch_out(&set_configuration(bad), &[]),
            Err(Unsupported::InvalidConfiguration(
                ConfigurationError::InvalidValue {
                    requested: bad,
                    supported: 1,
                }
            ))
        );
        assert_eq!(dispatch_in(&dispatcher, get_configuration(), 1).unwrap(), vec![1]);
    }
}

#[test]
fn rejected_value_before_enumeration_leaves_device_unconfigured() {
    let mut dispatcher = dispatcher();
    assert!(dispatcher.dispatch_out(&set_configuration(7), &[]).is_err());
    assert_eq!(dispatcher.configuration().active(), 0);
}

#[test]
fn set_configuration_zero_returns_to_address_state() {
    let mut dispatcher = dispatcher();
    dispatcher.dispatch_out(&set_configuration(1), &[]).unwrap();
    dispatcher.dispatch_out(&set_configuration(0), &[]).unwrap();
    assert_eq!(dispatch_in(&dispatcher, get_configuration(), 1).unwrap(), vec![0]);
}

#[test]
fn custom_configuration_value_is_honoured() {
    let identity = DeviceIdentity {
        configuration_value: 3,
        ..Default::default()
    };
    let mut dispatcher = Device::dispatcher(&identity).unwrap();
    assert!(dispatcher.dispatch_out(&set_configuration(1), &[]).is_err());
    dispatcher.dispatch_out(&set_configuration(3), &[]).unwrap();
    assert_eq!(dispatch_in(&dispatcher, get_configuration(), 1).unwrap(), vec![3]);

    let config = dispatch_in(&dispatcher, get_descriptor(TYPE_CONFIGURATION, 0, 9), 9).unwrap();
    assert_eq!(config[5], 3);
}

#[test]
fn malformed_set_configuration_is_unsupported() {
    let mut dispatcher = dispatcher();
    let with_index = SetupPacket {
        index: 1,
        ..set_configuration(1)
    };
    assert!(matches!(
        dispatcher.dispatch_out(&with_index, &[]),
        Err(Unsupported::Request { .. })
    ));
    assert!(!dispatcher.configuration().is_configured());
}

#[test]
fn reset_unconfigures_the_device() {
    let mut dispatcher = dispatcher();
    dispatcher.dispatch_out(&set_configuration(1), &[]).unwrap();
    dispatcher.reset();
    assert_eq!(dispatcher.configuration().active(), 0);
}

#[test]
fn device_status_reports_bus_powered_without_wakeup() {
    let dispatcher = dispatcher();
    let status = SetupPacket {
        request_type: 0x80,
        request: 0x00, // GET_STATUS
        value: 0,
        index: 0,
        length: 2,
    };
    assert_eq!(dispatch_in(&dispatcher, status, 2).unwrap(), vec![0, 0]);
}
