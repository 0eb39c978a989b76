//! End-to-end binding behaviour against the simulated driver.

use std::io::Cursor;
use std::sync::Arc;

use ecc_control::driver::{EntryPoint, MockDevice, MockDriver};
use ecc_control::select::select_device;
use ecc_control::{DeviceBinding, EccError, Status};

fn shared(driver: MockDriver) -> (DeviceBinding, Arc<MockDriver>) {
    let driver = Arc::new(driver);
    (DeviceBinding::new(driver.clone()), driver)
}

#[test]
fn test_empty_enumeration_is_no_devices() {
    let binding = DeviceBinding::new(MockDriver::new(0));
    let err = binding.enumerate_devices().unwrap_err();
    assert!(matches!(err, EccError::NoDevices));
    assert_eq!(err.status(), Some(Status::DriverError));
    assert_eq!(err.to_string(), "No devices found");
}

#[test]
fn test_connect_single_device_returns_driver_handle() {
    let binding = DeviceBinding::new(MockDriver::new(1).with_first_handle(42));
    let index = select_device(
        binding.enumerate_devices().unwrap(),
        Cursor::new(Vec::new()),
        Vec::new(),
    )
    .unwrap();
    assert_eq!(index, 0);

    let handle = binding.connect(index).unwrap();
    assert_eq!(handle.raw(), 42);
}

#[test]
fn test_set_amplitude_invalid_param() {
    let (binding, driver) = shared(MockDriver::new(1));
    let handle = binding.connect(0).unwrap();
    driver.fail(EntryPoint::ControlAmplitude, 11);

    let err = binding.set_amplitude(handle, 0, 30_000).unwrap_err();
    assert_eq!(err.status(), Some(Status::InvalidParam));
    assert_eq!(err.entry(), Some(EntryPoint::ControlAmplitude));
    let message = err.to_string();
    assert!(message.contains("Parameter out of range"), "{}", message);
    assert!(message.contains("control_amplitude"), "{}", message);
}

#[test]
fn test_disconnect_never_raises() {
    for code in [-1, 1, 2, 3, 7, 11, 12, 99] {
        let (binding, driver) = shared(MockDriver::new(1));
        let handle = binding.connect(0).unwrap();
        driver.fail(EntryPoint::Close, code);

        let status = binding.disconnect(handle);
        assert_eq!(status.code(), code);
        assert!(!status.is_ok());
    }
}

#[test]
fn test_full_session() {
    let (binding, driver) = shared(MockDriver::new(2));

    let devices = binding.list_devices().unwrap();
    assert_eq!(devices.len(), 2);
    assert_eq!(devices[1].to_string(), "Device 1: Id=1001");

    let index = select_device(2, Cursor::new(b"7\n".to_vec()), Vec::new()).unwrap();
    assert_eq!(index, 1);

    let handle = binding.connect(index).unwrap();
    assert!(driver.is_locked(1));
    assert_eq!(binding.list_devices().unwrap()[1].to_string(), "Device 1: locked");

    binding.set_amplitude(handle, 2, 45_000).unwrap();
    binding.set_frequency(handle, 2, 500_000).unwrap();
    assert_eq!(binding.amplitude(handle, 2).unwrap(), 45_000);
    assert_eq!(binding.frequency(handle, 2).unwrap(), 500_000);

    for _ in 0..3 {
        binding.step_forward(handle, 2).unwrap();
    }
    binding.step_backward(handle, 2).unwrap();
    assert_eq!(driver.steps(handle.raw(), 2), 2);

    assert_eq!(binding.disconnect(handle), Status::Ok);
    assert!(!driver.is_locked(1));
    assert_eq!(driver.open_sessions(), 0);
}

#[test]
fn test_stale_handle_is_forwarded_to_driver() {
    let binding = DeviceBinding::new(MockDriver::new(1));
    let handle = binding.connect(0).unwrap();
    assert!(binding.disconnect(handle).is_ok());

    let err = binding.step(handle, 0, false).unwrap_err();
    assert_eq!(err.status(), Some(Status::NotConnected));
    assert_eq!(err.entry(), Some(EntryPoint::SetSingleStep));
}

#[test]
fn test_locked_device_refuses_second_connect() {
    let binding = DeviceBinding::new(MockDriver::with_devices(vec![MockDevice {
        id: 5,
        locked: true,
    }]));
    let err = binding.connect(0).unwrap_err();
    assert_eq!(err.status(), Some(Status::DeviceLocked));
    assert_eq!(
        err.to_string(),
        "Error calling connect: Device is already in use by another"
    );
}
