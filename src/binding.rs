//! ECC100 Device Binding
//!
//! [`DeviceBinding`] is the typed surface over the driver entry points. It owns
//! the driver (and through it the loaded library) for its whole lifetime and is
//! the only place status codes are interpreted.
//!
//! ## Connection lifecycle
//!
//! ```text
//! Unconnected --connect()--> Connected (handle valid)
//! Connected --disconnect()--> Unconnected (handle stale)
//! ```
//!
//! The binding does not track this. A stale or made-up [`ConnectionHandle`] is
//! forwarded to the driver, which answers with `NotConnected`. Axis numbers are
//! forwarded unchecked as well; the driver decides what is in range.
//!
//! ## Errors
//!
//! Every operation except [`DeviceBinding::disconnect`] fails with
//! [`EccError::Call`] when the driver returns a non-success status. Out
//! parameters are only read after the status is `Ok`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use ecc_control::binding::DeviceBinding;
//!
//! let binding = DeviceBinding::load("C:/ECC100_DLL/Win64/ecc.dll")?;
//! let handle = binding.connect(0)?;
//! binding.set_amplitude(handle, 0, 30_000)?;
//! binding.step_forward(handle, 0)?;
//! binding.disconnect(handle);
//! ```

use std::fmt;
use std::path::Path;

use ecc_sys::EccLibrary;
use tracing::{debug, info, warn};

use crate::driver::{EccDriver, EntryPoint};
use crate::error::{AppResult, EccError};
use crate::status::{self, Status};

/// Opaque handle of one connected device, as issued by `ECC_Connect`.
///
/// Valid from `connect` until `disconnect`. Not valid across process restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionHandle(i32);

impl ConnectionHandle {
    /// Wrap a raw driver handle.
    pub fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// Raw driver handle.
    pub fn raw(self) -> i32 {
        self.0
    }
}

impl fmt::Display for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One enumerated device slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Slot index passed to `connect`.
    pub index: i32,
    /// Device id reported by the controller.
    pub id: i32,
    /// Whether another process holds the device.
    pub locked: bool,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.locked {
            write!(f, "Device {}: locked", self.index)
        } else {
            write!(f, "Device {}: Id={}", self.index, self.id)
        }
    }
}

/// Typed access to an ECC driver.
pub struct DeviceBinding {
    driver: Box<dyn EccDriver>,
}

impl fmt::Debug for DeviceBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceBinding").finish_non_exhaustive()
    }
}

impl DeviceBinding {
    /// Bind to an already constructed driver.
    pub fn new<D: EccDriver + 'static>(driver: D) -> Self {
        Self {
            driver: Box::new(driver),
        }
    }

    /// Open the vendor library at `path`.
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let library = EccLibrary::load(path)?;
        debug!(path = %library.path().display(), "Binding ECC driver");
        Ok(Self::new(library))
    }

    /// Number of attached controllers.
    ///
    /// A count of zero or less means no device is attached.
    pub fn enumerate_devices(&self) -> AppResult<i32> {
        let count = self.driver.check();
        debug!(count, "ECC_Check");
        if count <= 0 {
            return Err(EccError::NoDevices);
        }
        Ok(count)
    }

    /// Id and lock state of device slot `index`.
    pub fn describe_device(&self, index: i32) -> AppResult<DeviceInfo> {
        let mut id = 0;
        let mut locked = 0;
        let code = self.driver.get_device_info(index, &mut id, &mut locked);
        self.observe(EntryPoint::GetDeviceInfo, code)?;
        Ok(DeviceInfo {
            index,
            id,
            locked: locked != 0,
        })
    }

    /// Describe every enumerated slot.
    pub fn list_devices(&self) -> AppResult<Vec<DeviceInfo>> {
        let count = self.enumerate_devices()?;
        (0..count).map(|i| self.describe_device(i)).collect()
    }

    /// Open device slot `device_index` and lock it for this process.
    pub fn connect(&self, device_index: i32) -> AppResult<ConnectionHandle> {
        let mut raw = 0;
        let code = self.driver.connect(device_index, &mut raw);
        self.observe(EntryPoint::Connect, code)?;
        info!(device_index, handle = raw, "Connected to ECC device");
        Ok(ConnectionHandle(raw))
    }

    /// Write the step amplitude (mV) of `axis`.
    pub fn set_amplitude(&self, handle: ConnectionHandle, axis: i32, amplitude: i32) -> AppResult<()> {
        let mut value = amplitude;
        let code = self.driver.control_amplitude(handle.0, axis, &mut value, 1);
        self.observe(EntryPoint::ControlAmplitude, code)?;
        info!(handle = handle.0, axis, amplitude, "Amplitude value updated");
        Ok(())
    }

    /// Read the step amplitude (mV) of `axis` back from the controller.
    pub fn amplitude(&self, handle: ConnectionHandle, axis: i32) -> AppResult<i32> {
        let mut value = 0;
        let code = self.driver.control_amplitude(handle.0, axis, &mut value, 0);
        self.observe(EntryPoint::ControlAmplitude, code)?;
        Ok(value)
    }

    /// Write the step frequency (mHz) of `axis`.
    pub fn set_frequency(&self, handle: ConnectionHandle, axis: i32, frequency: i32) -> AppResult<()> {
        let mut value = frequency;
        let code = self.driver.control_frequency(handle.0, axis, &mut value, 1);
        self.observe(EntryPoint::ControlFrequency, code)?;
        info!(handle = handle.0, axis, frequency, "Frequency value updated");
        Ok(())
    }

    /// Read the step frequency (mHz) of `axis` back from the controller.
    pub fn frequency(&self, handle: ConnectionHandle, axis: i32) -> AppResult<i32> {
        let mut value = 0;
        let code = self.driver.control_frequency(handle.0, axis, &mut value, 0);
        self.observe(EntryPoint::ControlFrequency, code)?;
        Ok(value)
    }

    /// Issue exactly one step on `axis`.
    pub fn step(&self, handle: ConnectionHandle, axis: i32, backward: bool) -> AppResult<()> {
        let code = self
            .driver
            .set_single_step(handle.0, axis, i32::from(backward));
        self.observe(EntryPoint::SetSingleStep, code)
    }

    /// One step forward.
    pub fn step_forward(&self, handle: ConnectionHandle, axis: i32) -> AppResult<()> {
        self.step(handle, axis, false)
    }

    /// One step backward.
    pub fn step_backward(&self, handle: ConnectionHandle, axis: i32) -> AppResult<()> {
        self.step(handle, axis, true)
    }

    /// Release the device lock held through `handle`.
    ///
    /// Never fails. A non-`Ok` status from `ECC_Close` is logged and returned
    /// instead of raised; check `is_ok()` for strict behaviour.
    pub fn disconnect(&self, handle: ConnectionHandle) -> Status {
        let code = self.driver.close(handle.0);
        let entry = EntryPoint::Close;
        debug!(entry = %entry, symbol = entry.symbol(), code, "native call returned");
        let status = Status::from_code(code);
        if status.is_ok() {
            info!(handle = handle.0, "Device disconnected");
        } else {
            warn!(
                handle = handle.0,
                code,
                "ECC_Close returned non-success status (ignored): {}",
                status
            );
        }
        status
    }

    fn observe(&self, entry: EntryPoint, code: i32) -> AppResult<()> {
        debug!(entry = %entry, symbol = entry.symbol(), code, "native call returned");
        status::check(entry, code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{MockDevice, MockDriver};
    use std::sync::Arc;
    use tracing_test::traced_test;

    /// Lets a test keep inspecting the mock after handing it to the binding.
    fn shared(driver: MockDriver) -> (DeviceBinding, Arc<MockDriver>) {
        let driver = Arc::new(driver);
        (DeviceBinding::new(driver.clone()), driver)
    }

    #[test]
    fn test_enumerate_devices() {
        let binding = DeviceBinding::new(MockDriver::new(2));
        assert_eq!(binding.enumerate_devices().unwrap(), 2);
    }

    #[test]
    fn test_enumerate_no_devices() {
        let binding = DeviceBinding::new(MockDriver::new(0));
        assert!(matches!(binding.enumerate_devices(), Err(EccError::NoDevices)));

        let binding = DeviceBinding::new(MockDriver::new(0).with_reported_count(-1));
        assert!(matches!(binding.enumerate_devices(), Err(EccError::NoDevices)));
    }

    #[test]
    fn test_describe_device() {
        let binding = DeviceBinding::new(MockDriver::with_devices(vec![
            MockDevice { id: 17, locked: false },
            MockDevice { id: 18, locked: true },
        ]));
        let info = binding.describe_device(1).unwrap();
        assert_eq!(info, DeviceInfo { index: 1, id: 18, locked: true });
        assert_eq!(info.to_string(), "Device 1: locked");
        assert_eq!(binding.describe_device(0).unwrap().to_string(), "Device 0: Id=17");
    }

    #[test]
    fn test_describe_failure() {
        let binding = DeviceBinding::new(MockDriver::new(1).failing(EntryPoint::GetDeviceInfo, 1));
        let err = binding.describe_device(0).unwrap_err();
        assert_eq!(err.entry(), Some(EntryPoint::GetDeviceInfo));
        assert_eq!(err.status(), Some(Status::Timeout));
    }

    #[test]
    fn test_list_devices() {
        let binding = DeviceBinding::new(MockDriver::new(3));
        let devices = binding.list_devices().unwrap();
        let ids: Vec<i32> = devices.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![1000, 1001, 1002]);
    }

    #[test]
    fn test_connect_returns_driver_handle() {
        let binding = DeviceBinding::new(MockDriver::new(1).with_first_handle(42));
        let handle = binding.connect(0).unwrap();
        assert_eq!(handle.raw(), 42);
    }

    #[test]
    fn test_connect_locked_device() {
        let binding = DeviceBinding::new(MockDriver::new(1));
        binding.connect(0).unwrap();
        let err = binding.connect(0).unwrap_err();
        assert_eq!(err.status(), Some(Status::DeviceLocked));
        assert_eq!(
            err.to_string(),
            "Error calling connect: Device is already in use by another"
        );
    }

    #[test]
    fn test_set_amplitude_invalid_param() {
        let binding =
            DeviceBinding::new(MockDriver::new(1).failing(EntryPoint::ControlAmplitude, 11));
        let handle = binding.connect(0).unwrap();
        let err = binding.set_amplitude(handle, 0, 30_000).unwrap_err();
        assert_eq!(err.entry().map(EntryPoint::name), Some("control_amplitude"));
        assert_eq!(err.status().map(Status::message), Some("Parameter out of range"));
    }

    #[test]
    fn test_amplitude_and_frequency_readback() {
        let binding = DeviceBinding::new(MockDriver::new(1));
        let handle = binding.connect(0).unwrap();
        binding.set_amplitude(handle, 2, 42_000).unwrap();
        binding.set_frequency(handle, 2, 500_000).unwrap();
        assert_eq!(binding.amplitude(handle, 2).unwrap(), 42_000);
        assert_eq!(binding.frequency(handle, 2).unwrap(), 500_000);
    }

    #[test]
    fn test_step_directions() {
        let (binding, driver) = shared(MockDriver::new(1));
        let handle = binding.connect(0).unwrap();
        binding.step_forward(handle, 0).unwrap();
        binding.step_forward(handle, 0).unwrap();
        binding.step_backward(handle, 0).unwrap();
        binding.step(handle, 1, true).unwrap();
        assert_eq!(driver.steps(handle.raw(), 0), 1);
        assert_eq!(driver.steps(handle.raw(), 1), -1);
    }

    #[test]
    fn test_axis_is_forwarded_unchecked() {
        let (binding, driver) = shared(MockDriver::new(1));
        let handle = binding.connect(0).unwrap();
        let err = binding.step(handle, 99, false).unwrap_err();
        assert_eq!(err.status(), Some(Status::InvalidParam));
        assert_eq!(
            driver.calls().last(),
            Some(&EntryPoint::SetSingleStep)
        );
    }

    #[test]
    fn test_stale_handle_is_forwarded() {
        let binding = DeviceBinding::new(MockDriver::new(1));
        let handle = binding.connect(0).unwrap();
        assert!(binding.disconnect(handle).is_ok());
        let err = binding.step_forward(handle, 0).unwrap_err();
        assert_eq!(err.status(), Some(Status::NotConnected));
    }

    #[test]
    fn test_every_failing_call_raises_with_entry() {
        type Op = fn(&DeviceBinding, ConnectionHandle) -> AppResult<()>;
        let ops: [(EntryPoint, Op); 10] = [
            (EntryPoint::GetDeviceInfo, |b, _| b.describe_device(0).map(|_| ())),
            (EntryPoint::GetDeviceInfo, |b, _| b.list_devices().map(|_| ())),
            (EntryPoint::Connect, |b, _| b.connect(1).map(|_| ())),
            (EntryPoint::ControlAmplitude, |b, h| b.set_amplitude(h, 0, 1)),
            (EntryPoint::ControlAmplitude, |b, h| b.amplitude(h, 0).map(|_| ())),
            (EntryPoint::ControlFrequency, |b, h| b.set_frequency(h, 0, 1)),
            (EntryPoint::ControlFrequency, |b, h| b.frequency(h, 0).map(|_| ())),
            (EntryPoint::SetSingleStep, |b, h| b.step(h, 0, false)),
            (EntryPoint::SetSingleStep, |b, h| b.step_forward(h, 0)),
            (EntryPoint::SetSingleStep, |b, h| b.step_backward(h, 0)),
        ];
        for code in [-1, 1, 2, 3, 7, 11, 12, 99] {
            for (entry, op) in ops {
                let (binding, driver) = shared(MockDriver::new(2));
                let handle = binding.connect(0).unwrap();
                driver.fail(entry, code);

                let err = op(&binding, handle).unwrap_err();
                assert_eq!(err.entry(), Some(entry), "code {}", code);
                assert_eq!(err.status(), Some(Status::from_code(code)));
                assert!(err.to_string().contains(entry.name()));
            }
        }
    }

    #[test]
    fn test_list_devices_stops_at_first_failing_describe() {
        let (binding, driver) = shared(MockDriver::new(3).failing(EntryPoint::GetDeviceInfo, 12));
        let err = binding.list_devices().unwrap_err();
        assert_eq!(err.status(), Some(Status::FeatureNotAvailable));
        let describes = driver
            .calls()
            .into_iter()
            .filter(|e| *e == EntryPoint::GetDeviceInfo)
            .count();
        assert_eq!(describes, 1);
    }

    #[test]
    #[traced_test]
    fn test_native_calls_log_symbol() {
        let binding = DeviceBinding::new(MockDriver::new(1));
        let handle = binding.connect(0).unwrap();
        binding.step_forward(handle, 0).unwrap();
        binding.disconnect(handle);
        assert!(logs_contain("ECC_Connect"));
        assert!(logs_contain("ECC_setSingleStep"));
        assert!(logs_contain("ECC_Close"));
    }

    #[test]
    #[traced_test]
    fn test_disconnect_swallows_status() {
        let binding = DeviceBinding::new(MockDriver::new(1).failing(EntryPoint::Close, 3));
        let handle = binding.connect(0).unwrap();
        let status = binding.disconnect(handle);
        assert_eq!(status, Status::DriverError);
        assert!(logs_contain("ECC_Close returned non-success status"));
    }

    #[test]
    fn test_disconnect_unknown_handle_does_not_raise() {
        let binding = DeviceBinding::new(MockDriver::new(1));
        let status = binding.disconnect(ConnectionHandle::from_raw(1234));
        assert_eq!(status, Status::NotConnected);
    }

    #[test]
    fn test_disconnect_releases_lock() {
        let (binding, driver) = shared(MockDriver::new(1));
        let handle = binding.connect(0).unwrap();
        assert!(driver.is_locked(0));
        binding.disconnect(handle);
        assert!(!driver.is_locked(0));
        assert_eq!(driver.open_sessions(), 0);
    }
}
