//! Mock ECC Driver
//!
//! Simulates an ECC100 installation without the vendor library, for tests and
//! for `--mock` runs of the command line tool.
//!
//! # Behaviour
//!
//! - Each simulated controller has three axes (0..=2), like the ECC100.
//! - `connect` locks the device and hands out increasing handles.
//! - `close` unlocks; unknown handles get `NCB_NOT_CONNECTED`.
//! - Out-of-range device numbers and axes get `NCB_INVALID_PARAM`.
//! - Any entry point can be forced to return a given status with
//!   [`MockDriver::fail`].
//!
//! # Example
//!
//! ```rust,ignore
//! let driver = MockDriver::new(1).with_first_handle(42);
//! let binding = DeviceBinding::new(driver);
//! assert_eq!(binding.connect(0)?.raw(), 42);
//! ```

use std::collections::HashMap;

use ecc_sys::{Bln32, Int32, NCB_DEVICE_LOCKED, NCB_INVALID_PARAM, NCB_NOT_CONNECTED, NCB_OK};
use parking_lot::Mutex;
use tracing::debug;

use super::{EccDriver, EntryPoint};

/// Axes per simulated controller.
pub const MOCK_AXES: Int32 = 3;

/// Power-on amplitude in mV.
pub const DEFAULT_AMPLITUDE_MV: Int32 = 30_000;

/// Power-on frequency in mHz.
pub const DEFAULT_FREQUENCY_MHZ: Int32 = 1_000_000;

/// One simulated controller slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockDevice {
    /// Device id reported by `ECC_getDeviceInfo`.
    pub id: Int32,
    /// Lock flag reported by `ECC_getDeviceInfo`.
    pub locked: bool,
}

#[derive(Debug, Clone, Copy)]
struct AxisState {
    amplitude: Int32,
    frequency: Int32,
    /// Net steps, forward positive.
    steps: i64,
}

impl Default for AxisState {
    fn default() -> Self {
        Self {
            amplitude: DEFAULT_AMPLITUDE_MV,
            frequency: DEFAULT_FREQUENCY_MHZ,
            steps: 0,
        }
    }
}

#[derive(Debug)]
struct MockState {
    devices: Vec<MockDevice>,
    reported_count: Option<Int32>,
    failures: HashMap<EntryPoint, Int32>,
    next_handle: Int32,
    /// handle -> device index
    sessions: HashMap<Int32, usize>,
    axes: HashMap<(Int32, Int32), AxisState>,
    calls: Vec<EntryPoint>,
}

/// Simulated ECC driver.
#[derive(Debug)]
pub struct MockDriver {
    state: Mutex<MockState>,
}

impl MockDriver {
    /// `count` unlocked devices with ids 1000, 1001, ...
    pub fn new(count: usize) -> Self {
        let devices = (0..count)
            .map(|i| MockDevice {
                id: 1000 + i as Int32,
                locked: false,
            })
            .collect();
        Self::with_devices(devices)
    }

    /// Explicit device list.
    pub fn with_devices(devices: Vec<MockDevice>) -> Self {
        Self {
            state: Mutex::new(MockState {
                devices,
                reported_count: None,
                failures: HashMap::new(),
                next_handle: 1,
                sessions: HashMap::new(),
                axes: HashMap::new(),
                calls: Vec::new(),
            }),
        }
    }

    /// First handle returned by `connect`.
    pub fn with_first_handle(self, handle: Int32) -> Self {
        self.state.lock().next_handle = handle;
        self
    }

    /// Make `ECC_Check` return `count` regardless of the device list.
    pub fn with_reported_count(self, count: Int32) -> Self {
        self.state.lock().reported_count = Some(count);
        self
    }

    /// Force `entry` to return `code` until cleared.
    ///
    /// Has no effect on `ECC_Check`, which returns a count rather than a
    /// status; use [`MockDriver::with_reported_count`] instead.
    pub fn fail(&self, entry: EntryPoint, code: Int32) {
        self.state.lock().failures.insert(entry, code);
    }

    /// Builder form of [`MockDriver::fail`].
    pub fn failing(self, entry: EntryPoint, code: Int32) -> Self {
        self.fail(entry, code);
        self
    }

    /// Stop forcing a status on `entry`.
    pub fn clear_failure(&self, entry: EntryPoint) {
        self.state.lock().failures.remove(&entry);
    }

    /// Entry points called so far, in order.
    pub fn calls(&self) -> Vec<EntryPoint> {
        self.state.lock().calls.clone()
    }

    /// Net step count on one axis of one connection.
    pub fn steps(&self, handle: Int32, axis: Int32) -> i64 {
        self.state
            .lock()
            .axes
            .get(&(handle, axis))
            .map_or(0, |a| a.steps)
    }

    /// Whether device slot `index` is currently locked.
    pub fn is_locked(&self, index: usize) -> bool {
        self.state
            .lock()
            .devices
            .get(index)
            .is_some_and(|d| d.locked)
    }

    /// Number of open connections.
    pub fn open_sessions(&self) -> usize {
        self.state.lock().sessions.len()
    }
}

impl MockState {
    fn enter(&mut self, entry: EntryPoint) -> Option<Int32> {
        self.calls.push(entry);
        let forced = self.failures.get(&entry).copied();
        if let Some(code) = forced {
            debug!(entry = %entry, code, "MockDriver: forced status");
        }
        forced
    }

    fn device_index(&self, device_no: Int32) -> Option<usize> {
        usize::try_from(device_no)
            .ok()
            .filter(|&i| i < self.devices.len())
    }

    fn axis_mut(&mut self, handle: Int32, axis: Int32) -> Result<&mut AxisState, Int32> {
        if !self.sessions.contains_key(&handle) {
            return Err(NCB_NOT_CONNECTED);
        }
        if !(0..MOCK_AXES).contains(&axis) {
            return Err(NCB_INVALID_PARAM);
        }
        Ok(self.axes.entry((handle, axis)).or_default())
    }

    fn control(
        &mut self,
        entry: EntryPoint,
        handle: Int32,
        axis: Int32,
        value: &mut Int32,
        set: Bln32,
    ) -> Int32 {
        if let Some(code) = self.enter(entry) {
            return code;
        }
        let state = match self.axis_mut(handle, axis) {
            Ok(state) => state,
            Err(code) => return code,
        };
        let slot = match entry {
            EntryPoint::ControlAmplitude => &mut state.amplitude,
            _ => &mut state.frequency,
        };
        if set != 0 {
            *slot = *value;
        } else {
            *value = *slot;
        }
        NCB_OK
    }
}

impl EccDriver for MockDriver {
    fn check(&self) -> Int32 {
        let mut state = self.state.lock();
        state.calls.push(EntryPoint::Check);
        state
            .reported_count
            .unwrap_or(state.devices.len() as Int32)
    }

    fn get_device_info(&self, device_no: Int32, dev_id: &mut Int32, locked: &mut Bln32) -> Int32 {
        let mut state = self.state.lock();
        if let Some(code) = state.enter(EntryPoint::GetDeviceInfo) {
            return code;
        }
        let Some(index) = state.device_index(device_no) else {
            return NCB_INVALID_PARAM;
        };
        let device = state.devices[index];
        *dev_id = device.id;
        *locked = Bln32::from(device.locked);
        NCB_OK
    }

    fn connect(&self, device_no: Int32, device_handle: &mut Int32) -> Int32 {
        let mut state = self.state.lock();
        if let Some(code) = state.enter(EntryPoint::Connect) {
            return code;
        }
        let Some(index) = state.device_index(device_no) else {
            return NCB_INVALID_PARAM;
        };
        if state.devices[index].locked {
            return NCB_DEVICE_LOCKED;
        }
        state.devices[index].locked = true;

        let handle = state.next_handle;
        state.next_handle += 1;
        state.sessions.insert(handle, index);
        *device_handle = handle;
        debug!(device_no, handle, "MockDriver: connected");
        NCB_OK
    }

    fn close(&self, device_handle: Int32) -> Int32 {
        let mut state = self.state.lock();
        if let Some(code) = state.enter(EntryPoint::Close) {
            return code;
        }
        let Some(index) = state.sessions.remove(&device_handle) else {
            return NCB_NOT_CONNECTED;
        };
        state.devices[index].locked = false;
        state.axes.retain(|(h, _), _| *h != device_handle);
        debug!(handle = device_handle, "MockDriver: closed");
        NCB_OK
    }

    fn control_amplitude(
        &self,
        device_handle: Int32,
        axis: Int32,
        amplitude: &mut Int32,
        set: Bln32,
    ) -> Int32 {
        self.state
            .lock()
            .control(EntryPoint::ControlAmplitude, device_handle, axis, amplitude, set)
    }

    fn control_frequency(
        &self,
        device_handle: Int32,
        axis: Int32,
        frequency: &mut Int32,
        set: Bln32,
    ) -> Int32 {
        self.state
            .lock()
            .control(EntryPoint::ControlFrequency, device_handle, axis, frequency, set)
    }

    fn set_single_step(&self, device_handle: Int32, axis: Int32, backward: Bln32) -> Int32 {
        let mut state = self.state.lock();
        if let Some(code) = state.enter(EntryPoint::SetSingleStep) {
            return code;
        }
        match state.axis_mut(device_handle, axis) {
            Ok(axis_state) => {
                axis_state.steps += if backward != 0 { -1 } else { 1 };
                NCB_OK
            }
            Err(code) => code,
        }
    }
}
