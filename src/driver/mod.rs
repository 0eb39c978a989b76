//! The native driver seam.
//!
//! [`EccDriver`] mirrors the seven ECC entry points one-to-one: raw `Int32`
//! arguments, out-parameters as `&mut`, raw status codes back. Nothing here
//! interprets a status; that happens in [`crate::binding`].
//!
//! Two implementations exist:
//!
//! - [`ecc_sys::EccLibrary`], the vendor library opened at runtime
//! - [`mock::MockDriver`], a simulated controller for tests and dry runs

pub mod mock;

use std::fmt;
use std::sync::Arc;

use ecc_sys::{Bln32, EccLibrary, Int32};

pub use mock::{MockDevice, MockDriver};

/// One native entry point, used as error context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryPoint {
    /// `ECC_Check`
    Check,
    /// `ECC_getDeviceInfo`
    GetDeviceInfo,
    /// `ECC_Connect`
    Connect,
    /// `ECC_Close`
    Close,
    /// `ECC_controlAmplitude`
    ControlAmplitude,
    /// `ECC_controlFrequency`
    ControlFrequency,
    /// `ECC_setSingleStep`
    SetSingleStep,
}

impl EntryPoint {
    /// Operation name used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            EntryPoint::Check => "check",
            EntryPoint::GetDeviceInfo => "get_device_info",
            EntryPoint::Connect => "connect",
            EntryPoint::Close => "close",
            EntryPoint::ControlAmplitude => "control_amplitude",
            EntryPoint::ControlFrequency => "control_frequency",
            EntryPoint::SetSingleStep => "set_single_step",
        }
    }

    /// Exported symbol in the driver library.
    pub fn symbol(self) -> &'static str {
        use ecc_sys::symbols;
        match self {
            EntryPoint::Check => symbols::CHECK,
            EntryPoint::GetDeviceInfo => symbols::GET_DEVICE_INFO,
            EntryPoint::Connect => symbols::CONNECT,
            EntryPoint::Close => symbols::CLOSE,
            EntryPoint::ControlAmplitude => symbols::CONTROL_AMPLITUDE,
            EntryPoint::ControlFrequency => symbols::CONTROL_FREQUENCY,
            EntryPoint::SetSingleStep => symbols::SET_SINGLE_STEP,
        }
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw access to the ECC driver entry points.
///
/// Implementations must not interpret status codes or touch out-parameters
/// beyond what the vendor contract says; callers check the returned status
/// before reading them.
pub trait EccDriver: Send + Sync {
    /// `ECC_Check(NULL)`: attached device count.
    fn check(&self) -> Int32;

    /// `ECC_getDeviceInfo`
    fn get_device_info(&self, device_no: Int32, dev_id: &mut Int32, locked: &mut Bln32) -> Int32;

    /// `ECC_Connect`
    fn connect(&self, device_no: Int32, device_handle: &mut Int32) -> Int32;

    /// `ECC_Close`
    fn close(&self, device_handle: Int32) -> Int32;

    /// `ECC_controlAmplitude`; `set != 0` writes, otherwise reads back.
    fn control_amplitude(
        &self,
        device_handle: Int32,
        axis: Int32,
        amplitude: &mut Int32,
        set: Bln32,
    ) -> Int32;

    /// `ECC_controlFrequency`; `set != 0` writes, otherwise reads back.
    fn control_frequency(
        &self,
        device_handle: Int32,
        axis: Int32,
        frequency: &mut Int32,
        set: Bln32,
    ) -> Int32;

    /// `ECC_setSingleStep`
    fn set_single_step(&self, device_handle: Int32, axis: Int32, backward: Bln32) -> Int32;
}

/// Shared drivers, e.g. a mock a test still inspects after binding it.
impl<D: EccDriver + ?Sized> EccDriver for Arc<D> {
    fn check(&self) -> Int32 {
        (**self).check()
    }

    fn get_device_info(&self, device_no: Int32, dev_id: &mut Int32, locked: &mut Bln32) -> Int32 {
        (**self).get_device_info(device_no, dev_id, locked)
    }

    fn connect(&self, device_no: Int32, device_handle: &mut Int32) -> Int32 {
        (**self).connect(device_no, device_handle)
    }

    fn close(&self, device_handle: Int32) -> Int32 {
        (**self).close(device_handle)
    }

    fn control_amplitude(
        &self,
        device_handle: Int32,
        axis: Int32,
        amplitude: &mut Int32,
        set: Bln32,
    ) -> Int32 {
        (**self).control_amplitude(device_handle, axis, amplitude, set)
    }

    fn control_frequency(
        &self,
        device_handle: Int32,
        axis: Int32,
        frequency: &mut Int32,
        set: Bln32,
    ) -> Int32 {
        (**self).control_frequency(device_handle, axis, frequency, set)
    }

    fn set_single_step(&self, device_handle: Int32, axis: Int32, backward: Bln32) -> Int32 {
        (**self).set_single_step(device_handle, axis, backward)
    }
}

impl EccDriver for EccLibrary {
    fn check(&self) -> Int32 {
        EccLibrary::check(self)
    }

    fn get_device_info(&self, device_no: Int32, dev_id: &mut Int32, locked: &mut Bln32) -> Int32 {
        EccLibrary::get_device_info(self, device_no, dev_id, locked)
    }

    fn connect(&self, device_no: Int32, device_handle: &mut Int32) -> Int32 {
        EccLibrary::connect(self, device_no, device_handle)
    }

    fn close(&self, device_handle: Int32) -> Int32 {
        EccLibrary::close(self, device_handle)
    }

    fn control_amplitude(
        &self,
        device_handle: Int32,
        axis: Int32,
        amplitude: &mut Int32,
        set: Bln32,
    ) -> Int32 {
        EccLibrary::control_amplitude(self, device_handle, axis, amplitude, set)
    }

    fn control_frequency(
        &self,
        device_handle: Int32,
        axis: Int32,
        frequency: &mut Int32,
        set: Bln32,
    ) -> Int32 {
        EccLibrary::control_frequency(self, device_handle, axis, frequency, set)
    }

    fn set_single_step(&self, device_handle: Int32, axis: Int32, backward: Bln32) -> Int32 {
        EccLibrary::set_single_step(self, device_handle, axis, backward)
    }
}
