//! FFI bindings for the attocube ECC100 controller library.
//!
//! The ECC100 driver is distributed as a prebuilt shared library (`ecc.dll` on
//! Windows) together with a C header. Only the entry points needed for
//! connection management and single-step motion are declared here. Every
//! function takes and returns 32-bit integers; booleans are passed as `Bln32`
//! and results come back through out-pointers.
//!
//! The library is opened at runtime with [`EccLibrary::load`]. All symbols are
//! resolved up front so a driver build missing an entry point fails at load
//! time rather than in the middle of an experiment.
//!
//! ```rust,ignore
//! use ecc_sys::{EccLibrary, NCB_OK};
//!
//! let lib = EccLibrary::load(EccLibrary::default_path())?;
//! let count = lib.check();
//! let mut handle = 0;
//! if lib.connect(0, &mut handle) == NCB_OK {
//!     lib.set_single_step(handle, 0, 0);
//!     lib.close(handle);
//! }
//! ```

use std::ffi::c_void;
use std::path::{Path, PathBuf};
use std::ptr;

use libloading::Library;
use thiserror::Error;

/// 32-bit signed integer as used throughout the vendor header.
pub type Int32 = i32;

/// 32-bit boolean as used throughout the vendor header (0 = false).
pub type Bln32 = i32;

// Status codes returned by every entry point.

/// No error.
pub const NCB_OK: Int32 = 0;
/// Unspecified error.
pub const NCB_ERROR: Int32 = -1;
/// Communication timeout.
pub const NCB_TIMEOUT: Int32 = 1;
/// No active connection to the device.
pub const NCB_NOT_CONNECTED: Int32 = 2;
/// Error in communication with the driver.
pub const NCB_DRIVER_ERROR: Int32 = 3;
/// Device is already in use by another process.
pub const NCB_DEVICE_LOCKED: Int32 = 7;
/// Parameter out of range.
pub const NCB_INVALID_PARAM: Int32 = 11;
/// Feature not available on this device or firmware.
pub const NCB_FEATURE_NOT_AVAILABLE: Int32 = 12;

/// `Int32 ECC_Check(EccInfo** info)`
pub type EccCheckFn = unsafe extern "C" fn(info: *mut *mut c_void) -> Int32;
/// `Int32 ECC_getDeviceInfo(Int32 deviceNo, Int32* devId, Bln32* locked)`
pub type EccGetDeviceInfoFn =
    unsafe extern "C" fn(device_no: Int32, dev_id: *mut Int32, locked: *mut Bln32) -> Int32;
/// `Int32 ECC_Connect(Int32 deviceNo, Int32* deviceHandle)`
pub type EccConnectFn = unsafe extern "C" fn(device_no: Int32, device_handle: *mut Int32) -> Int32;
/// `Int32 ECC_Close(Int32 deviceHandle)`
pub type EccCloseFn = unsafe extern "C" fn(device_handle: Int32) -> Int32;
/// `Int32 ECC_controlAmplitude(Int32 deviceHandle, Int32 axis, Int32* amplitude, Bln32 set)`
pub type EccControlAmplitudeFn = unsafe extern "C" fn(
    device_handle: Int32,
    axis: Int32,
    amplitude: *mut Int32,
    set: Bln32,
) -> Int32;
/// `Int32 ECC_controlFrequency(Int32 deviceHandle, Int32 axis, Int32* frequency, Bln32 set)`
pub type EccControlFrequencyFn = unsafe extern "C" fn(
    device_handle: Int32,
    axis: Int32,
    frequency: *mut Int32,
    set: Bln32,
) -> Int32;
/// `Int32 ECC_setSingleStep(Int32 deviceHandle, Int32 axis, Bln32 backward)`
pub type EccSetSingleStepFn =
    unsafe extern "C" fn(device_handle: Int32, axis: Int32, backward: Bln32) -> Int32;

/// Exported symbol names.
pub mod symbols {
    /// Device enumeration.
    pub const CHECK: &str = "ECC_Check";
    /// Per-slot id and lock state.
    pub const GET_DEVICE_INFO: &str = "ECC_getDeviceInfo";
    /// Open and lock a device.
    pub const CONNECT: &str = "ECC_Connect";
    /// Release a device.
    pub const CLOSE: &str = "ECC_Close";
    /// Step amplitude (mV), read or write.
    pub const CONTROL_AMPLITUDE: &str = "ECC_controlAmplitude";
    /// Step frequency (mHz), read or write.
    pub const CONTROL_FREQUENCY: &str = "ECC_controlFrequency";
    /// Single step in either direction.
    pub const SET_SINGLE_STEP: &str = "ECC_setSingleStep";

    /// Every symbol [`super::EccLibrary::load`] resolves.
    pub const ALL: [&str; 7] = [
        CHECK,
        GET_DEVICE_INFO,
        CONNECT,
        CLOSE,
        CONTROL_AMPLITUDE,
        CONTROL_FREQUENCY,
        SET_SINGLE_STEP,
    ];
}

/// File name of the driver library on the current platform.
#[cfg(target_os = "windows")]
pub const DEFAULT_LIBRARY: &str = "ecc.dll";
/// File name of the driver library on the current platform.
#[cfg(target_os = "macos")]
pub const DEFAULT_LIBRARY: &str = "libecc.dylib";
/// File name of the driver library on the current platform.
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
pub const DEFAULT_LIBRARY: &str = "libecc.so";

/// Failure to open the driver library or resolve one of its entry points.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The shared library could not be opened.
    #[error("failed to open driver library {}: {source}", .path.display())]
    Open {
        /// Path that was passed to the loader.
        path: PathBuf,
        /// Loader error.
        #[source]
        source: libloading::Error,
    },

    /// The library opened but does not export a required symbol.
    #[error("driver library {} does not export {symbol}: {source}", .path.display())]
    MissingSymbol {
        /// Path of the opened library.
        path: PathBuf,
        /// Name of the missing symbol.
        symbol: &'static str,
        /// Loader error.
        #[source]
        source: libloading::Error,
    },
}

/// An opened ECC driver library with all entry points resolved.
///
/// The function pointers are only valid while `_library` is alive, which is
/// why they never leave this struct.
pub struct EccLibrary {
    check: EccCheckFn,
    get_device_info: EccGetDeviceInfoFn,
    connect: EccConnectFn,
    close: EccCloseFn,
    control_amplitude: EccControlAmplitudeFn,
    control_frequency: EccControlFrequencyFn,
    set_single_step: EccSetSingleStepFn,
    path: PathBuf,
    _library: Library,
}

impl std::fmt::Debug for EccLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EccLibrary")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl EccLibrary {
    /// Platform default library path, resolved through the loader search path.
    pub fn default_path() -> PathBuf {
        PathBuf::from(DEFAULT_LIBRARY)
    }

    /// Open the driver library at `path` and resolve every entry point.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref().to_path_buf();

        // SAFETY: opening the library runs its initialisers. The vendor driver
        // is trusted in the same way a linked C dependency would be.
        let library = unsafe { Library::new(&path) }.map_err(|source| LoadError::Open {
            path: path.clone(),
            source,
        })?;

        let lib = Self {
            check: resolve(&library, &path, symbols::CHECK)?,
            get_device_info: resolve(&library, &path, symbols::GET_DEVICE_INFO)?,
            connect: resolve(&library, &path, symbols::CONNECT)?,
            close: resolve(&library, &path, symbols::CLOSE)?,
            control_amplitude: resolve(&library, &path, symbols::CONTROL_AMPLITUDE)?,
            control_frequency: resolve(&library, &path, symbols::CONTROL_FREQUENCY)?,
            set_single_step: resolve(&library, &path, symbols::SET_SINGLE_STEP)?,
            path,
            _library: library,
        };

        tracing::info!(path = %lib.path.display(), "ECC driver library loaded");
        Ok(lib)
    }

    /// Path the library was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `ECC_Check(NULL)`: number of attached devices.
    pub fn check(&self) -> Int32 {
        // SAFETY: the driver accepts NULL for the info list.
        unsafe { (self.check)(ptr::null_mut()) }
    }

    /// `ECC_getDeviceInfo`: writes the device id and lock flag of one slot.
    pub fn get_device_info(&self, device_no: Int32, dev_id: &mut Int32, locked: &mut Bln32) -> Int32 {
        // SAFETY: both out-pointers come from live mutable references.
        unsafe { (self.get_device_info)(device_no, dev_id, locked) }
    }

    /// `ECC_Connect`: opens a device and writes its handle.
    pub fn connect(&self, device_no: Int32, device_handle: &mut Int32) -> Int32 {
        // SAFETY: the out-pointer comes from a live mutable reference.
        unsafe { (self.connect)(device_no, device_handle) }
    }

    /// `ECC_Close`: releases the device lock.
    pub fn close(&self, device_handle: Int32) -> Int32 {
        // SAFETY: plain integer arguments only.
        unsafe { (self.close)(device_handle) }
    }

    /// `ECC_controlAmplitude`: writes `amplitude` when `set != 0`, otherwise
    /// reads the current value back into it.
    pub fn control_amplitude(
        &self,
        device_handle: Int32,
        axis: Int32,
        amplitude: &mut Int32,
        set: Bln32,
    ) -> Int32 {
        // SAFETY: the in/out pointer comes from a live mutable reference.
        unsafe { (self.control_amplitude)(device_handle, axis, amplitude, set) }
    }

    /// `ECC_controlFrequency`: writes `frequency` when `set != 0`, otherwise
    /// reads the current value back into it.
    pub fn control_frequency(
        &self,
        device_handle: Int32,
        axis: Int32,
        frequency: &mut Int32,
        set: Bln32,
    ) -> Int32 {
        // SAFETY: the in/out pointer comes from a live mutable reference.
        unsafe { (self.control_frequency)(device_handle, axis, frequency, set) }
    }

    /// `ECC_setSingleStep`: one step, backward when `backward != 0`.
    pub fn set_single_step(&self, device_handle: Int32, axis: Int32, backward: Bln32) -> Int32 {
        // SAFETY: plain integer arguments only.
        unsafe { (self.set_single_step)(device_handle, axis, backward) }
    }
}

fn resolve<T: Copy>(library: &Library, path: &Path, symbol: &'static str) -> Result<T, LoadError> {
    // SAFETY: `T` is one of the function pointer aliases above, each matching
    // the prototype in the vendor header.
    let sym = unsafe { library.get::<T>(symbol.as_bytes()) }.map_err(|source| {
        LoadError::MissingSymbol {
            path: path.to_path_buf(),
            symbol,
            source,
        }
    })?;
    Ok(*sym)
}
