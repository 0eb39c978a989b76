//! Driver status codes.
//!
//! Every ECC entry point returns an `Int32` status. [`Status`] is the closed
//! set of codes the driver documents, with [`Status::Unknown`] as the explicit
//! fallback for anything else. [`check`] is the single place where a status is
//! turned into an error.

use std::fmt;

use ecc_sys::{
    NCB_DEVICE_LOCKED, NCB_DRIVER_ERROR, NCB_ERROR, NCB_FEATURE_NOT_AVAILABLE, NCB_INVALID_PARAM,
    NCB_NOT_CONNECTED, NCB_OK, NCB_TIMEOUT,
};

use crate::driver::EntryPoint;
use crate::error::{AppResult, EccError};

/// Outcome of a native call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Call succeeded.
    Ok,
    /// Unspecified error.
    Error,
    /// Communication timeout.
    Timeout,
    /// No active connection to the device.
    NotConnected,
    /// Error in communication with the driver.
    DriverError,
    /// Device is locked by another process.
    DeviceLocked,
    /// Parameter out of range.
    InvalidParam,
    /// Feature not available.
    FeatureNotAvailable,
    /// Any code outside the documented set.
    Unknown(i32),
}

impl Status {
    /// All documented codes, `Ok` included.
    pub const KNOWN: [Status; 8] = [
        Status::Ok,
        Status::Error,
        Status::Timeout,
        Status::NotConnected,
        Status::DriverError,
        Status::DeviceLocked,
        Status::InvalidParam,
        Status::FeatureNotAvailable,
    ];

    /// Map a raw driver code.
    pub fn from_code(code: i32) -> Self {
        match code {
            NCB_OK => Status::Ok,
            NCB_ERROR => Status::Error,
            NCB_TIMEOUT => Status::Timeout,
            NCB_NOT_CONNECTED => Status::NotConnected,
            NCB_DRIVER_ERROR => Status::DriverError,
            NCB_DEVICE_LOCKED => Status::DeviceLocked,
            NCB_INVALID_PARAM => Status::InvalidParam,
            NCB_FEATURE_NOT_AVAILABLE => Status::FeatureNotAvailable,
            other => Status::Unknown(other),
        }
    }

    /// Raw driver code.
    pub fn code(self) -> i32 {
        match self {
            Status::Ok => NCB_OK,
            Status::Error => NCB_ERROR,
            Status::Timeout => NCB_TIMEOUT,
            Status::NotConnected => NCB_NOT_CONNECTED,
            Status::DriverError => NCB_DRIVER_ERROR,
            Status::DeviceLocked => NCB_DEVICE_LOCKED,
            Status::InvalidParam => NCB_INVALID_PARAM,
            Status::FeatureNotAvailable => NCB_FEATURE_NOT_AVAILABLE,
            Status::Unknown(code) => code,
        }
    }

    /// Human-readable cause. Empty for `Ok`.
    pub fn message(self) -> &'static str {
        match self {
            Status::Ok => "",
            Status::Error => "Unspecified error",
            Status::Timeout => "Communication timeout",
            Status::NotConnected => "No active connection to device",
            Status::DriverError => "Error in communication with driver",
            Status::DeviceLocked => "Device is already in use by another",
            Status::InvalidParam => "Parameter out of range",
            Status::FeatureNotAvailable => "Feature not available",
            Status::Unknown(_) => "Unknown error code",
        }
    }

    /// True only for `Ok`.
    pub fn is_ok(self) -> bool {
        self == Status::Ok
    }
}

impl From<i32> for Status {
    fn from(code: i32) -> Self {
        Status::from_code(code)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Turn the status returned by `entry` into a result.
pub fn check(entry: EntryPoint, code: i32) -> AppResult<()> {
    match Status::from_code(code) {
        Status::Ok => Ok(()),
        status => Err(EccError::Call { entry, status }),
    }
}
