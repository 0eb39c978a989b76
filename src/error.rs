//! Custom error types for the binding.
//!
//! `EccError` is the single error type returned by the device binding, the
//! configuration loader and the device-selection helper. Using the `thiserror`
//! crate keeps every failure printable in the same `Error calling ...` style
//! the driver status table produces.
//!
//! ## Error Hierarchy
//!
//! - **`Call`**: a native entry point returned a non-success status. Carries the
//!   entry point and the resolved [`Status`], so callers can match on either.
//! - **`NoDevices`**: enumeration reported no attached controllers.
//! - **`Library`**: the driver library could not be opened or is missing an
//!   entry point.
//! - **`Config`** / **`Configuration`**: parse errors from `figment` and semantic
//!   errors caught during validation.
//! - **`InvalidSelection`**: the operator typed something that is not a device
//!   index at the selection prompt.
//! - **`Io`**: terminal I/O around the prompt.
//!
//! Closing a connection never produces an error; see
//! [`DeviceBinding::disconnect`](crate::binding::DeviceBinding::disconnect).

use thiserror::Error;

use crate::driver::EntryPoint;
use crate::status::Status;

/// Convenience alias for results using the binding error type.
pub type AppResult<T> = std::result::Result<T, EccError>;

/// Errors raised by the binding layer.
#[derive(Error, Debug)]
pub enum EccError {
    /// A driver call returned a non-success status.
    #[error("Error calling {entry}: {status}")]
    Call {
        /// Entry point that failed.
        entry: EntryPoint,
        /// Status it returned.
        status: Status,
    },

    /// No controller is attached.
    #[error("No devices found")]
    NoDevices,

    /// Loading the driver library failed.
    #[error("Driver library error: {0}")]
    Library(#[from] ecc_sys::LoadError),

    /// Configuration could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// Configuration parsed but holds an invalid value.
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// Input at the selection prompt was not an integer.
    #[error("Invalid device selection: {0:?}")]
    InvalidSelection(String),

    /// Terminal I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EccError {
    /// Driver status behind the error.
    ///
    /// An empty enumeration counts as [`Status::DriverError`].
    pub fn status(&self) -> Option<Status> {
        match self {
            EccError::Call { status, .. } => Some(*status),
            EccError::NoDevices => Some(Status::DriverError),
            _ => None,
        }
    }

    /// Failing entry point, for `Call` errors.
    pub fn entry(&self) -> Option<EntryPoint> {
        match self {
            EccError::Call { entry, .. } => Some(*entry),
            _ => None,
        }
    }
}

impl From<figment::Error> for EccError {
    fn from(err: figment::Error) -> Self {
        EccError::Config(Box::new(err))
    }
}
