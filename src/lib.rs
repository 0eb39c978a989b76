//! Core library for the ecc_control application.
//!
//! This library binds the attocube ECC100 motion-controller driver: it loads
//! the vendor library, forwards calls to its entry points and turns their
//! status codes into errors. It is used by the command line tool and by Rhai
//! scripts.

pub mod binding;
pub mod config;
pub mod driver;
pub mod error;
pub mod scripting;
pub mod select;
pub mod status;

pub use binding::{ConnectionHandle, DeviceBinding, DeviceInfo};
pub use error::{AppResult, EccError};
pub use status::Status;
