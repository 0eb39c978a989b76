//! Scripting engine for driving the controller.
//!
//! Scripts are written in Rhai. A [`RhaiEngine`] created with
//! [`RhaiEngine::with_device`] exposes the binding as a global `ecc`.
//!
//! # Architecture
//!
//! ```text
//! RhaiEngine (operation limit, persistent scope)
//!     └── bindings
//!         ├── Ecc        global `ecc`: device_count(), devices(), connect(i)
//!         └── EccDevice  returned by connect(): set_amplitude, step_forward, close, ...
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ecc_control::binding::DeviceBinding;
//! use ecc_control::driver::MockDriver;
//! use ecc_control::scripting::RhaiEngine;
//!
//! let binding = Arc::new(DeviceBinding::new(MockDriver::new(1)));
//! let mut engine = RhaiEngine::with_device(binding, 10_000);
//!
//! engine.execute_script(r#"
//!     let dev = ecc.connect(0);
//!     dev.set_amplitude(0, 30000);
//!     for i in 0..10 { dev.step_forward(0); }
//!     dev.close();
//! "#)?;
//! ```

pub mod bindings;
pub mod rhai_engine;

pub use bindings::{register_device_api, Ecc, EccDevice};
pub use rhai_engine::{RhaiEngine, ScriptError, DEFAULT_MAX_OPERATIONS};
