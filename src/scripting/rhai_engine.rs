//! Rhai script engine.
//!
//! Wraps a Rhai `Engine` and a persistent `Scope`. Variables defined by one
//! script stay visible to the next, so an interactive session can connect in
//! one call and step in the following ones.
//!
//! # Safety Limits
//!
//! Every engine carries an operation limit (10,000 by default). A script that
//! exceeds it is terminated with a `RuntimeError` mentioning "Safety limit".

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rhai::{Dynamic, Engine, EvalAltResult, Scope};
use thiserror::Error;

use super::bindings::{self, Ecc};
use crate::binding::DeviceBinding;

/// Default maximum number of operations per script run.
pub const DEFAULT_MAX_OPERATIONS: u64 = 10_000;

/// Errors that can occur while compiling or running a script.
#[derive(Debug, Clone, Error)]
pub enum ScriptError {
    /// Compilation or parsing error
    #[error("Compilation error at line {line:?}, column {column:?}: {message}")]
    CompilationError {
        /// Parser message
        message: String,
        /// Line, if known
        line: Option<usize>,
        /// Column, if known
        column: Option<usize>,
    },

    /// Runtime execution error, including binding failures
    #[error("Runtime error: {message}")]
    RuntimeError {
        /// Error text
        message: String,
    },

    /// Type conversion error between Rust and script types
    #[error("Type conversion error: expected {expected}, found {found}")]
    TypeConversionError {
        /// Expected type name
        expected: String,
        /// Actual type name
        found: String,
    },

    /// Variable not found in global scope
    #[error("Variable not found: {name}")]
    VariableNotFound {
        /// Variable name
        name: String,
    },

    /// Script file could not be read
    #[error("Failed to read script {}: {message}", .path.display())]
    Io {
        /// Script path
        path: PathBuf,
        /// I/O error text
        message: String,
    },
}

/// Rhai-based script engine.
pub struct RhaiEngine {
    engine: Engine,
    scope: Scope<'static>,
}

impl RhaiEngine {
    /// Create an engine with [`DEFAULT_MAX_OPERATIONS`].
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_MAX_OPERATIONS)
    }

    /// Create an engine with a custom operation limit.
    pub fn with_limit(max_operations: u64) -> Self {
        let mut engine = Engine::new();

        engine.on_progress(move |count| {
            if count > max_operations {
                Some(
                    format!(
                        "Safety limit exceeded: maximum {} operations",
                        max_operations
                    )
                    .into(),
                )
            } else {
                None
            }
        });

        Self {
            engine,
            scope: Scope::new(),
        }
    }

    /// Create an engine with the device API registered and `ecc` bound to
    /// `binding`.
    pub fn with_device(binding: Arc<DeviceBinding>, max_operations: u64) -> Self {
        let mut this = Self::with_limit(max_operations);
        bindings::register_device_api(&mut this.engine);
        this.scope.push(bindings::GLOBAL_NAME, Ecc::new(binding));
        this
    }

    /// Run a script against the persistent scope.
    pub fn execute_script(&mut self, script: &str) -> Result<Dynamic, ScriptError> {
        self.engine
            .eval_with_scope::<Dynamic>(&mut self.scope, script)
            .map_err(convert_rhai_error)
    }

    /// Read and run a script file.
    pub fn run_file(&mut self, path: &Path) -> Result<Dynamic, ScriptError> {
        let script = std::fs::read_to_string(path).map_err(|e| ScriptError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        tracing::info!(script = %path.display(), "Running script");
        self.execute_script(&script)
    }

    /// Compile without running.
    pub fn validate_script(&self, script: &str) -> Result<(), ScriptError> {
        self.engine.compile(script).map_err(|e| convert_rhai_error(e.into()))?;
        Ok(())
    }

    /// Define or shadow a global variable.
    pub fn set_global(&mut self, name: &str, value: Dynamic) {
        self.scope.push_dynamic(name.to_string(), value);
    }

    /// Read a global variable.
    pub fn get_global(&self, name: &str) -> Result<Dynamic, ScriptError> {
        self.scope
            .get_value::<Dynamic>(name)
            .ok_or_else(|| ScriptError::VariableNotFound {
                name: name.to_string(),
            })
    }

    /// Remove every global, `ecc` included.
    pub fn clear_globals(&mut self) {
        self.scope.clear();
    }
}

impl Default for RhaiEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert Rhai's EvalAltResult to our ScriptError type
fn convert_rhai_error(error: Box<EvalAltResult>) -> ScriptError {
    match *error {
        EvalAltResult::ErrorParsing(parse_error, pos) => ScriptError::CompilationError {
            message: format!("{}", parse_error),
            line: pos.line(),
            column: pos.position(),
        },
        EvalAltResult::ErrorRuntime(message, _) => ScriptError::RuntimeError {
            message: message.to_string(),
        },
        EvalAltResult::ErrorTerminated(token, _) => ScriptError::RuntimeError {
            message: token.to_string(),
        },
        EvalAltResult::ErrorMismatchDataType(expected, actual, _) => {
            ScriptError::TypeConversionError {
                expected,
                found: actual,
            }
        }
        other => ScriptError::RuntimeError {
            message: format!("{}", other),
        },
    }
}
