//! Configuration using Figment
//!
//! Configuration is loaded from (in order of precedence):
//! 1. Environment variables prefixed with `ECC_` (`__` separates nested keys)
//! 2. TOML configuration file (default: `config/ecc.toml`, optional)
//! 3. Built-in defaults
//!
//! # Example file
//!
//! ```toml
//! [driver]
//! library_path = 'C:\Code\Software_ECC100_1.6.8\ECC100_DLL\Win64\ecc.dll'
//!
//! [device]
//! index = 0
//!
//! [scripting]
//! max_operations = 100000
//!
//! [logging]
//! level = "debug"
//! ```
//!
//! # Environment Variables
//!
//! ```text
//! ECC_DRIVER__LIBRARY_PATH=/opt/attocube/lib/libecc.so
//! ECC_DEVICE__INDEX=1
//! ECC_LOGGING__LEVEL=debug
//! ```

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppResult, EccError};
use crate::scripting::DEFAULT_MAX_OPERATIONS;

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "config/ecc.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EccConfig {
    /// Driver library settings
    #[serde(default)]
    pub driver: DriverConfig,
    /// Device selection
    #[serde(default)]
    pub device: DeviceConfig,
    /// Script engine limits
    #[serde(default)]
    pub scripting: ScriptingConfig,
    /// Logging
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where to find the vendor library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Path to `ecc.dll` / `libecc.so`
    #[serde(default = "default_library_path")]
    pub library_path: PathBuf,
}

/// Which device slot to use.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Fixed slot index; when unset the operator is prompted if more than one
    /// device is attached.
    #[serde(default)]
    pub index: Option<i32>,
}

/// Script engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptingConfig {
    /// Maximum Rhai operations per script run
    #[serde(default = "default_max_operations")]
    pub max_operations: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level (trace, debug, info, warn, error); `RUST_LOG` wins
    #[serde(default = "default_log_level")]
    pub level: String,
}

// ============================================================================
// Default value functions
// ============================================================================

fn default_library_path() -> PathBuf {
    ecc_sys::EccLibrary::default_path()
}

fn default_max_operations() -> u64 {
    DEFAULT_MAX_OPERATIONS
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            library_path: default_library_path(),
        }
    }
}

impl Default for ScriptingConfig {
    fn default() -> Self {
        Self {
            max_operations: default_max_operations(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ============================================================================
// Configuration Loading and Validation
// ============================================================================

impl EccConfig {
    /// Load from [`DEFAULT_CONFIG_PATH`] (if present) and the environment.
    pub fn load() -> AppResult<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load from a specific file (skipped if missing) and the environment,
    /// then validate.
    pub fn load_from<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let config = Self::figment(path.as_ref()).extract::<Self>()?;
        config.validate()?;
        Ok(config)
    }

    /// Provider stack used by [`EccConfig::load_from`].
    pub fn figment(path: &Path) -> Figment {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("ECC_").split("__"))
    }

    /// Check values that parse but make no sense.
    pub fn validate(&self) -> AppResult<()> {
        if self.driver.library_path.as_os_str().is_empty() {
            return Err(EccError::Configuration(
                "driver.library_path cannot be empty".to_string(),
            ));
        }

        if self.scripting.max_operations == 0 {
            return Err(EccError::Configuration(
                "scripting.max_operations must be greater than 0".to_string(),
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(EccError::Configuration(format!(
                "Invalid logging.level '{}'. Must be one of: {}",
                self.logging.level,
                valid_levels.join(", ")
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn extract(path: &Path) -> AppResult<EccConfig> {
        // Toml only, so the host environment cannot leak into assertions.
        let config: EccConfig = Figment::new().merge(Toml::file(path)).extract()?;
        config.validate()?;
        Ok(config)
    }

    #[test]
    fn test_defaults() {
        let config = EccConfig::default();
        assert_eq!(config.driver.library_path, PathBuf::from(ecc_sys::DEFAULT_LIBRARY));
        assert_eq!(config.device.index, None);
        assert_eq!(config.scripting.max_operations, DEFAULT_MAX_OPERATIONS);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = extract(Path::new("/nonexistent/ecc.toml")).unwrap();
        assert_eq!(config, EccConfig::default());
    }

    #[test]
    fn test_load_file() {
        let file = write_config(
            r#"
            [driver]
            library_path = "/opt/attocube/libecc.so"

            [device]
            index = 1

            [logging]
            level = "debug"
            "#,
        );
        let config = extract(file.path()).unwrap();
        assert_eq!(config.driver.library_path, PathBuf::from("/opt/attocube/libecc.so"));
        assert_eq!(config.device.index, Some(1));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.scripting.max_operations, DEFAULT_MAX_OPERATIONS);
    }

    #[test]
    fn test_invalid_log_level() {
        let file = write_config("[logging]\nlevel = \"loud\"\n");
        let err = extract(file.path()).unwrap_err();
        assert!(matches!(err, EccError::Configuration(_)));
        assert!(err.to_string().contains("loud"));
    }

    #[test]
    fn test_zero_operation_limit() {
        let file = write_config("[scripting]\nmax_operations = 0\n");
        assert!(matches!(
            extract(file.path()),
            Err(EccError::Configuration(_))
        ));
    }

    #[test]
    fn test_malformed_file() {
        let file = write_config("[device]\nindex = \"zero\"\n");
        assert!(matches!(extract(file.path()), Err(EccError::Config(_))));
    }
}
