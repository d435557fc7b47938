//! Configuration loading traits and types.
//!
//! Every pivot binary reads one TOML file. Sections are plain serde structs;
//! the [`ConfigLoader`] blanket trait turns a path into a parsed struct and
//! [`ConfigLoader::load_validated`] additionally runs the [`Validate`] rules.
//!
//! # Usage
//!
//! ```rust,no_run
//! use pivot_common::config::{ConfigError, ConfigLoader};
//! use pivot_common::rotation::PivotConfig;
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = PivotConfig::load_validated(Path::new("config/pivot.toml"))?;
//!     println!("Service: {}", config.shared.service_name);
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    /// File exists but could not be read.
    #[error("Failed to read configuration: {0}")]
    ReadError(String),

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, per-cycle detail.
    Trace,
    /// Target changes and state transitions.
    Debug,
    /// Lifecycle events.
    #[default]
    Info,
    /// Faults and overruns.
    Warn,
    /// Fatal problems only.
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub const fn as_directive(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Fields common to every pivot service.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "shooter-pivot"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Instance identifier, included in log output.
    pub service_name: String,
}

/// Semantic validation hook run after parsing.
pub trait Validate {
    /// Check value ranges and cross-field rules.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` naming the offending field.
    fn validate(&self) -> Result<(), ConfigError>;
}

impl Validate for SharedConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "shared.service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Trait for loading configuration from TOML files.
///
/// Blanket-implemented for every `DeserializeOwned` type.
///
/// # Contract
///
/// - `ConfigError::FileNotFound` if the file does not exist
/// - `ConfigError::ParseError` if TOML syntax or shape is invalid
/// - `ConfigError::ValidationError` if [`Validate`] rejects the values
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Parse configuration from a TOML string.
    fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound(path.display().to_string())
            } else {
                ConfigError::ReadError(format!("{}: {e}", path.display()))
            }
        })?;

        Self::from_toml_str(&content)
    }

    /// Load and validate in one step.
    fn load_validated(path: &Path) -> Result<Self, ConfigError>
    where
        Self: Validate,
    {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }
}

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}
