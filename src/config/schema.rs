//! Configuration schema definitions.
//!
//! This module defines the structure of `trx.toml` using serde.
//! Every section has defaults, so an empty file is a valid configuration.

use super::error::{ConfigError, ConfigResult};
use crate::line::{FramingOptions, DEFAULT_MAX_LINE_LENGTH, DEFAULT_READ_CHUNK_SIZE};
use crate::port::{timeout_from_secs, BaudRate, LineLimit};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Fallbacks for settings neither the CLI nor a device profile gave
    pub defaults: DefaultsConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Line framing limits
    pub framing: FramingConfig,
    /// Extra directories searched for device profiles and command files
    pub search: SearchConfig,
}

impl Config {
    /// Check every value that serde could not check on its own.
    pub fn validate(&self) -> ConfigResult<()> {
        self.defaults.timeout()?;
        self.defaults.count()?;
        self.framing.options()?;
        Ok(())
    }
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Response timeout in seconds
    pub timeout: f64,
    /// Maximum response lines per command, -1 for unbounded
    pub count: i64,
    /// Baud rate used when none is given
    pub baudrate: Option<BaudRate>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            timeout: 1.0,
            count: -1,
            baudrate: None,
        }
    }
}

impl DefaultsConfig {
    pub fn timeout(&self) -> ConfigResult<Duration> {
        timeout_from_secs(self.timeout).ok_or_else(|| {
            ConfigError::validation("defaults.timeout", format!("{} is not a positive number", self.timeout))
        })
    }

    pub fn count(&self) -> ConfigResult<LineLimit> {
        self.count
            .to_string()
            .parse::<LineLimit>()
            .map_err(|e| ConfigError::validation("defaults.count", e.to_string()))
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Log format: "json", "pretty", "compact"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Compact,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format
    Json,
    /// Pretty format with colors
    Pretty,
    /// Compact format
    #[default]
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            other => Err(ConfigError::validation(
                "logging.format",
                format!("unknown format '{other}'"),
            )),
        }
    }
}

/// `[framing]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FramingConfig {
    /// Longest partial response line kept before it is dropped as malformed
    pub max_line_length: usize,
    /// Bytes requested per read
    pub read_chunk_size: usize,
}

impl Default for FramingConfig {
    fn default() -> Self {
        Self {
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
        }
    }
}

impl FramingConfig {
    pub fn options(&self) -> ConfigResult<FramingOptions> {
        if self.max_line_length == 0 {
            return Err(ConfigError::validation("framing.max_line_length", "must be positive"));
        }
        if self.read_chunk_size == 0 {
            return Err(ConfigError::validation("framing.read_chunk_size", "must be positive"));
        }
        Ok(FramingOptions {
            max_line_length: self.max_line_length,
            read_chunk_size: self.read_chunk_size,
        })
    }
}

/// `[search]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub extra_dirs: Vec<PathBuf>,
}
