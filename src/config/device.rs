//! Port settings and the `key = value` device profile.
//!
//! ```text
//! # bench supply
//! port = /dev/ttyUSB0
//! baudrate = 19200
//! timeout = 0.5
//! count = 1
//! ```
//!
//! Values already set (normally from the command line) win over the profile.

use super::error::{ConfigError, ConfigResult};
use super::schema::DefaultsConfig;
use crate::port::{parse_timeout, BaudRate, LineLimit, PortConfiguration};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Lines of this length or longer are rejected in profiles and command files.
pub const MAX_FILE_LINE_LENGTH: usize = 80;

/// Port settings gathered from the command line and a device profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortSettings {
    pub port: Option<PathBuf>,
    pub baudrate: Option<BaudRate>,
    pub timeout: Option<Duration>,
    pub count: Option<LineLimit>,
}

impl PortSettings {
    /// Parse and store `value` under `key` unless the key already has a value.
    ///
    /// Returns `Ok(false)` for an unknown key or a key that was already set.
    pub fn set_if_unset(&mut self, key: &str, value: &str) -> ConfigResult<bool> {
        let invalid = |message: String| ConfigError::validation(key, message);
        match key {
            "port" if self.port.is_none() => {
                self.port = Some(PathBuf::from(value));
            }
            "baudrate" if self.baudrate.is_none() => {
                self.baudrate = Some(value.parse::<BaudRate>().map_err(|e| invalid(e.to_string()))?);
            }
            "timeout" if self.timeout.is_none() => {
                self.timeout = Some(parse_timeout(value).map_err(|e| invalid(e.to_string()))?);
            }
            "count" if self.count.is_none() => {
                self.count = Some(value.parse::<LineLimit>().map_err(|e| invalid(e.to_string()))?);
            }
            "port" | "baudrate" | "timeout" | "count" => return Ok(false),
            _ => {
                warn!(key, "ignoring unknown device profile key");
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Turn the gathered settings into a session configuration, taking what
    /// is still missing from `defaults`.
    pub fn into_configuration(self, defaults: &DefaultsConfig) -> ConfigResult<PortConfiguration> {
        let port = self
            .port
            .ok_or_else(|| ConfigError::MissingRequired("serial port".to_string()))?;
        let baudrate = self
            .baudrate
            .or(defaults.baudrate)
            .ok_or_else(|| ConfigError::MissingRequired("baudrate".to_string()))?;
        let timeout = match self.timeout {
            Some(timeout) => timeout,
            None => defaults.timeout()?,
        };
        let count = match self.count {
            Some(count) => count,
            None => defaults.count()?,
        };
        Ok(PortConfiguration::new(port, baudrate, timeout, count))
    }
}

/// Split `contents` into lines, rejecting any of `MAX_FILE_LINE_LENGTH`
/// characters or more (the newline counts). Yields `(line number, text)`.
pub(crate) fn bounded_lines<'a>(
    path: &'a Path,
    contents: &'a str,
) -> impl Iterator<Item = ConfigResult<(usize, &'a str)>> + 'a {
    contents
        .split_inclusive('\n')
        .enumerate()
        .map(move |(idx, raw)| {
            if raw.chars().count() >= MAX_FILE_LINE_LENGTH {
                return Err(ConfigError::LineTooLong {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    max: MAX_FILE_LINE_LENGTH,
                });
            }
            Ok((idx + 1, raw.trim_end_matches(['\n', '\r'])))
        })
}

/// Apply a device profile's contents to `settings`.
pub fn parse_device_profile(path: &Path, contents: &str, settings: &mut PortSettings) -> ConfigResult<()> {
    for entry in bounded_lines(path, contents) {
        let (number, line) = entry?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (key, value) = match line.split_once('=') {
            Some((key, value)) => (key.trim(), value.trim()),
            None => match line.split_once(char::is_whitespace) {
                Some((key, value)) => (key, value.trim()),
                None => (line, ""),
            },
        };

        if value.is_empty() {
            if matches!(key, "port" | "baudrate" | "timeout" | "count") {
                return Err(ConfigError::validation(key, format!("missing value on line {number}")));
            }
            warn!(key, line = number, "ignoring device profile line without a value");
            continue;
        }

        if settings.set_if_unset(key, value)? {
            debug!(key, value, "device profile setting applied");
        }
    }
    Ok(())
}

/// Read the device profile at `path` into `settings`.
pub fn load_device_profile(path: &Path, settings: &mut PortSettings) -> ConfigResult<()> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::read(path, e))?;
    parse_device_profile(path, &contents, settings)
}
