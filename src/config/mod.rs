//! Configuration module for trx.
//!
//! Two layers feed a [`PortConfiguration`](crate::port::PortConfiguration):
//!
//! - Application settings in `trx.toml` with `TRX_*` environment overrides
//!   ([`ConfigLoader`]).
//! - A device profile: `key = value` lines naming the port, baud rate,
//!   timeout and line count ([`load_device_profile`]).
//!
//! # Configuration Resolution
//!
//! `trx.toml` is loaded from the first of:
//!
//! 1. `TRX_CONFIG` environment variable (explicit path)
//! 2. `./trx.toml` (current directory)
//! 3. `<config dir>/trx/trx.toml` (`~/.config/trx/trx.toml` on Linux)
//! 4. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! - `TRX_LOG_LEVEL`, `TRX_LOG_FORMAT`
//! - `TRX_DEFAULT_TIMEOUT` (seconds)
//! - `TRX_MAX_LINE_LENGTH`
//!
//! # Example
//!
//! ```rust,no_run
//! use trx::config::{ConfigLoader, PortSettings};
//!
//! let config = ConfigLoader::load()?.into_config();
//! let settings = PortSettings {
//!     port: Some("/dev/ttyUSB0".into()),
//!     ..Default::default()
//! };
//! let port = settings.into_configuration(&config.defaults)?;
//! # Ok::<(), trx::config::ConfigError>(())
//! ```

mod device;
mod discovery;
mod error;
mod loader;
mod schema;

pub use device::{load_device_profile, parse_device_profile, PortSettings, MAX_FILE_LINE_LENGTH};
pub(crate) use device::bounded_lines;
pub use discovery::{SearchPaths, COMMAND_FILE_EXT, PROFILE_EXT};
pub use error::{ConfigError, ConfigResult};
pub use loader::{default_config_path, resolve_config_path, ConfigLoader, CONFIG_PATH_ENV};
pub use schema::{Config, DefaultsConfig, FramingConfig, LogFormat, LoggingConfig, SearchConfig};
