//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::Config;
use directories::BaseDirs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Config file name
const CONFIG_FILE_NAME: &str = "trx.toml";

/// Environment variable for explicit config path
pub const CONFIG_PATH_ENV: &str = "TRX_CONFIG";

const LOG_LEVEL_ENV: &str = "TRX_LOG_LEVEL";
const LOG_FORMAT_ENV: &str = "TRX_LOG_FORMAT";
const DEFAULT_TIMEOUT_ENV: &str = "TRX_DEFAULT_TIMEOUT";
const MAX_LINE_LENGTH_ENV: &str = "TRX_MAX_LINE_LENGTH";

/// Configuration loader with resolution and override logic.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using standard resolution order.
    ///
    /// Resolution priority (highest to lowest):
    /// 1. `TRX_CONFIG` environment variable (explicit path)
    /// 2. `./trx.toml` (current directory)
    /// 3. `<config dir>/trx/trx.toml` (`~/.config` on Linux)
    /// 4. Built-in defaults (no file required)
    ///
    /// Environment variables override values read from the file.
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path();

        let mut config = if let Some(ref path) = config_path {
            load_from_file(path)?
        } else {
            Config::default()
        };

        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self { config_path, config })
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(ConfigError::NotFound(path));
        }
        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Create a loader with default configuration (no file).
    pub fn with_defaults() -> Self {
        let mut config = Config::default();
        // Still apply env overrides even with defaults
        if apply_env_overrides(&mut config).is_err() || config.validate().is_err() {
            config = Config::default();
        }

        Self {
            config_path: None,
            config,
        }
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    // 1. Explicit environment variable
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.is_file() {
            return Some(path);
        }
        debug!(path = %path.display(), "{CONFIG_PATH_ENV} does not name a file, ignoring");
    }

    // 2. Current directory
    let cwd_config = PathBuf::from(CONFIG_FILE_NAME);
    if cwd_config.is_file() {
        return Some(cwd_config);
    }

    // 3. Platform config directory
    if let Some(app_config) = default_config_path() {
        if app_config.is_file() {
            return Some(app_config);
        }
    }

    None
}

/// `<config dir>/trx/trx.toml` for the current user.
pub fn default_config_path() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.config_dir().join("trx").join(CONFIG_FILE_NAME))
}

fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read(path, e))?;
    debug!(path = %path.display(), "loaded configuration file");
    toml::from_str(&content).map_err(ConfigError::ParseError)
}

/// Apply `TRX_*` environment variable overrides to the configuration.
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    if let Ok(val) = std::env::var(LOG_LEVEL_ENV) {
        config.logging.level = val;
    }
    if let Ok(val) = std::env::var(LOG_FORMAT_ENV) {
        config.logging.format = val
            .parse()
            .map_err(|_| ConfigError::env_parse(LOG_FORMAT_ENV, "expected json, pretty or compact"))?;
    }
    if let Ok(val) = std::env::var(DEFAULT_TIMEOUT_ENV) {
        config.defaults.timeout = val
            .trim()
            .parse()
            .map_err(|_| ConfigError::env_parse(DEFAULT_TIMEOUT_ENV, "invalid timeout"))?;
    }
    if let Ok(val) = std::env::var(MAX_LINE_LENGTH_ENV) {
        config.framing.max_line_length = val
            .trim()
            .parse()
            .map_err(|_| ConfigError::env_parse(MAX_LINE_LENGTH_ENV, "invalid line length"))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogFormat;
    use serial_test::serial;
    use std::env;
    use std::time::Duration;

    fn clear_env() {
        for var in [
            CONFIG_PATH_ENV,
            LOG_LEVEL_ENV,
            LOG_FORMAT_ENV,
            DEFAULT_TIMEOUT_ENV,
            MAX_LINE_LENGTH_ENV,
        ] {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_default_loader() {
        clear_env();
        let loader = ConfigLoader::with_defaults();
        assert!(loader.config_path.is_none());
        assert_eq!(loader.config().logging.level, "warn");
    }

    #[test]
    #[serial]
    fn test_env_override() {
        clear_env();
        env::set_var(LOG_LEVEL_ENV, "debug");
        env::set_var(LOG_FORMAT_ENV, "JSON");
        env::set_var(DEFAULT_TIMEOUT_ENV, "2.5");

        let loader = ConfigLoader::with_defaults();
        assert_eq!(loader.config().logging.level, "debug");
        assert_eq!(loader.config().logging.format, LogFormat::Json);
        assert_eq!(
            loader.config().defaults.timeout().unwrap(),
            Duration::from_millis(2500)
        );

        clear_env();
    }

    #[test]
    #[serial]
    fn test_load_from_file_then_env() {
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trx.toml");
        std::fs::write(&path, "[framing]\nmax_line_length = 64\n").unwrap();

        let loader = ConfigLoader::load_from(&path).unwrap();
        assert_eq!(loader.config().framing.max_line_length, 64);

        env::set_var(MAX_LINE_LENGTH_ENV, "128");
        let loader = ConfigLoader::load_from(&path).unwrap();
        assert_eq!(loader.config().framing.max_line_length, 128);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_bad_env_value_is_an_error() {
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trx.toml");
        std::fs::write(&path, "").unwrap();

        env::set_var(DEFAULT_TIMEOUT_ENV, "soon");
        let err = ConfigLoader::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::EnvParseError { .. }));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_explicit_path_env() {
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[defaults]\ncount = 4\n").unwrap();
        env::set_var(CONFIG_PATH_ENV, &path);

        assert_eq!(resolve_config_path(), Some(path));
        let loader = ConfigLoader::load().unwrap();
        assert_eq!(loader.config().defaults.count, 4);

        clear_env();
    }

    #[test]
    fn test_missing_file() {
        let err = ConfigLoader::load_from("/nonexistent/trx.toml").unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }
}
