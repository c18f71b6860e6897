//! Finding device profiles and command files by name.
//!
//! A name is tried as a path first (with `~` expanded), then as
//! `<dir>/<name><ext>` in each search directory:
//!
//! 1. `<config dir>/trx` (`$XDG_CONFIG_HOME/trx` on Linux)
//! 2. `~/.trx`
//! 3. `/etc/trx`
//! 4. `[search] extra_dirs` from `trx.toml`

use super::error::{ConfigError, ConfigResult};
use directories::BaseDirs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extension of device profiles.
pub const PROFILE_EXT: &str = ".conf";
/// Extension of command files.
pub const COMMAND_FILE_EXT: &str = ".cmd";

/// Ordered list of directories searched for named files.
#[derive(Debug, Clone, Default)]
pub struct SearchPaths {
    home: Option<PathBuf>,
    dirs: Vec<PathBuf>,
}

impl SearchPaths {
    /// Standard locations for the current user, followed by `extra`.
    pub fn from_env(extra: &[PathBuf]) -> Self {
        let base = BaseDirs::new();
        let home = base.as_ref().map(|b| b.home_dir().to_path_buf());

        let mut dirs = Vec::new();
        if let Some(base) = &base {
            dirs.push(base.config_dir().join("trx"));
        }
        if let Some(home) = &home {
            dirs.push(home.join(".trx"));
        }
        dirs.push(PathBuf::from("/etc/trx"));
        dirs.extend(extra.iter().map(|dir| expand_home(dir, home.as_deref())));

        Self { home, dirs }
    }

    pub fn new(home: Option<PathBuf>, dirs: Vec<PathBuf>) -> Self {
        Self { home, dirs }
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Resolve `name` to an existing, regular, non-empty file.
    pub fn resolve(&self, name: &str, ext: &str) -> ConfigResult<PathBuf> {
        let direct = expand_home(Path::new(name), self.home.as_deref());
        let path = if direct.exists() {
            direct
        } else {
            let file_name = format!("{name}{ext}");
            self.dirs
                .iter()
                .map(|dir| dir.join(&file_name))
                .find(|candidate| candidate.exists())
                .ok_or_else(|| ConfigError::NotFound(PathBuf::from(name)))?
        };

        let metadata = std::fs::metadata(&path).map_err(|e| ConfigError::read(&path, e))?;
        if !metadata.is_file() {
            return Err(ConfigError::NotRegularFile(path));
        }
        if metadata.len() == 0 {
            return Err(ConfigError::EmptyFile(path));
        }

        debug!(name, path = %path.display(), "resolved named file");
        Ok(path)
    }
}

fn expand_home(path: &Path, home: Option<&Path>) -> PathBuf {
    match (path.strip_prefix("~"), home) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
