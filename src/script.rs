//! Command files: one command per line.

use crate::config::{bounded_lines, ConfigError, ConfigResult};
use std::path::Path;

/// Parse a command file's contents. `#` comments and empty lines are skipped.
pub fn parse_commands(path: &Path, contents: &str) -> ConfigResult<Vec<String>> {
    let mut commands = Vec::new();
    for entry in bounded_lines(path, contents) {
        let (_, line) = entry?;
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        commands.push(line.to_string());
    }
    Ok(commands)
}

/// Read the commands stored at `path`.
pub fn load_commands(path: &Path) -> ConfigResult<Vec<String>> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::read(path, e))?;
    parse_commands(path, &contents)
}
