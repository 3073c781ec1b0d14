//! Path resolution for langshift configuration files.
//!
//! ```text
//! ~/.config/langshift/
//! ├── config.toml     # languages, models, validation commands, batch plan
//! └── secret.json     # provider API keys
//! ```
//!
//! Output artifacts and run logs live under the configured `output.root`,
//! not here.

use std::path::PathBuf;

const APP_DIR: &str = "langshift";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Platform config directory could not be determined.
    ConfigDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::ConfigDirNotFound => write!(f, "Cannot determine the config directory"),
        }
    }
}

impl std::error::Error for PathError {}

pub struct LangshiftPaths;

impl LangshiftPaths {
    /// Returns the langshift configuration directory (e.g. `~/.config/langshift/`).
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::ConfigDirNotFound)
    }

    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Returns the path to the secrets file.
    ///
    /// Keep this file readable by its owner only (e.g. mode 600).
    pub fn secret_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("secret.json"))
    }
}
