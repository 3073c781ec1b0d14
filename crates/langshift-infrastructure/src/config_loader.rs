//! Loads `config.toml`, applies environment overrides, and validates.
//!
//! Precedence, highest first: `LANGSHIFT_*` environment variables (a `.env`
//! file in the working directory is read into the environment first), the
//! TOML file, built-in defaults.

use crate::paths::LangshiftPaths;
use langshift_core::config::{AppConfig, EndpointConfig};
use langshift_core::{Language, Result, ShiftError};
use std::path::{Path, PathBuf};

pub const ENV_SOURCE_LANGUAGE: &str = "LANGSHIFT_SOURCE_LANGUAGE";
pub const ENV_TARGET_LANGUAGE: &str = "LANGSHIFT_TARGET_LANGUAGE";
pub const ENV_MAX_RETRIES: &str = "LANGSHIFT_MAX_RETRIES";
pub const ENV_OUTPUT_ROOT: &str = "LANGSHIFT_OUTPUT_ROOT";
pub const ENV_OLLAMA_BASE_URL: &str = "OLLAMA_BASE_URL";

/// Reads `.env` from the working directory into the process environment.
///
/// Returns the loaded file, or `None` when there is none.
pub fn load_dotenv() -> Option<PathBuf> {
    match dotenvy::dotenv() {
        Ok(path) => Some(path),
        Err(e) if e.not_found() => None,
        Err(e) => {
            tracing::warn!("Ignoring unreadable .env file: {e}");
            None
        }
    }
}

pub struct ConfigLoader {
    path: PathBuf,
}

impl ConfigLoader {
    /// Loader for the default location (`~/.config/langshift/config.toml`).
    pub fn new() -> Result<Self> {
        let path = LangshiftPaths::config_file().map_err(|e| ShiftError::config(e.to_string()))?;
        Ok(Self { path })
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the file and applies process-environment overrides. Does not validate.
    pub fn load(&self) -> Result<AppConfig> {
        self.load_with(|name| std::env::var(name).ok())
    }

    /// Like [`load`](Self::load) with an explicit variable lookup.
    pub fn load_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Result<AppConfig> {
        if !self.path.exists() {
            return Err(ShiftError::config(format!(
                "config file not found at {}",
                self.path.display()
            )));
        }

        let content = std::fs::read_to_string(&self.path)?;
        let mut config: AppConfig = toml::from_str(&content)?;
        apply_env_overrides(&mut config, lookup)?;

        tracing::debug!(
            path = %self.path.display(),
            models = config.models.len(),
            "Loaded configuration"
        );
        Ok(config)
    }
}

pub fn apply_env_overrides(
    config: &mut AppConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

    if let Some(value) = get(ENV_SOURCE_LANGUAGE) {
        config.migration.source_language = Some(Language::new(value));
    }
    if let Some(value) = get(ENV_TARGET_LANGUAGE) {
        config.migration.target_language = Some(Language::new(value));
    }
    if let Some(value) = get(ENV_MAX_RETRIES) {
        config.migration.max_retries = value.trim().parse().map_err(|_| {
            ShiftError::config(format!("{ENV_MAX_RETRIES} must be a non-negative integer, got '{value}'"))
        })?;
    }
    if let Some(value) = get(ENV_OUTPUT_ROOT) {
        config.output.root = PathBuf::from(value);
    }

    let ollama_unset = config
        .providers
        .ollama
        .as_ref()
        .and_then(|endpoint| endpoint.base_url.as_deref())
        .is_none_or(|url| url.trim().is_empty());
    if ollama_unset {
        if let Some(url) = get(ENV_OLLAMA_BASE_URL) {
            config.providers.ollama = Some(EndpointConfig {
                base_url: Some(url),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    const CONFIG: &str = r#"
[migration]
source_language = "java"
target_language = "kotlin"

[output]
root = "output"

[[model]]
id = "Ollama - CodeLlama"
provider = "ollama"
model = "codellama"

[validation.kotlin]
program = "gradle"
args = ["build"]
"#;

    fn write_config(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, CONFIG).unwrap();
        path
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = ConfigLoader::with_path(temp_dir.path().join("nope.toml"))
            .load_with(env(&[]))
            .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_env_overrides_win() {
        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::with_path(write_config(&temp_dir));

        let config = loader
            .load_with(env(&[
                (ENV_TARGET_LANGUAGE, "Swift"),
                (ENV_MAX_RETRIES, "5"),
                (ENV_OUTPUT_ROOT, "/tmp/out"),
                (ENV_OLLAMA_BASE_URL, "http://gpu-box:11434"),
            ]))
            .unwrap();

        assert_eq!(config.source_language().unwrap().tag(), "java");
        assert_eq!(config.target_language().unwrap().tag(), "swift");
        assert_eq!(config.migration.max_retries, 5);
        assert_eq!(config.output.root, PathBuf::from("/tmp/out"));
        assert_eq!(
            config.providers.ollama.unwrap().base_url.as_deref(),
            Some("http://gpu-box:11434")
        );
    }

    #[test]
    fn test_file_values_without_env() {
        let temp_dir = TempDir::new().unwrap();
        let config = ConfigLoader::with_path(write_config(&temp_dir))
            .load_with(env(&[]))
            .unwrap();
        assert_eq!(config.migration.max_retries, 3);
        assert_eq!(config.output.root, PathBuf::from("output"));
        assert!(config.providers.ollama.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_bad_retry_override() {
        let temp_dir = TempDir::new().unwrap();
        let err = ConfigLoader::with_path(write_config(&temp_dir))
            .load_with(env(&[(ENV_MAX_RETRIES, "many")]))
            .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_malformed_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[migration\nsource_language =").unwrap();
        let err = ConfigLoader::with_path(path).load_with(env(&[])).unwrap_err();
        assert!(matches!(err, ShiftError::Serialization { .. }));
    }

    #[test]
    fn test_example_config_is_valid() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, include_str!("../../../langshift.example.toml")).unwrap();

        let config = ConfigLoader::with_path(path).load_with(env(&[])).unwrap();
        config.validate().unwrap();
        assert_eq!(config.models.len(), 3);
        assert_eq!(config.batch.sources.len(), 2);
        assert_eq!(config.post_batch.len(), 1);
        assert!(
            config
                .validation_command(&langshift_core::Language::new("Kotlin"))
                .is_some()
        );
    }
}
