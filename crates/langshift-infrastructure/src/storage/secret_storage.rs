//! Secret configuration file storage.
//!
//! Loads provider API keys from `~/.config/langshift/secret.json`, falling
//! back to environment variables for providers the file does not configure.

use crate::paths::LangshiftPaths;
use langshift_core::config::{ApiKeyConfig, Provider, SecretConfig};
use std::fs;
use std::path::PathBuf;

/// Environment variable consulted when secret.json has no key for a provider.
pub fn api_key_env_var(provider: Provider) -> Option<&'static str> {
    match provider {
        Provider::OpenAi => Some("OPENAI_API_KEY"),
        Provider::Gemini => Some("GEMINI_API_KEY"),
        Provider::Claude => Some("ANTHROPIC_API_KEY"),
        Provider::Ollama => None,
    }
}

/// Errors that can occur during secret storage operations.
#[derive(Debug)]
pub enum SecretStorageError {
    /// Configuration file not found.
    NotFound(PathBuf),
    /// File I/O error.
    IoError(std::io::Error),
    /// JSON parsing error.
    ParseError(serde_json::Error),
    /// Config directory not found.
    ConfigDirNotFound,
}

impl std::fmt::Display for SecretStorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecretStorageError::NotFound(path) => {
                write!(f, "Secret file not found at: {}", path.display())
            }
            SecretStorageError::IoError(e) => write!(f, "I/O error: {}", e),
            SecretStorageError::ParseError(e) => write!(f, "JSON parse error: {}", e),
            SecretStorageError::ConfigDirNotFound => {
                write!(f, "Could not determine the config directory")
            }
        }
    }
}

impl std::error::Error for SecretStorageError {}

impl From<std::io::Error> for SecretStorageError {
    fn from(e: std::io::Error) -> Self {
        SecretStorageError::IoError(e)
    }
}

impl From<serde_json::Error> for SecretStorageError {
    fn from(e: serde_json::Error) -> Self {
        SecretStorageError::ParseError(e)
    }
}

/// Read-only storage for secret.json.
///
/// The file is plaintext JSON; protect it with file permissions.
pub struct SecretStorage {
    path: PathBuf,
}

impl SecretStorage {
    /// Creates a storage pointing at the default location.
    pub fn new() -> Result<Self, SecretStorageError> {
        let path = LangshiftPaths::secret_file().map_err(|_| SecretStorageError::ConfigDirNotFound)?;
        Ok(Self { path })
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Loads and parses the secret file.
    pub fn load(&self) -> Result<SecretConfig, SecretStorageError> {
        if !self.path.exists() {
            return Err(SecretStorageError::NotFound(self.path.clone()));
        }

        let content = fs::read_to_string(&self.path)?;
        let config = serde_json::from_str(&content)?;

        Ok(config)
    }

    /// Loads the secret file if present, then fills unset providers from the
    /// process environment.
    ///
    /// A missing file is not an error; a malformed one is.
    pub fn load_with_env_fallback(&self) -> Result<SecretConfig, SecretStorageError> {
        let config = match self.load() {
            Ok(config) => config,
            Err(SecretStorageError::NotFound(path)) => {
                tracing::debug!(path = %path.display(), "No secret file, using environment only");
                SecretConfig::default()
            }
            Err(e) => return Err(e),
        };
        Ok(apply_env_fallback(config, |name| std::env::var(name).ok()))
    }
}

/// Fills providers without a usable key from `lookup` (normally the environment).
pub fn apply_env_fallback(
    mut config: SecretConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> SecretConfig {
    for provider in [Provider::OpenAi, Provider::Gemini, Provider::Claude] {
        if config.api_key(provider).is_some() {
            continue;
        }
        let Some(var) = api_key_env_var(provider) else {
            continue;
        };
        let Some(api_key) = lookup(var).filter(|key| !key.trim().is_empty()) else {
            continue;
        };
        let entry = Some(ApiKeyConfig { api_key });
        match provider {
            Provider::OpenAi => config.openai = entry,
            Provider::Gemini => config.gemini = entry,
            Provider::Claude => config.claude = entry,
            Provider::Ollama => {}
        }
    }
    config
}
