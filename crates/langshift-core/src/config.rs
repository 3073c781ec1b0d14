//! Configuration model.
//!
//! Everything environment-specific (endpoints, credentials, languages, retry
//! budget, validation commands, output root) is read from `config.toml` and
//! `secret.json`; loading lives in `langshift-infrastructure`.

use crate::error::{Result, ShiftError};
use crate::language::Language;
use crate::migration::prompt::PromptConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use strum::{Display, EnumString};

pub const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_MODEL_TIMEOUT_SECS: u64 = 300;
const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 600;

/// Root of `config.toml`.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub migration: MigrationSettings,
    #[serde(default)]
    pub prompt: PromptConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub concurrency: ConcurrencyConfig,
    #[serde(default)]
    pub providers: ProviderEndpoints,
    #[serde(default, rename = "model")]
    pub models: Vec<ModelRegistration>,
    /// Validation command keyed by target language tag.
    #[serde(default)]
    pub validation: HashMap<String, CommandSpec>,
    #[serde(default)]
    pub batch: BatchPlan,
    #[serde(default, rename = "post_batch")]
    pub post_batch: Vec<CommandSpec>,
}

impl AppConfig {
    /// Checks the settings every batch needs before any work starts.
    pub fn validate(&self) -> Result<()> {
        if self.migration.source_language.as_ref().is_none_or(Language::is_empty) {
            return Err(ShiftError::config("migration.source_language is not set"));
        }
        if self.migration.target_language.as_ref().is_none_or(Language::is_empty) {
            return Err(ShiftError::config("migration.target_language is not set"));
        }
        if self.output.root.as_os_str().is_empty() {
            return Err(ShiftError::config("output.root is not set"));
        }
        if self.models.is_empty() {
            return Err(ShiftError::config("no [[model]] registrations configured"));
        }

        let mut seen = std::collections::HashSet::new();
        for model in &self.models {
            if !seen.insert(model.id.as_str()) {
                return Err(ShiftError::config(format!(
                    "model '{}' is registered more than once",
                    model.id
                )));
            }
        }

        for (tag, command) in &self.validation {
            if command.program.trim().is_empty() {
                return Err(ShiftError::config(format!(
                    "validation command for '{tag}' has no program"
                )));
            }
        }

        let target = self.target_language()?;
        if self.validation_command(&target).is_none() && !self.migration.allow_unvalidated {
            return Err(ShiftError::config(format!(
                "no [validation.{target}] command configured; set migration.allow_unvalidated = true to skip validation"
            )));
        }

        if self.concurrency.max_sessions == 0 || self.concurrency.max_calls_per_provider == 0 {
            return Err(ShiftError::config("concurrency limits must be at least 1"));
        }

        Ok(())
    }

    pub fn source_language(&self) -> Result<Language> {
        self.migration
            .source_language
            .clone()
            .ok_or_else(|| ShiftError::config("migration.source_language is not set"))
    }

    pub fn target_language(&self) -> Result<Language> {
        self.migration
            .target_language
            .clone()
            .ok_or_else(|| ShiftError::config("migration.target_language is not set"))
    }

    /// Validation command for a target language, if one is configured.
    pub fn validation_command(&self, language: &Language) -> Option<&CommandSpec> {
        self.validation
            .iter()
            .find(|(tag, _)| Language::new(tag.as_str()) == *language)
            .map(|(_, command)| command)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct MigrationSettings {
    #[serde(default)]
    pub source_language: Option<Language>,
    #[serde(default)]
    pub target_language: Option<Language>,
    /// Additional attempts after the first one; a session makes at most
    /// `max_retries + 1` model calls.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Accept migrated code without validation when the target language has
    /// no validation command. Off by default.
    #[serde(default)]
    pub allow_unvalidated: bool,
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self {
            source_language: None,
            target_language: None,
            max_retries: DEFAULT_MAX_RETRIES,
            allow_unvalidated: false,
        }
    }
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct OutputConfig {
    #[serde(default)]
    pub root: PathBuf,
}

impl OutputConfig {
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct TimeoutConfig {
    /// Deadline for a single model gateway call.
    #[serde(default = "default_model_timeout_secs")]
    pub model_secs: u64,
}

impl TimeoutConfig {
    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            model_secs: DEFAULT_MODEL_TIMEOUT_SECS,
        }
    }
}

fn default_model_timeout_secs() -> u64 {
    DEFAULT_MODEL_TIMEOUT_SECS
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ConcurrencyConfig {
    /// Sessions processed at the same time. 1 reproduces fully sequential runs.
    #[serde(default = "default_one")]
    pub max_sessions: usize,
    /// In-flight gateway calls per provider.
    #[serde(default = "default_one")]
    pub max_calls_per_provider: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_sessions: 1,
            max_calls_per_provider: 1,
        }
    }
}

fn default_one() -> usize {
    1
}

/// Model providers the gateway knows how to talk to.
#[derive(
    Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Provider {
    OpenAi,
    Gemini,
    Claude,
    Ollama,
}

/// Per-provider endpoint overrides.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct ProviderEndpoints {
    #[serde(default)]
    pub openai: Option<EndpointConfig>,
    #[serde(default)]
    pub gemini: Option<EndpointConfig>,
    #[serde(default)]
    pub claude: Option<EndpointConfig>,
    #[serde(default)]
    pub ollama: Option<EndpointConfig>,
}

impl ProviderEndpoints {
    pub fn get(&self, provider: Provider) -> Option<&EndpointConfig> {
        match provider {
            Provider::OpenAi => self.openai.as_ref(),
            Provider::Gemini => self.gemini.as_ref(),
            Provider::Claude => self.claude.as_ref(),
            Provider::Ollama => self.ollama.as_ref(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct EndpointConfig {
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Maps a human-readable model identifier to a backend and its generation
/// parameters.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ModelRegistration {
    /// Identifier used in requests and batch plans, e.g. `VertexAI - Gemini Pro`.
    pub id: String,
    pub provider: Provider,
    /// Backend-specific model variant, e.g. `gemini-pro`.
    pub model: String,
    /// Generation-length override for variants that truncate at the provider default.
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
}

/// An external command (validation or post-batch step).
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct CommandSpec {
    #[serde(default)]
    pub name: Option<String>,
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default = "default_command_timeout_secs")]
    pub timeout_secs: u64,
    /// Operates on a project tree shared by every session; such runs are
    /// serialized behind one global lock.
    #[serde(default = "default_true")]
    pub shared_tree: bool,
}

impl CommandSpec {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.program)
    }
}

fn default_command_timeout_secs() -> u64 {
    DEFAULT_COMMAND_TIMEOUT_SECS
}

fn default_true() -> bool {
    true
}

/// Which models run over which sources.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct BatchPlan {
    /// Model identifiers, run model-major in this order.
    #[serde(default)]
    pub models: Vec<String>,
    #[serde(default)]
    pub sources: Vec<SourceSpec>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum SourceSpec {
    /// Files fetched from a GitHub repository's raw content.
    Github {
        repo: String,
        #[serde(default = "default_branch")]
        branch: String,
        file_paths: Vec<String>,
    },
    /// A file (or every file of a directory, non-recursive) on local disk.
    Local {
        path: PathBuf,
        #[serde(default)]
        extension: Option<String>,
    },
}

fn default_branch() -> String {
    "master".to_string()
}

// ============================================================================
// Secrets (secret.json)
// ============================================================================

/// Root of `secret.json`.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct SecretConfig {
    #[serde(default)]
    pub openai: Option<ApiKeyConfig>,
    #[serde(default)]
    pub gemini: Option<ApiKeyConfig>,
    #[serde(default)]
    pub claude: Option<ApiKeyConfig>,
}

impl SecretConfig {
    pub fn api_key(&self, provider: Provider) -> Option<&str> {
        let entry = match provider {
            Provider::OpenAi => self.openai.as_ref(),
            Provider::Gemini => self.gemini.as_ref(),
            Provider::Claude => self.claude.as_ref(),
            Provider::Ollama => None,
        };
        entry
            .map(|config| config.api_key.as_str())
            .filter(|key| !key.trim().is_empty())
    }
}

#[derive(Deserialize, Serialize, Clone, Default)]
pub struct ApiKeyConfig {
    pub api_key: String,
}

impl std::fmt::Debug for ApiKeyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyConfig")
            .field("api_key", &"<redacted>")
            .finish()
    }
}
