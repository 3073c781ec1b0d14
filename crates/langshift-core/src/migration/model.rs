//! Session and attempt records.

use crate::artifact::ArtifactLocation;
use crate::language::Language;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

/// Everything sent to the model for one attempt. Built once per attempt and
/// never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationRequest {
    pub source_language: Language,
    pub target_language: Language,
    pub model_id: String,
    pub source_code: String,
    pub instruction_text: String,
    /// Diagnostic of the immediately preceding failed attempt, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prior_diagnostic: Option<String>,
}

/// Which extraction strategy produced the code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExtractionStrategy {
    LabeledFence,
    UnterminatedLabeledFence,
    FenceScan,
}

/// Code pulled out of a raw model response. Empty `code` means extraction failed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub code: String,
    pub extra: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<ExtractionStrategy>,
}

impl ExtractionResult {
    pub fn empty(extra: impl Into<String>) -> Self {
        Self {
            code: String::new(),
            extra: extra.into(),
            strategy: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    pub passed: bool,
    /// Combined stdout and stderr of the validation command, verbatim.
    pub diagnostic_text: String,
    #[serde(default)]
    pub exit_code: Option<i32>,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(default)]
    pub elapsed_ms: u64,
}

impl ValidationResult {
    pub fn passed(diagnostic_text: impl Into<String>) -> Self {
        Self {
            passed: true,
            diagnostic_text: diagnostic_text.into(),
            exit_code: Some(0),
            ..Default::default()
        }
    }

    pub fn failed(diagnostic_text: impl Into<String>) -> Self {
        Self {
            passed: false,
            diagnostic_text: diagnostic_text.into(),
            ..Default::default()
        }
    }
}

/// Why an attempt did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum AttemptFailure {
    Backend(String),
    Timeout(String),
    EmptyExtraction,
    Validation(String),
}

impl AttemptFailure {
    /// Text handed to the next attempt as its prior diagnostic.
    pub fn diagnostic(&self) -> String {
        match self {
            Self::Backend(message) => format!("The model backend failed: {message}"),
            Self::Timeout(message) => format!("The previous request timed out: {message}"),
            Self::EmptyExtraction => {
                "No fenced code block could be extracted from the previous response. \
                 Return the complete migrated code inside a single fenced code block."
                    .to_string()
            }
            Self::Validation(diagnostic) => diagnostic.clone(),
        }
    }
}

/// One request, extract, persist, validate cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attempt {
    /// 0-based position within the session.
    pub index: usize,
    pub request: MigrationRequest,
    #[serde(default)]
    pub raw_output: Option<String>,
    #[serde(default)]
    pub extraction: Option<ExtractionResult>,
    #[serde(default)]
    pub artifact: Option<ArtifactLocation>,
    #[serde(default)]
    pub validation: Option<ValidationResult>,
    #[serde(default)]
    pub failure: Option<AttemptFailure>,
    pub timestamp: DateTime<Utc>,
}

impl Attempt {
    pub fn new(index: usize, request: MigrationRequest) -> Self {
        Self {
            index,
            request,
            raw_output: None,
            extraction: None,
            artifact: None,
            validation: None,
            failure: None,
            timestamp: Utc::now(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.validation.as_ref().is_some_and(|v| v.passed)
    }

    pub fn migrated_code(&self) -> Option<&str> {
        self.extraction
            .as_ref()
            .map(|e| e.code.as_str())
            .filter(|code| !code.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum TerminalState {
    /// An attempt passed validation.
    Success,
    /// The retry budget ran out.
    Failed,
    /// The model identifier is not registered; no attempt was made.
    Rejected,
    /// A per-artifact fatal error (persistence) or cancellation ended the session.
    Aborted,
}

/// The ordered attempts made for one source artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationSession {
    pub id: String,
    pub source_artifact_id: String,
    pub target_language: Language,
    pub model_id: String,
    pub attempts: Vec<Attempt>,
    #[serde(default)]
    pub terminal_state: Option<TerminalState>,
    /// Error that ended an `Aborted` or `Rejected` session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
}

impl MigrationSession {
    pub fn new(
        source_artifact_id: impl Into<String>,
        target_language: Language,
        model_id: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            source_artifact_id: source_artifact_id.into(),
            target_language,
            model_id: model_id.into(),
            attempts: Vec::new(),
            terminal_state: None,
            error: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn last_attempt(&self) -> Option<&Attempt> {
        self.attempts.last()
    }

    pub fn finish(&mut self, state: TerminalState) {
        self.terminal_state = Some(state);
        self.finished_at = Some(Utc::now());
    }

    /// Number of model calls made, one per recorded attempt.
    pub fn model_calls(&self) -> usize {
        self.attempts.len()
    }

    /// Path of the most recently persisted artifact, if any attempt produced code.
    pub fn last_artifact(&self) -> Option<&ArtifactLocation> {
        self.attempts.iter().rev().find_map(|a| a.artifact.as_ref())
    }
}
