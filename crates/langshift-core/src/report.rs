//! Batch run report.
//!
//! Every batch run returns one of these instead of bumping shared counters.

use crate::migration::model::{MigrationSession, TerminalState, ValidationResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub source_artifact_id: String,
    pub model_id: String,
    pub terminal_state: Option<TerminalState>,
    pub attempts: usize,
    pub last_artifact: Option<PathBuf>,
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

impl SessionSummary {
    pub fn from_session(session: &MigrationSession, elapsed: Duration) -> Self {
        Self {
            session_id: session.id.clone(),
            source_artifact_id: session.source_artifact_id.clone(),
            model_id: session.model_id.clone(),
            terminal_state: session.terminal_state,
            attempts: session.attempts.len(),
            last_artifact: session.last_artifact().map(|a| a.code_path.clone()),
            error: session.error.clone(),
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }
}

/// Result of one post-batch command (static analysis, project test suite, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostBatchOutcome {
    pub name: String,
    pub result: ValidationResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    pub sessions: Vec<SessionSummary>,
    /// Wall-clock time spent per model identifier, in milliseconds.
    pub model_times_ms: BTreeMap<String, u64>,
    /// Model gateway calls made across all sessions.
    pub total_requests: usize,
    /// Sources that could not be loaded; they never became sessions.
    #[serde(default)]
    pub load_failures: Vec<String>,
    #[serde(default)]
    pub post_batch: Vec<PostBatchOutcome>,
}

impl Default for BatchReport {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchReport {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            sessions: Vec::new(),
            model_times_ms: BTreeMap::new(),
            total_requests: 0,
            load_failures: Vec::new(),
            post_batch: Vec::new(),
        }
    }

    pub fn record(&mut self, session: &MigrationSession, elapsed: Duration) {
        self.total_requests += session.model_calls();
        *self
            .model_times_ms
            .entry(session.model_id.clone())
            .or_default() += elapsed.as_millis() as u64;
        self.sessions
            .push(SessionSummary::from_session(session, elapsed));
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn count(&self, state: TerminalState) -> usize {
        self.sessions
            .iter()
            .filter(|s| s.terminal_state == Some(state))
            .count()
    }

    pub fn elapsed(&self) -> Duration {
        let end = self.finished_at.unwrap_or_else(Utc::now);
        (end - self.started_at).to_std().unwrap_or_default()
    }

    /// True when every session succeeded and every source loaded.
    pub fn all_succeeded(&self) -> bool {
        self.load_failures.is_empty()
            && self
                .sessions
                .iter()
                .all(|s| s.terminal_state == Some(TerminalState::Success))
    }
}
