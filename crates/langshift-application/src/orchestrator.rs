//! Migration session orchestration.
//!
//! Drives one (source artifact, model) pair through
//! `Ready → Requesting → Extracting → Persisting → Validating` until an
//! attempt validates or the retry budget runs out.
//!
//! Per-attempt failures (backend error, timeout, empty extraction, failed
//! validation) are recorded on the attempt and consume budget. Persistence
//! and runner failures end the session as `Aborted`. An unregistered model
//! ends it as `Rejected` before any call.

use crate::events::{RUN_EVENT_TARGET, SessionState};
use crate::limiter::ProviderLimiter;
use langshift_core::artifact::{ArtifactKey, ArtifactStore};
use langshift_core::config::{AppConfig, Provider};
use langshift_core::gateway::{GatewayError, ModelGateway};
use langshift_core::migration::{
    Attempt, AttemptFailure, MigrationRequest, MigrationSession, PromptConfig, TerminalState,
    ValidationResult, build_instruction, extract,
};
use langshift_core::validation::ValidationRunner;
use langshift_core::{Language, Result, ShiftError, SourceArtifact};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

const DEFAULT_MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub source_language: Language,
    pub target_language: Language,
    /// Attempts after the first; a session makes at most `max_retries + 1` model calls.
    pub max_retries: u32,
    /// Deadline for one gateway call.
    pub model_timeout: Duration,
    pub prompt: PromptConfig,
    /// Cap on how long a provider's `retry-after` hint may delay the next attempt.
    pub max_retry_delay: Duration,
}

impl OrchestratorSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            source_language: config.source_language()?,
            target_language: config.target_language()?,
            max_retries: config.migration.max_retries,
            model_timeout: config.timeouts.model_timeout(),
            prompt: config.prompt,
            max_retry_delay: DEFAULT_MAX_RETRY_DELAY,
        })
    }

    pub fn max_attempts(&self) -> usize {
        self.max_retries as usize + 1
    }
}

enum AttemptOutcome {
    Passed,
    /// `attempt.failure` is set; budget is consumed.
    Failed { retry_after: Option<Duration> },
    Rejected(ShiftError),
    Aborted(ShiftError),
}

pub struct MigrationOrchestrator {
    gateway: Arc<dyn ModelGateway>,
    store: Arc<dyn ArtifactStore>,
    validator: Arc<dyn ValidationRunner>,
    limiter: ProviderLimiter,
    settings: OrchestratorSettings,
}

impl MigrationOrchestrator {
    pub fn new(
        gateway: Arc<dyn ModelGateway>,
        store: Arc<dyn ArtifactStore>,
        validator: Arc<dyn ValidationRunner>,
        limiter: ProviderLimiter,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            gateway,
            store,
            validator,
            limiter,
            settings,
        }
    }

    /// Runs one session to a terminal state and returns it.
    ///
    /// `cancel` is checked before every attempt; a cancelled session ends `Aborted`.
    pub async fn run_session(
        &self,
        source: &SourceArtifact,
        model_id: &str,
        cancel: &CancellationToken,
    ) -> MigrationSession {
        let mut session = MigrationSession::new(
            source.id.clone(),
            self.settings.target_language.clone(),
            model_id,
        );
        let span = tracing::info_span!(
            "session",
            session_id = %session.id,
            model = %model_id,
            source = %source.id
        );
        self.drive(&mut session, source, cancel)
            .instrument(span)
            .await;
        session
    }

    async fn drive(
        &self,
        session: &mut MigrationSession,
        source: &SourceArtifact,
        cancel: &CancellationToken,
    ) {
        self.transition(session, None, SessionState::Ready);

        let Some(provider) = self.gateway.provider(&session.model_id) else {
            let err = ShiftError::unknown_model(session.model_id.clone());
            self.finish(session, SessionState::Rejected, Some(err.to_string()));
            return;
        };

        let max_attempts = self.settings.max_attempts();
        let mut prior_diagnostic: Option<String> = None;
        let mut retry_after: Option<Duration> = None;

        for index in 0..max_attempts {
            if let Some(delay) = retry_after.take() {
                tracing::debug!(delay_ms = delay.as_millis() as u64, "Honoring provider retry-after");
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            if cancel.is_cancelled() {
                let err = ShiftError::Cancelled(format!("cancelled before attempt {index}"));
                self.finish(session, SessionState::Aborted, Some(err.to_string()));
                return;
            }

            let instruction = match build_instruction(
                &self.settings.source_language,
                &self.settings.target_language,
                &self.settings.prompt,
                prior_diagnostic.as_deref(),
            ) {
                Ok(text) => text,
                Err(e) => {
                    self.finish(session, SessionState::Aborted, Some(e.to_string()));
                    return;
                }
            };

            let mut attempt = Attempt::new(
                index,
                MigrationRequest {
                    source_language: self.settings.source_language.clone(),
                    target_language: self.settings.target_language.clone(),
                    model_id: session.model_id.clone(),
                    source_code: source.code.clone(),
                    instruction_text: instruction,
                    prior_diagnostic: prior_diagnostic.take(),
                },
            );

            match self
                .run_attempt(session, source, provider, &mut attempt)
                .await
            {
                AttemptOutcome::Passed => {
                    session.attempts.push(attempt);
                    self.finish(session, SessionState::Success, None);
                    return;
                }
                AttemptOutcome::Failed { retry_after: delay } => {
                    if let Some(failure) = &attempt.failure {
                        tracing::warn!(attempt = index, kind = failure_kind(failure), "Attempt failed");
                        prior_diagnostic = Some(failure.diagnostic());
                    }
                    session.attempts.push(attempt);
                    retry_after = delay.map(|d| d.min(self.settings.max_retry_delay));
                    if index + 1 < max_attempts {
                        self.transition(session, Some(index), SessionState::Retrying);
                    }
                }
                AttemptOutcome::Rejected(err) => {
                    // No model call happened, so the attempt is not recorded.
                    self.finish(session, SessionState::Rejected, Some(err.to_string()));
                    return;
                }
                AttemptOutcome::Aborted(err) => {
                    tracing::error!(attempt = index, "Session aborted: {err}");
                    session.attempts.push(attempt);
                    self.finish(session, SessionState::Aborted, Some(err.to_string()));
                    return;
                }
            }
        }

        self.finish(
            session,
            SessionState::Failed,
            Some(format!("no attempt passed validation after {max_attempts} attempts")),
        );
    }

    async fn run_attempt(
        &self,
        session: &MigrationSession,
        source: &SourceArtifact,
        provider: Provider,
        attempt: &mut Attempt,
    ) -> AttemptOutcome {
        let index = attempt.index;
        let target = &self.settings.target_language;

        self.transition(session, Some(index), SessionState::Requesting);
        let raw = {
            let _permit = match self.limiter.acquire(provider).await {
                Ok(permit) => permit,
                Err(e) => return AttemptOutcome::Aborted(e),
            };
            let call = self.gateway.invoke(
                &session.model_id,
                &attempt.request.instruction_text,
                &attempt.request.source_code,
            );
            match tokio::time::timeout(self.settings.model_timeout, call).await {
                Ok(Ok(raw)) => raw,
                Ok(Err(GatewayError::UnknownModel(id))) => {
                    return AttemptOutcome::Rejected(ShiftError::unknown_model(id));
                }
                Ok(Err(GatewayError::Backend(e))) => {
                    let retry_after = e.retry_after();
                    attempt.failure = Some(AttemptFailure::Backend(e.to_string()));
                    return AttemptOutcome::Failed { retry_after };
                }
                Err(_) => {
                    attempt.failure = Some(AttemptFailure::Timeout(
                        ShiftError::timeout("model call", self.settings.model_timeout).to_string(),
                    ));
                    return AttemptOutcome::Failed { retry_after: None };
                }
            }
        };

        self.transition(session, Some(index), SessionState::Extracting);
        let extraction = extract(&raw, Some(target));
        attempt.raw_output = Some(raw);
        if extraction.is_empty() {
            attempt.extraction = Some(extraction);
            attempt.failure = Some(AttemptFailure::EmptyExtraction);
            return AttemptOutcome::Failed { retry_after: None };
        }
        let code = extraction.code.clone();
        attempt.extraction = Some(extraction);

        self.transition(session, Some(index), SessionState::Persisting);
        let key = ArtifactKey {
            source,
            target_language: target,
            model_id: &session.model_id,
            session_id: &session.id,
            attempt_index: index,
        };
        let location = match self.store.persist(&key, &code, attempt).await {
            Ok(location) => location,
            Err(e) => return AttemptOutcome::Aborted(e),
        };
        attempt.artifact = Some(location.clone());

        self.transition(session, Some(index), SessionState::Validating);
        let validation = match self.validator.run(target).await {
            Ok(result) => result,
            Err(e) => return AttemptOutcome::Aborted(e),
        };
        let passed = validation.passed;
        if !passed {
            attempt.failure = Some(AttemptFailure::Validation(validation_diagnostic(&validation)));
        }
        attempt.validation = Some(validation);

        if let Err(e) = self.store.update_metadata(&location, attempt).await {
            return AttemptOutcome::Aborted(e);
        }

        if passed {
            AttemptOutcome::Passed
        } else {
            AttemptOutcome::Failed { retry_after: None }
        }
    }

    fn transition(&self, session: &MigrationSession, attempt: Option<usize>, state: SessionState) {
        tracing::info!(
            target: RUN_EVENT_TARGET,
            session_id = %session.id,
            model = %session.model_id,
            source = %session.source_artifact_id,
            attempt = attempt.map(|i| i as u64),
            state = %state,
            "state transition"
        );
    }

    fn finish(&self, session: &mut MigrationSession, state: SessionState, error: Option<String>) {
        let terminal = match state {
            SessionState::Success => TerminalState::Success,
            SessionState::Rejected => TerminalState::Rejected,
            SessionState::Aborted => TerminalState::Aborted,
            _ => TerminalState::Failed,
        };
        session.error = error;
        session.finish(terminal);

        tracing::info!(
            target: RUN_EVENT_TARGET,
            session_id = %session.id,
            model = %session.model_id,
            source = %session.source_artifact_id,
            attempts = session.attempts.len() as u64,
            state = %state,
            error = session.error.as_deref(),
            "session finished"
        );
    }
}

/// The validation output, or a description of the failure when the command
/// printed nothing.
fn validation_diagnostic(result: &ValidationResult) -> String {
    if !result.diagnostic_text.trim().is_empty() {
        return result.diagnostic_text.clone();
    }
    match result.exit_code {
        Some(code) => format!("Validation failed with exit code {code} and no output."),
        None => "Validation failed without output.".to_string(),
    }
}

fn failure_kind(failure: &AttemptFailure) -> &'static str {
    match failure {
        AttemptFailure::Backend(_) => "backend",
        AttemptFailure::Timeout(_) => "timeout",
        AttemptFailure::EmptyExtraction => "empty_extraction",
        AttemptFailure::Validation(_) => "validation",
    }
}
