//! Model gateway contract.
//!
//! A [`ModelBackend`] talks to one provider; a [`ModelGateway`] resolves a
//! human-readable model identifier to a registered backend and its generation
//! parameters. Neither retries: retry policy belongs to the orchestrator.

use crate::config::Provider;
use crate::error::ShiftError;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Generation parameters attached to a model registration.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GenerationParams {
    /// Overrides the backend's default generation-length limit.
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

/// Failure reported by a provider backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    /// The request could not be built or the response carried no usable text
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    /// Transport or HTTP-level failure
    #[error("{message}{}", .status_code.map(|c| format!(" (HTTP {c})")).unwrap_or_default())]
    ProcessError {
        status_code: Option<u16>,
        message: String,
        is_retryable: bool,
        retry_after: Option<Duration>,
    },

    #[error("{0}")]
    Other(String),
}

impl BackendError {
    pub fn process_error_with_retry_after(
        status_code: u16,
        message: impl Into<String>,
        is_retryable: bool,
        retry_after: Duration,
    ) -> Self {
        Self::ProcessError {
            status_code: Some(status_code),
            message: message.into(),
            is_retryable,
            retry_after: Some(retry_after),
        }
    }

    /// Delay the provider asked for before the next call, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::ProcessError { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// Failure of a gateway invocation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    /// The model identifier is not registered; no backend was contacted.
    #[error("Unknown model: '{0}'")]
    UnknownModel(String),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

impl From<GatewayError> for ShiftError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::UnknownModel(id) => ShiftError::UnknownModel(id),
            GatewayError::Backend(inner) => ShiftError::Backend(inner.to_string()),
        }
    }
}

/// One provider endpoint (OpenAI, Gemini, Claude, Ollama, ...).
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Short description for logs, e.g. `gemini:gemini-pro`.
    fn describe(&self) -> String;

    /// Sends `prompt` and returns the model's raw text output.
    async fn generate(&self, prompt: &str, params: &GenerationParams)
    -> Result<String, BackendError>;
}

/// Uniform invocation interface over every registered backend.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Provider serving `model_id`, `None` when the identifier is not registered.
    fn provider(&self, model_id: &str) -> Option<Provider>;

    /// Registered identifiers in registration order.
    fn model_ids(&self) -> Vec<String>;

    fn is_registered(&self, model_id: &str) -> bool {
        self.provider(model_id).is_some()
    }

    /// Sends the instruction and code to the model registered as `model_id`.
    ///
    /// Returns `GatewayError::UnknownModel` before any network traffic when
    /// the identifier is unknown.
    async fn invoke(
        &self,
        model_id: &str,
        instruction_text: &str,
        code: &str,
    ) -> Result<String, GatewayError>;
}

/// Text actually sent to a backend for one migration request.
pub fn compose_prompt(instruction_text: &str, code: &str) -> String {
    format!("Question: {instruction_text}\n\nAnswer: {code}")
}
