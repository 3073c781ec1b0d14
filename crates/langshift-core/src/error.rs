//! Error types for langshift.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// A shared error type for the whole migration pipeline.
///
/// Per-artifact failures (backend, extraction, validation) are modelled as
/// attempt outcomes by the orchestrator and only surface here when they have
/// to cross a crate boundary. `Config` is the only variant that aborts a batch.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum ShiftError {
    /// The requested model identifier is not registered with the gateway
    #[error("Unknown model: '{0}'")]
    UnknownModel(String),

    /// Transport or provider failure while invoking a model backend
    #[error("Backend error: {0}")]
    Backend(String),

    /// An operation exceeded its deadline
    #[error("{operation} timed out after {}s", .after.as_secs())]
    Timeout {
        operation: String,
        after: Duration,
    },

    /// No code could be extracted from the model output
    #[error("No code could be extracted from the model output")]
    EmptyExtraction,

    /// IO error (file system operations, process spawning)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", etc.
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Prompt template rendering error
    #[error("Template error: {0}")]
    Template(String),

    /// The session was cancelled before reaching a terminal state
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ShiftError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates an UnknownModel error
    pub fn unknown_model(model_id: impl Into<String>) -> Self {
        Self::UnknownModel(model_id.into())
    }

    /// Creates a Backend error
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    /// Creates a Timeout error
    pub fn timeout(operation: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            after,
        }
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is an UnknownModel error
    pub fn is_unknown_model(&self) -> bool {
        matches!(self, Self::UnknownModel(_))
    }

    /// Check if this is an IO error
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    /// Check if this is a config error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Check if this is a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Whether the orchestrator may spend another attempt after this error.
    ///
    /// Unknown models, configuration problems and persistence failures end
    /// the session; everything produced by a single model round-trip does not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Backend(_) | Self::Timeout { .. } | Self::EmptyExtraction
        )
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for ShiftError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for ShiftError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for ShiftError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for ShiftError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<minijinja::Error> for ShiftError {
    fn from(err: minijinja::Error) -> Self {
        Self::Template(err.to_string())
    }
}

impl From<anyhow::Error> for ShiftError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, ShiftError>`.
pub type Result<T> = std::result::Result<T, ShiftError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(ShiftError::backend("503").is_retryable());
        assert!(ShiftError::EmptyExtraction.is_retryable());
        assert!(ShiftError::timeout("model call", Duration::from_secs(5)).is_retryable());

        assert!(!ShiftError::unknown_model("nope").is_retryable());
        assert!(!ShiftError::io("disk full").is_retryable());
        assert!(!ShiftError::config("missing endpoint").is_retryable());
    }

    #[test]
    fn test_io_conversion_keeps_kind() {
        let err: ShiftError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
        assert!(err.is_io());
        assert!(err.to_string().contains("PermissionDenied"));
    }

    #[test]
    fn test_timeout_message() {
        let err = ShiftError::timeout("validation", Duration::from_secs(30));
        assert_eq!(err.to_string(), "validation timed out after 30s");
    }
}
