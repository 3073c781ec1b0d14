//! Structured run events.
//!
//! State transitions are emitted as `tracing` events on [`RUN_EVENT_TARGET`]
//! so a subscriber layer can turn them into a machine-readable run log.

use strum::Display;

/// `tracing` target carrying session state transitions.
pub const RUN_EVENT_TARGET: &str = "langshift::run";

/// Orchestrator states. The last four are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SessionState {
    Ready,
    Requesting,
    Extracting,
    Persisting,
    Validating,
    Retrying,
    Success,
    Failed,
    Rejected,
    Aborted,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Success | Self::Failed | Self::Rejected | Self::Aborted
        )
    }
}
