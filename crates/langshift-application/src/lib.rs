//! Application layer for langshift.
//!
//! Coordinates the gateway, artifact store and validation runner from
//! `langshift-core` into migration sessions and single-shot requests.

pub mod events;
pub mod limiter;
pub mod orchestrator;
pub mod service;

pub use events::{RUN_EVENT_TARGET, SessionState};
pub use limiter::ProviderLimiter;
pub use orchestrator::{MigrationOrchestrator, OrchestratorSettings};
pub use service::MigrationService;
pub use tokio_util::sync::CancellationToken;
