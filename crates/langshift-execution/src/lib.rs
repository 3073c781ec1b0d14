//! Execution layer for langshift.
//!
//! Runs batches of migration sessions and turns their state transitions into
//! a JSONL run log.

pub mod batch;
pub mod run_events;
pub mod run_log;

pub use batch::BatchExecutor;
pub use run_events::{RunEvent, RunEventLayer};
pub use run_log::RunLogWriter;
