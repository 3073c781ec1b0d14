pub mod extract;
pub mod migrate;
pub mod models;
pub mod request;
pub mod run;
mod summary;

use crate::context::AppContext;
use langshift_execution::{RunEvent, RunLogWriter};
use std::path::PathBuf;
use tokio::sync::mpsc::UnboundedReceiver;

/// Starts writing run events to `{root}/logs/run-<timestamp>.jsonl`.
///
/// Returns the log path, or `None` when no output root or receiver is available.
fn start_run_log(
    context: &AppContext,
    run_events: Option<UnboundedReceiver<RunEvent>>,
) -> Option<PathBuf> {
    let (Some(logs_dir), Some(receiver)) = (context.logs_dir(), run_events) else {
        return None;
    };
    let writer = RunLogWriter::new(&logs_dir);
    let path = writer.path().to_path_buf();
    writer.spawn(receiver);
    Some(path)
}
