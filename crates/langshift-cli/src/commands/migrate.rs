use super::{start_run_log, summary};
use crate::context::AppContext;
use anyhow::{Context, Result};
use langshift_application::CancellationToken;
use langshift_core::migration::TerminalState;
use langshift_core::report::BatchReport;
use langshift_execution::RunEvent;
use langshift_infrastructure::source_loader::read_local_file;
use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;
use tokio::sync::mpsc::UnboundedReceiver;

/// Runs one session for `file` with `model`.
pub async fn run(
    context: &AppContext,
    file: &Path,
    model: &str,
    run_events: Option<UnboundedReceiver<RunEvent>>,
) -> Result<ExitCode> {
    let orchestrator = context.orchestrator()?;
    let source = read_local_file(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let run_log = start_run_log(context, run_events);

    let started = Instant::now();
    let session = orchestrator
        .run_session(&source, model, &CancellationToken::new())
        .await;

    let mut report = BatchReport::new();
    report.record(&session, started.elapsed());
    report.finish();
    summary::print_report(&report);
    if let Some(artifact) = session.last_artifact() {
        println!("📄 {}", artifact.code_path.display());
    }
    if let Some(path) = run_log {
        println!("Run log: {}", path.display());
    }

    Ok(match session.terminal_state {
        Some(TerminalState::Success) => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}
