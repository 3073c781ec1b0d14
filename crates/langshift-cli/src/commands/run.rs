use super::{start_run_log, summary};
use crate::context::AppContext;
use anyhow::{Result, bail};
use colored::Colorize;
use langshift_application::CancellationToken;
use langshift_core::gateway::ModelGateway;
use langshift_execution::{BatchExecutor, RunEvent};
use langshift_infrastructure::SourceLoader;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

/// Runs the configured batch plan.
///
/// Models come from `--model`, else `batch.models`, else every registration.
pub async fn run(
    context: &AppContext,
    only_models: Vec<String>,
    run_events: Option<UnboundedReceiver<RunEvent>>,
) -> Result<ExitCode> {
    let orchestrator = Arc::new(context.orchestrator()?);
    let plan = &context.config.batch;
    if plan.sources.is_empty() {
        bail!("no [[batch.sources]] configured");
    }

    let models = if !only_models.is_empty() {
        only_models
    } else if !plan.models.is_empty() {
        plan.models.clone()
    } else {
        context.gateway.model_ids()
    };

    let run_log = start_run_log(context, run_events);
    let sources = SourceLoader::new().load_all(&plan.sources).await;
    println!(
        "🚀 Migrating {} source(s) with {} model(s)",
        sources.artifacts.len(),
        models.len()
    );

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted; no further attempts will start");
                cancel.cancel();
            }
        }
    });

    let report = BatchExecutor::from_config(orchestrator, &context.config)
        .run(sources, &models, &cancel)
        .await;

    summary::print_report(&report);
    if let Some(path) = run_log {
        println!("{} {}", "Run log:".dimmed(), path.display());
    }

    Ok(if report.all_succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
