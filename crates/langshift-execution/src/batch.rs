//! Batch execution over (model, source) pairs.
//!
//! Pairs are planned model-major: every source is migrated with the first
//! model before the second model starts. Up to `max_sessions` sessions run at
//! once; results are reported in plan order regardless of completion order.

use futures::stream::{self, StreamExt};
use langshift_application::{CancellationToken, MigrationOrchestrator};
use langshift_core::config::{AppConfig, CommandSpec};
use langshift_core::migration::ValidationResult;
use langshift_core::report::{BatchReport, PostBatchOutcome};
use langshift_core::SourceArtifact;
use langshift_infrastructure::LoadedSources;
use langshift_infrastructure::command::run_command;
use std::sync::Arc;
use std::time::Instant;

pub struct BatchExecutor {
    orchestrator: Arc<MigrationOrchestrator>,
    max_sessions: usize,
    post_batch: Vec<CommandSpec>,
}

impl BatchExecutor {
    pub fn new(orchestrator: Arc<MigrationOrchestrator>, max_sessions: usize) -> Self {
        Self {
            orchestrator,
            max_sessions: max_sessions.max(1),
            post_batch: Vec::new(),
        }
    }

    pub fn from_config(orchestrator: Arc<MigrationOrchestrator>, config: &AppConfig) -> Self {
        Self::new(orchestrator, config.concurrency.max_sessions)
            .with_post_batch(config.post_batch.clone())
    }

    /// Commands run once after every session has finished.
    pub fn with_post_batch(mut self, commands: Vec<CommandSpec>) -> Self {
        self.post_batch = commands;
        self
    }

    /// Migrates every loaded source with every model and runs post-batch commands.
    ///
    /// Session failures never stop the batch. Cancellation stops new sessions
    /// from making progress and skips post-batch commands.
    pub async fn run(
        &self,
        sources: LoadedSources,
        models: &[String],
        cancel: &CancellationToken,
    ) -> BatchReport {
        let mut report = BatchReport::new();
        report.load_failures = sources.failures;

        let plan = plan(models, &sources.artifacts);
        tracing::info!(
            sessions = plan.len(),
            models = models.len(),
            sources = sources.artifacts.len(),
            max_sessions = self.max_sessions,
            "Starting batch"
        );

        let results: Vec<_> = stream::iter(plan)
            .map(|(model_id, source)| async move {
                let started = Instant::now();
                let session = self
                    .orchestrator
                    .run_session(source, model_id, cancel)
                    .await;
                (session, started.elapsed())
            })
            .buffered(self.max_sessions)
            .collect()
            .await;

        for (session, elapsed) in &results {
            report.record(session, *elapsed);
        }

        if cancel.is_cancelled() {
            tracing::warn!("Batch cancelled; skipping post-batch commands");
        } else {
            report.post_batch = self.run_post_batch().await;
        }

        report.finish();
        tracing::info!(
            sessions = report.sessions.len(),
            requests = report.total_requests,
            elapsed_ms = report.elapsed().as_millis() as u64,
            "Batch finished"
        );
        report
    }

    async fn run_post_batch(&self) -> Vec<PostBatchOutcome> {
        let mut outcomes = Vec::with_capacity(self.post_batch.len());
        for spec in &self.post_batch {
            let name = spec.display_name().to_string();
            tracing::info!(command = %name, "Running post-batch command");
            let result = match run_command(spec).await {
                Ok(result) => result,
                Err(e) => ValidationResult::failed(e.to_string()),
            };
            if result.passed {
                tracing::info!(command = %name, elapsed_ms = result.elapsed_ms, "Post-batch command passed");
            } else {
                tracing::warn!(
                    command = %name,
                    exit_code = result.exit_code,
                    "Post-batch command failed:\n{}",
                    result.diagnostic_text
                );
            }
            outcomes.push(PostBatchOutcome { name, result });
        }
        outcomes
    }
}

/// Model-major ordering of every (model, source) pair.
pub fn plan<'a>(
    models: &'a [String],
    sources: &'a [SourceArtifact],
) -> Vec<(&'a str, &'a SourceArtifact)> {
    models
        .iter()
        .flat_map(|model| sources.iter().map(move |source| (model.as_str(), source)))
        .collect()
}
