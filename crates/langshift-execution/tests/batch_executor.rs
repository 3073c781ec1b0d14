use async_trait::async_trait;
use langshift_application::{
    CancellationToken, MigrationOrchestrator, OrchestratorSettings, ProviderLimiter,
};
use langshift_core::artifact::ArtifactLayout;
use langshift_core::config::{CommandSpec, Provider};
use langshift_core::gateway::{GatewayError, ModelGateway};
use langshift_core::migration::{PromptConfig, TerminalState, ValidationResult};
use langshift_core::validation::ValidationRunner;
use langshift_core::{Language, Result, SourceArtifact};
use langshift_execution::{BatchExecutor, RunEventLayer};
use langshift_infrastructure::{FsArtifactStore, LoadedSources};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use tracing_subscriber::layer::SubscriberExt;

const LLAMA: &str = "Ollama - CodeLlama";
const GPT: &str = "OpenAI - GPT-4";

/// Answers every call with a fenced class after a short delay and tracks
/// how many calls overlap.
#[derive(Default)]
struct SlowGateway {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

#[async_trait]
impl ModelGateway for SlowGateway {
    fn provider(&self, model_id: &str) -> Option<Provider> {
        match model_id {
            LLAMA => Some(Provider::Ollama),
            GPT => Some(Provider::OpenAi),
            _ => None,
        }
    }

    fn model_ids(&self) -> Vec<String> {
        vec![LLAMA.into(), GPT.into()]
    }

    async fn invoke(
        &self,
        model_id: &str,
        _instruction_text: &str,
        code: &str,
    ) -> std::result::Result<String, GatewayError> {
        if self.provider(model_id).is_none() {
            return Err(GatewayError::UnknownModel(model_id.into()));
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(format!("```kotlin\n// {model_id}\n{}\n```", code.replace("public ", "")))
    }
}

struct PassingValidator;

#[async_trait]
impl ValidationRunner for PassingValidator {
    async fn run(&self, _target_language: &Language) -> Result<ValidationResult> {
        Ok(ValidationResult::passed("ok"))
    }
}

fn orchestrator(gateway: Arc<SlowGateway>, root: &std::path::Path) -> Arc<MigrationOrchestrator> {
    Arc::new(MigrationOrchestrator::new(
        gateway,
        Arc::new(FsArtifactStore::new(ArtifactLayout::new(root))),
        Arc::new(PassingValidator),
        ProviderLimiter::new(8),
        OrchestratorSettings {
            source_language: Language::new("java"),
            target_language: Language::new("kotlin"),
            max_retries: 1,
            model_timeout: Duration::from_secs(5),
            prompt: PromptConfig::default(),
            max_retry_delay: Duration::from_millis(10),
        },
    ))
}

fn sources(names: &[&str]) -> LoadedSources {
    LoadedSources {
        artifacts: names
            .iter()
            .map(|name| {
                SourceArtifact::new(
                    format!("{name}.java"),
                    format!("{name}.java"),
                    format!("public class {name} {{}}"),
                )
            })
            .collect(),
        failures: Vec::new(),
    }
}

fn models(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|id| id.to_string()).collect()
}

#[tokio::test]
async fn sessions_run_model_major_and_are_summarized() {
    let temp_dir = TempDir::new().unwrap();
    let gateway = Arc::new(SlowGateway::default());
    let executor = BatchExecutor::new(orchestrator(gateway.clone(), temp_dir.path()), 1);

    let mut loaded = sources(&["Foo", "Bar"]);
    loaded.failures.push("acme/app:Missing.java: HTTP 404".into());
    let report = executor
        .run(loaded, &models(&[LLAMA, GPT]), &CancellationToken::new())
        .await;

    let order: Vec<(&str, &str)> = report
        .sessions
        .iter()
        .map(|s| (s.model_id.as_str(), s.source_artifact_id.as_str()))
        .collect();
    assert_eq!(
        order,
        vec![
            (LLAMA, "Foo.java"),
            (LLAMA, "Bar.java"),
            (GPT, "Foo.java"),
            (GPT, "Bar.java"),
        ]
    );
    assert_eq!(report.count(TerminalState::Success), 4);
    assert_eq!(report.total_requests, 4);
    assert_eq!(report.model_times_ms.len(), 2);
    assert_eq!(report.load_failures.len(), 1);
    assert!(!report.all_succeeded());
    assert!(report.finished_at.is_some());
    assert!(temp_dir.path().join("src/Foo.kt").exists());
    assert_eq!(gateway.peak.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn models_sharing_a_source_do_not_abort_each_other() {
    let temp_dir = TempDir::new().unwrap();
    let gateway = Arc::new(SlowGateway::default());
    let executor = BatchExecutor::new(orchestrator(gateway.clone(), temp_dir.path()), 2);

    for _ in 0..10 {
        let report = executor
            .run(sources(&["Foo"]), &models(&[LLAMA, GPT]), &CancellationToken::new())
            .await;
        assert_eq!(report.count(TerminalState::Aborted), 0);
        assert_eq!(report.count(TerminalState::Success), 2);

        let latest = std::fs::read_to_string(temp_dir.path().join("src/Foo.kt")).unwrap();
        assert!(
            [LLAMA, GPT]
                .iter()
                .any(|model| latest == format!("// {model}\nclass Foo {{}}")),
            "latest file is not one complete model output: {latest:?}"
        );
    }
    assert_eq!(gateway.peak.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn concurrent_sessions_are_bounded() {
    let temp_dir = TempDir::new().unwrap();
    let gateway = Arc::new(SlowGateway::default());
    let executor = BatchExecutor::new(orchestrator(gateway.clone(), temp_dir.path()), 2);

    let report = executor
        .run(
            sources(&["A", "B", "C", "D", "E"]),
            &models(&[LLAMA]),
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(report.sessions.len(), 5);
    assert!(report.all_succeeded());
    assert_eq!(gateway.calls.load(Ordering::SeqCst), 5);
    assert_eq!(gateway.peak.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn unknown_model_does_not_stop_the_batch() {
    let temp_dir = TempDir::new().unwrap();
    let gateway = Arc::new(SlowGateway::default());
    let executor = BatchExecutor::new(orchestrator(gateway.clone(), temp_dir.path()), 1);

    let report = executor
        .run(
            sources(&["Foo"]),
            &models(&["Retired - Model", LLAMA]),
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(report.count(TerminalState::Rejected), 1);
    assert_eq!(report.count(TerminalState::Success), 1);
    assert_eq!(report.sessions[0].attempts, 0);
    assert_eq!(report.total_requests, 1);
}

#[tokio::test]
async fn cancelled_batch_skips_post_batch_commands() {
    let temp_dir = TempDir::new().unwrap();
    let gateway = Arc::new(SlowGateway::default());
    let executor = BatchExecutor::new(orchestrator(gateway.clone(), temp_dir.path()), 1)
        .with_post_batch(vec![CommandSpec {
            name: Some("never".into()),
            program: "true".into(),
            args: vec![],
            working_dir: None,
            env: HashMap::new(),
            timeout_secs: 5,
            shared_tree: true,
        }]);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = executor
        .run(sources(&["Foo", "Bar"]), &models(&[LLAMA]), &cancel)
        .await;

    assert_eq!(report.count(TerminalState::Aborted), 2);
    assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
    assert!(report.post_batch.is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn post_batch_failures_are_reported() {
    let temp_dir = TempDir::new().unwrap();
    let gateway = Arc::new(SlowGateway::default());
    let sh = |name: &str, script: &str| CommandSpec {
        name: Some(name.into()),
        program: "sh".into(),
        args: vec!["-c".into(), script.into()],
        working_dir: None,
        env: HashMap::new(),
        timeout_secs: 5,
        shared_tree: true,
    };
    let executor = BatchExecutor::new(orchestrator(gateway, temp_dir.path()), 1).with_post_batch(
        vec![
            sh("scanner", "echo 'no findings'"),
            sh("test suite", "echo '2 tests failed' >&2; exit 3"),
        ],
    );

    let report = executor
        .run(sources(&["Foo"]), &models(&[LLAMA]), &CancellationToken::new())
        .await;

    assert!(report.all_succeeded());
    assert_eq!(report.post_batch.len(), 2);
    assert!(report.post_batch[0].result.passed);
    let failed = &report.post_batch[1];
    assert_eq!(failed.name, "test suite");
    assert!(!failed.result.passed);
    assert_eq!(failed.result.exit_code, Some(3));
    assert!(failed.result.diagnostic_text.contains("2 tests failed"));
}

#[tokio::test]
async fn state_transitions_reach_the_run_event_layer() {
    let temp_dir = TempDir::new().unwrap();
    let gateway = Arc::new(SlowGateway::default());
    let executor = BatchExecutor::new(orchestrator(gateway, temp_dir.path()), 1);

    let (layer, mut receiver) = RunEventLayer::channel();
    let subscriber = tracing_subscriber::registry().with(layer);
    let _guard = tracing::subscriber::set_default(subscriber);

    executor
        .run(sources(&["Foo"]), &models(&[LLAMA]), &CancellationToken::new())
        .await;

    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    let states: Vec<&str> = events
        .iter()
        .filter_map(|event| event.field_str("state"))
        .collect();
    assert_eq!(
        states,
        vec![
            "ready",
            "requesting",
            "extracting",
            "persisting",
            "validating",
            "success"
        ]
    );
    let last = events.last().unwrap();
    assert_eq!(last.message, "session finished");
    assert_eq!(last.field_str("model"), Some(LLAMA));
}
