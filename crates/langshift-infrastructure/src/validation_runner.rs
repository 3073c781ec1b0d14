//! Per-language validation through configured external commands.

use crate::command::run_command;
use async_trait::async_trait;
use langshift_core::config::{AppConfig, CommandSpec};
use langshift_core::migration::ValidationResult;
use langshift_core::validation::ValidationRunner;
use langshift_core::{Language, Result, ShiftError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Runs the build/test command configured for the target language.
///
/// Commands flagged `shared_tree` operate on one project tree and are
/// serialized behind a single lock; other commands run freely. A language
/// without a command is a configuration error unless unvalidated output was
/// explicitly allowed.
#[derive(Clone, Default)]
pub struct CommandValidationRunner {
    commands: HashMap<Language, CommandSpec>,
    allow_unvalidated: bool,
    shared_tree: Arc<Mutex<()>>,
}

impl CommandValidationRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let mut runner = Self::new().allow_unvalidated(config.migration.allow_unvalidated);
        for (tag, command) in &config.validation {
            runner = runner.with_command(Language::new(tag), command.clone());
        }
        runner
    }

    pub fn with_command(mut self, language: Language, command: CommandSpec) -> Self {
        self.commands.insert(language, command);
        self
    }

    pub fn allow_unvalidated(mut self, allow: bool) -> Self {
        self.allow_unvalidated = allow;
        self
    }
}

#[async_trait]
impl ValidationRunner for CommandValidationRunner {
    async fn run(&self, target_language: &Language) -> Result<ValidationResult> {
        let Some(command) = self.commands.get(target_language) else {
            if !self.allow_unvalidated {
                return Err(ShiftError::config(format!(
                    "no validation command configured for {target_language}"
                )));
            }
            tracing::warn!(
                language = %target_language,
                "No validation command configured, accepting output unvalidated"
            );
            return Ok(ValidationResult::passed(format!(
                "validation skipped: no command configured for {target_language}"
            )));
        };

        let _guard = if command.shared_tree {
            Some(self.shared_tree.lock().await)
        } else {
            None
        };

        tracing::debug!(
            language = %target_language,
            command = command.display_name(),
            "Running validation"
        );
        let result = run_command(command).await?;
        tracing::debug!(
            language = %target_language,
            passed = result.passed,
            exit_code = ?result.exit_code,
            timed_out = result.timed_out,
            elapsed_ms = result.elapsed_ms,
            "Validation finished"
        );
        Ok(result)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn sh(script: &str) -> CommandSpec {
        CommandSpec {
            name: None,
            program: "sh".into(),
            args: vec!["-c".into(), script.into()],
            working_dir: None,
            env: HashMap::new(),
            timeout_secs: 30,
            shared_tree: true,
        }
    }

    #[tokio::test]
    async fn test_unconfigured_language_is_config_error() {
        let runner = CommandValidationRunner::new();
        let err = runner.run(&Language::new("swift")).await.unwrap_err();
        assert!(err.is_config());
    }

    #[tokio::test]
    async fn test_unconfigured_language_skips_only_when_allowed() {
        let runner = CommandValidationRunner::new().allow_unvalidated(true);
        let result = runner.run(&Language::new("swift")).await.unwrap();
        assert!(result.passed);
        assert!(result.diagnostic_text.contains("skipped"));
    }

    #[tokio::test]
    async fn test_language_lookup_is_case_insensitive() {
        let runner = CommandValidationRunner::new()
            .with_command(Language::new("Kotlin"), sh("echo 'e: type mismatch' >&2; exit 1"));
        let result = runner.run(&Language::new("kotlin")).await.unwrap();
        assert!(!result.passed);
        assert_eq!(result.diagnostic_text.trim(), "e: type mismatch");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_shared_tree_runs_are_serialized() {
        let runner = CommandValidationRunner::new()
            .with_command(Language::new("kotlin"), sh("sleep 0.3"));
        let kotlin = Language::new("kotlin");

        let started = Instant::now();
        let (a, b) = tokio::join!(runner.run(&kotlin), runner.run(&kotlin));
        assert!(a.unwrap().passed && b.unwrap().passed);
        assert!(started.elapsed() >= Duration::from_millis(600));
    }
}
