//! Composition root: configuration, secrets and the concrete adapters.

use anyhow::{Context, Result};
use langshift_application::{MigrationOrchestrator, OrchestratorSettings, ProviderLimiter};
use langshift_core::artifact::ArtifactLayout;
use langshift_core::config::AppConfig;
use langshift_infrastructure::{
    CommandValidationRunner, ConfigLoader, FsArtifactStore, SecretStorage,
};
use langshift_interaction::RegistryGateway;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct AppContext {
    pub config: AppConfig,
    pub gateway: Arc<RegistryGateway>,
}

impl AppContext {
    /// Loads `config.toml` (explicit path or the default location) and
    /// `secret.json` with environment fallback, then registers every model.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let loader = match config_path {
            Some(path) => ConfigLoader::with_path(path),
            None => ConfigLoader::new()?,
        };
        let config = loader
            .load()
            .with_context(|| format!("Failed to load {}", loader.path().display()))?;

        let secrets = SecretStorage::new()?
            .load_with_env_fallback()
            .context("Failed to load secrets")?;
        let gateway = RegistryGateway::from_config(&config, &secrets)?;

        Ok(Self {
            config,
            gateway: Arc::new(gateway),
        })
    }

    pub fn limiter(&self) -> ProviderLimiter {
        ProviderLimiter::new(self.config.concurrency.max_calls_per_provider)
    }

    /// Where run logs go; `None` until an output root is configured.
    pub fn logs_dir(&self) -> Option<PathBuf> {
        (!self.config.output.root.as_os_str().is_empty()).then(|| self.config.output.logs_dir())
    }

    /// Orchestrator wired to the filesystem store and command validation.
    ///
    /// Rejects configurations no session could run with.
    pub fn orchestrator(&self) -> Result<MigrationOrchestrator> {
        self.config.validate()?;
        let settings = OrchestratorSettings::from_config(&self.config)?;
        let store = FsArtifactStore::new(ArtifactLayout::new(&self.config.output.root));
        let validator = CommandValidationRunner::from_config(&self.config);

        Ok(MigrationOrchestrator::new(
            self.gateway.clone(),
            Arc::new(store),
            Arc::new(validator),
            self.limiter(),
            settings,
        ))
    }
}
