//! Registry-backed model gateway.

use crate::claude_backend::ClaudeBackend;
use crate::gemini_backend::GeminiBackend;
use crate::ollama_backend::OllamaBackend;
use crate::openai_backend::OpenAiBackend;
use async_trait::async_trait;
use langshift_core::ShiftError;
use langshift_core::config::{AppConfig, ModelRegistration, Provider, SecretConfig};
use langshift_core::gateway::{
    GatewayError, GenerationParams, ModelBackend, ModelGateway, compose_prompt,
};
use std::sync::Arc;

struct RegisteredModel {
    id: String,
    provider: Provider,
    params: GenerationParams,
    backend: Arc<dyn ModelBackend>,
}

/// Resolves model identifiers to registered backends.
///
/// Lookup is exact on the identifier. Registration order is preserved so
/// `model_ids` lists models the way the configuration does.
#[derive(Default)]
pub struct RegistryGateway {
    models: Vec<RegisteredModel>,
}

impl RegistryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `backend` under `id`, replacing an earlier registration with the same id.
    pub fn register(
        &mut self,
        id: impl Into<String>,
        provider: Provider,
        params: GenerationParams,
        backend: Arc<dyn ModelBackend>,
    ) {
        let id = id.into();
        self.models.retain(|m| m.id != id);
        self.models.push(RegisteredModel {
            id,
            provider,
            params,
            backend,
        });
    }

    /// Builds a backend for every `[[model]]` entry of the configuration.
    ///
    /// Fails with a configuration error when a provider's credentials or
    /// required endpoint are missing, naming the offending model.
    pub fn from_config(config: &AppConfig, secrets: &SecretConfig) -> Result<Self, ShiftError> {
        let mut gateway = Self::new();
        for registration in &config.models {
            let backend = build_backend(registration, config, secrets)?;
            let params = GenerationParams {
                max_tokens: registration.max_tokens,
                temperature: registration.temperature,
            };
            tracing::debug!(
                model = %registration.id,
                backend = %backend.describe(),
                "Registered model"
            );
            gateway.register(
                registration.id.clone(),
                registration.provider,
                params,
                backend,
            );
        }
        Ok(gateway)
    }

    fn lookup(&self, model_id: &str) -> Option<&RegisteredModel> {
        self.models.iter().find(|m| m.id == model_id)
    }
}

fn build_backend(
    registration: &ModelRegistration,
    config: &AppConfig,
    secrets: &SecretConfig,
) -> Result<Arc<dyn ModelBackend>, ShiftError> {
    let provider = registration.provider;
    let base_url = config
        .providers
        .get(provider)
        .and_then(|endpoint| endpoint.base_url.clone())
        .filter(|url| !url.trim().is_empty());

    let api_key = || {
        secrets.api_key(provider).map(str::to_string).ok_or_else(|| {
            ShiftError::config(format!(
                "no API key for provider '{provider}' (needed by model '{}')",
                registration.id
            ))
        })
    };

    let backend: Arc<dyn ModelBackend> = match provider {
        Provider::OpenAi => {
            let mut backend = OpenAiBackend::new(api_key()?, &registration.model);
            if let Some(url) = base_url {
                backend = backend.with_base_url(url);
            }
            Arc::new(backend)
        }
        Provider::Gemini => {
            let mut backend = GeminiBackend::new(api_key()?, &registration.model);
            if let Some(url) = base_url {
                backend = backend.with_base_url(url);
            }
            Arc::new(backend)
        }
        Provider::Claude => {
            let mut backend = ClaudeBackend::new(api_key()?, &registration.model);
            if let Some(url) = base_url {
                backend = backend.with_base_url(url);
            }
            Arc::new(backend)
        }
        Provider::Ollama => {
            let url = base_url.ok_or_else(|| {
                ShiftError::config(format!(
                    "providers.ollama.base_url is required by model '{}'",
                    registration.id
                ))
            })?;
            Arc::new(OllamaBackend::new(url, &registration.model))
        }
    };
    Ok(backend)
}

#[async_trait]
impl ModelGateway for RegistryGateway {
    fn provider(&self, model_id: &str) -> Option<Provider> {
        self.lookup(model_id).map(|m| m.provider)
    }

    fn model_ids(&self) -> Vec<String> {
        self.models.iter().map(|m| m.id.clone()).collect()
    }

    async fn invoke(
        &self,
        model_id: &str,
        instruction_text: &str,
        code: &str,
    ) -> Result<String, GatewayError> {
        let model = self
            .lookup(model_id)
            .ok_or_else(|| GatewayError::UnknownModel(model_id.to_string()))?;

        let prompt = compose_prompt(instruction_text, code);
        tracing::debug!(
            model = %model.id,
            backend = %model.backend.describe(),
            prompt_len = prompt.len(),
            "Invoking model"
        );

        let output = model.backend.generate(&prompt, &model.params).await?;
        tracing::debug!(model = %model.id, output_len = output.len(), "Model responded");
        Ok(output)
    }
}
