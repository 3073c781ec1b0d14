//! Single-shot migration request: one model call, no persistence, no
//! validation, no retry.

use crate::limiter::ProviderLimiter;
use langshift_core::Language;
use langshift_core::api::{MigrationApiError, MigrationApiRequest, MigrationApiResponse};
use langshift_core::gateway::{GatewayError, ModelGateway};
use langshift_core::migration::extract;
use std::sync::Arc;
use std::time::Duration;

pub struct MigrationService {
    gateway: Arc<dyn ModelGateway>,
    limiter: ProviderLimiter,
    timeout: Duration,
    /// Fence label to prefer when extracting; any fence is accepted when unset.
    target_language: Option<Language>,
}

impl MigrationService {
    pub fn new(
        gateway: Arc<dyn ModelGateway>,
        limiter: ProviderLimiter,
        timeout: Duration,
        target_language: Option<Language>,
    ) -> Self {
        Self {
            gateway,
            limiter,
            timeout,
            target_language,
        }
    }

    /// Sends `prompt` and `code` to `model` and returns the extracted code.
    ///
    /// Status codes on failure: 400 unknown model, 422 nothing extractable,
    /// 502 backend failure, 504 deadline exceeded.
    pub async fn migrate(
        &self,
        request: &MigrationApiRequest,
    ) -> Result<MigrationApiResponse, MigrationApiError> {
        let Some(provider) = self.gateway.provider(&request.model) else {
            tracing::warn!(model = %request.model, "Rejected request for unknown model");
            return Err(MigrationApiError::new(
                MigrationApiError::BAD_REQUEST,
                "Invalid model name",
            ));
        };

        let _permit = self.limiter.acquire(provider).await.map_err(|e| {
            MigrationApiError::new(MigrationApiError::BAD_GATEWAY, e.to_string())
        })?;

        let call = self
            .gateway
            .invoke(&request.model, &request.prompt, &request.code);
        let raw = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(GatewayError::UnknownModel(_))) => {
                return Err(MigrationApiError::new(
                    MigrationApiError::BAD_REQUEST,
                    "Invalid model name",
                ));
            }
            Ok(Err(GatewayError::Backend(e))) => {
                tracing::warn!(model = %request.model, "Backend failed: {e}");
                return Err(MigrationApiError::new(
                    MigrationApiError::BAD_GATEWAY,
                    e.to_string(),
                ));
            }
            Err(_) => {
                return Err(MigrationApiError::new(
                    MigrationApiError::GATEWAY_TIMEOUT,
                    format!("model did not respond within {}s", self.timeout.as_secs()),
                ));
            }
        };

        let extraction = extract(&raw, self.target_language.as_ref());
        if extraction.is_empty() {
            return Err(MigrationApiError::new(
                MigrationApiError::UNPROCESSABLE,
                "No code block could be extracted from the model output",
            ));
        }

        Ok(MigrationApiResponse {
            original_code: request.code.clone(),
            migrated_code: extraction.code,
            model_used: request.model.clone(),
            extra_content: extraction.extra,
        })
    }
}
