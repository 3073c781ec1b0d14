//! Inbound migration request: JSON in, JSON out.
//!
//! Exit code 0 with a `{original_code, migrated_code, model_used, extra_content}`
//! body on success, 2 with an `{error}` body otherwise.

use crate::context::AppContext;
use anyhow::{Context, Result};
use langshift_application::MigrationService;
use langshift_core::api::{MigrationApiError, MigrationApiRequest};
use std::path::Path;
use std::process::ExitCode;
use tokio::io::AsyncReadExt;

const FAILURE_EXIT_CODE: u8 = 2;

pub async fn run(context: &AppContext, input: Option<&Path>) -> Result<ExitCode> {
    let raw = match input {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buffer)
                .await
                .context("Failed to read request from stdin")?;
            buffer
        }
    };

    let request: MigrationApiRequest = match serde_json::from_str(&raw) {
        Ok(request) => request,
        Err(e) => {
            return respond_error(&MigrationApiError::new(
                MigrationApiError::BAD_REQUEST,
                format!("Invalid request body: {e}"),
            ));
        }
    };

    let service = MigrationService::new(
        context.gateway.clone(),
        context.limiter(),
        context.config.timeouts.model_timeout(),
        context.config.migration.target_language.clone(),
    );

    match service.migrate(&request).await {
        Ok(response) => {
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => respond_error(&err),
    }
}

fn respond_error(err: &MigrationApiError) -> Result<ExitCode> {
    tracing::warn!(status = err.status, "Request failed: {}", err.error);
    println!("{}", serde_json::to_string_pretty(err)?);
    Ok(ExitCode::from(FAILURE_EXIT_CODE))
}
