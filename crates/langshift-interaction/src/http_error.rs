//! HTTP failure mapping shared by the REST backends.

use langshift_core::gateway::BackendError;
use reqwest::{StatusCode, header::HeaderValue};
use std::time::Duration;

/// Maps a transport-level failure (connect, TLS, body read) to a backend error.
pub(crate) fn request_error(provider: &str, err: reqwest::Error) -> BackendError {
    let is_retryable = err.is_connect() || err.is_timeout();
    BackendError::ProcessError {
        status_code: None,
        message: format!("{provider} API request failed: {}", err.without_url()),
        is_retryable,
        retry_after: None,
    }
}

/// Maps a non-success HTTP response to a backend error.
///
/// Understands both `{"error": {"message": ...}}` (OpenAI, Claude, Gemini)
/// and `{"error": "..."}` (Ollama); anything else is reported verbatim.
pub(crate) fn map_http_error(
    status: StatusCode,
    body: String,
    retry_after: Option<Duration>,
) -> BackendError {
    let message = error_message(&body).unwrap_or(body);

    let is_retryable = matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    );

    if let Some(delay) = retry_after {
        BackendError::process_error_with_retry_after(status.as_u16(), message, is_retryable, delay)
    } else {
        BackendError::ProcessError {
            status_code: Some(status.as_u16()),
            message,
            is_retryable,
            retry_after: None,
        }
    }
}

fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let error = value.get("error")?;
    error
        .get("message")
        .and_then(|m| m.as_str())
        .or_else(|| error.as_str())
        .map(str::to_string)
}

pub(crate) fn parse_retry_after(header: Option<&HeaderValue>) -> Option<Duration> {
    let value = header?.to_str().ok()?;
    // HTTP-date form is not parsed
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

/// Reads a failed response and converts it, keeping any `retry-after` hint.
pub(crate) async fn error_from_response(
    provider: &str,
    response: reqwest::Response,
) -> BackendError {
    let status = response.status();
    let retry_after = parse_retry_after(response.headers().get("retry-after"));
    let body_text = response
        .text()
        .await
        .unwrap_or_else(|_| format!("Failed to read {provider} error body"));
    map_http_error(status, body_text, retry_after)
}
