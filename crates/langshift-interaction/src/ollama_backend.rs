//! OllamaBackend - REST backend for a self-hosted Ollama server.
//!
//! Uses the non-streaming `/api/generate` endpoint. There is no public
//! default host; the base URL always comes from configuration.

use crate::http_error::{error_from_response, request_error};
use async_trait::async_trait;
use langshift_core::gateway::{BackendError, GenerationParams, ModelBackend};
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Clone)]
pub struct OllamaBackend {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaBackend {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    fn build_request(&self, prompt: &str, params: &GenerationParams) -> GenerateRequest {
        let options = (params.max_tokens.is_some() || params.temperature.is_some()).then_some(
            GenerateOptions {
                num_predict: params.max_tokens,
                temperature: params.temperature,
            },
        );

        GenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
            options,
        }
    }
}

#[async_trait]
impl ModelBackend for OllamaBackend {
    fn describe(&self) -> String {
        format!("ollama:{}", self.model)
    }

    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, BackendError> {
        let body = self.build_request(prompt, params);
        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|err| request_error("Ollama", err))?;

        if !response.status().is_success() {
            return Err(error_from_response("Ollama", response).await);
        }

        let parsed: GenerateResponse = response.json().await.map_err(|err| {
            BackendError::Other(format!("Failed to parse Ollama response: {err}"))
        })?;

        if parsed.response.is_empty() {
            return Err(BackendError::ExecutionFailed(
                "Ollama returned an empty response".into(),
            ));
        }
        Ok(parsed.response)
    }
}

#[derive(Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerateOptions>,
}

#[derive(Serialize)]
struct GenerateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves exactly one canned HTTP response on an ephemeral port.
    async fn one_shot_server(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 16 * 1024];
            let _ = socket.read(&mut buf).await;
            let reply = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(reply.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });
        format!("http://{addr}")
    }

    #[test]
    fn test_request_shape() {
        let backend = OllamaBackend::new("http://localhost:11434/", "codellama");
        let params = GenerationParams {
            max_tokens: Some(4096),
            temperature: None,
        };
        let json = serde_json::to_value(backend.build_request("hi", &params)).unwrap();
        assert_eq!(json["model"], "codellama");
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["num_predict"], 4096);
        assert_eq!(backend.base_url, "http://localhost:11434");
    }

    #[tokio::test]
    async fn test_generate_against_local_server() {
        let url = one_shot_server("200 OK", r#"{"model":"codellama","response":"```kotlin\nclass A\n```","done":true}"#).await;
        let backend = OllamaBackend::new(url, "codellama");
        let text = backend
            .generate("hi", &GenerationParams::default())
            .await
            .unwrap();
        assert_eq!(text, "```kotlin\nclass A\n```");
    }

    #[tokio::test]
    async fn test_generate_maps_http_error() {
        let url = one_shot_server("404 Not Found", r#"{"error":"model 'nope' not found"}"#).await;
        let backend = OllamaBackend::new(url, "nope");
        let err = backend
            .generate("hi", &GenerationParams::default())
            .await
            .unwrap_err();
        match err {
            BackendError::ProcessError {
                status_code,
                message,
                is_retryable,
                ..
            } => {
                assert_eq!(status_code, Some(404));
                assert_eq!(message, "model 'nope' not found");
                assert!(!is_retryable);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
