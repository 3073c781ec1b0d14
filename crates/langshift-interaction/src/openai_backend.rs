//! OpenAiBackend - REST backend for the OpenAI Chat Completions API.

use crate::http_error::{error_from_response, request_error};
use async_trait::async_trait;
use langshift_core::gateway::{BackendError, GenerationParams, ModelBackend};
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Backend that talks to the OpenAI HTTP API.
#[derive(Clone)]
pub struct OpenAiBackend {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiBackend {
    /// Creates a backend with the provided API key and model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Points the backend at a compatible endpoint (proxy, Azure gateway, ...).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn build_request(&self, prompt: &str, params: &GenerationParams) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: params.max_tokens,
            temperature: params.temperature,
        }
    }

    async fn send_request(&self, body: &ChatCompletionRequest) -> Result<String, BackendError> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|err| request_error("OpenAI", err))?;

        if !response.status().is_success() {
            return Err(error_from_response("OpenAI", response).await);
        }

        let parsed: ChatCompletionResponse = response.json().await.map_err(|err| {
            BackendError::Other(format!("Failed to parse OpenAI response: {err}"))
        })?;

        extract_text_response(parsed)
    }
}

#[async_trait]
impl ModelBackend for OpenAiBackend {
    fn describe(&self) -> String {
        format!("openai:{}", self.model)
    }

    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, BackendError> {
        let request = self.build_request(prompt, params);
        self.send_request(&request).await
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

fn extract_text_response(response: ChatCompletionResponse) -> Result<String, BackendError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| {
            BackendError::ExecutionFailed("OpenAI API returned no content in the response".into())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_uses_registration_override() {
        let backend = OpenAiBackend::new("key", "gpt-4o");
        let params = GenerationParams {
            max_tokens: Some(8192),
            temperature: Some(0.2),
        };
        let json = serde_json::to_value(backend.build_request("hi", &params)).unwrap();
        assert_eq!(json["model"], "gpt-4o");
        assert_eq!(json["messages"][0]["content"], "hi");
        assert_eq!(json["max_tokens"], 8192);

        let json =
            serde_json::to_value(backend.build_request("hi", &GenerationParams::default()))
                .unwrap();
        assert!(json.get("max_tokens").is_none());
        assert!(json.get("temperature").is_none());
    }

    #[test]
    fn test_extract_text_response() {
        let parsed: ChatCompletionResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"```kotlin\nclass A\n```"}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text_response(parsed).unwrap(), "```kotlin\nclass A\n```");

        let empty: ChatCompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(
            extract_text_response(empty),
            Err(BackendError::ExecutionFailed(_))
        ));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let backend = OpenAiBackend::new("key", "gpt-4o").with_base_url("http://localhost:8080/v1/");
        assert_eq!(backend.base_url, "http://localhost:8080/v1");
        assert_eq!(backend.describe(), "openai:gpt-4o");
    }
}
