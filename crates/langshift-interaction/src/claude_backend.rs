//! ClaudeBackend - REST backend for the Anthropic Messages API.

use crate::http_error::{error_from_response, request_error};
use async_trait::async_trait;
use langshift_core::gateway::{BackendError, GenerationParams, ModelBackend};
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Backend that talks to the Claude HTTP API.
#[derive(Clone)]
pub struct ClaudeBackend {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl ClaudeBackend {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn build_request(&self, prompt: &str, params: &GenerationParams) -> CreateMessageRequest {
        CreateMessageRequest {
            model: self.model.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            // The Messages API requires max_tokens on every request.
            max_tokens: params.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: params.temperature,
        }
    }

    async fn send_request(&self, body: &CreateMessageRequest) -> Result<String, BackendError> {
        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(body)
            .send()
            .await
            .map_err(|err| request_error("Claude", err))?;

        if !response.status().is_success() {
            return Err(error_from_response("Claude", response).await);
        }

        let parsed: CreateMessageResponse = response.json().await.map_err(|err| {
            BackendError::Other(format!("Failed to parse Claude response: {err}"))
        })?;

        extract_text_response(parsed)
    }
}

#[async_trait]
impl ModelBackend for ClaudeBackend {
    fn describe(&self) -> String {
        format!("claude:{}", self.model)
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
struct CreateMessageRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct CreateMessageResponse {
    content: Vec<ContentBlockResponse>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum ContentBlockResponse {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

fn extract_text_response(response: CreateMessageResponse) -> Result<String, BackendError> {
    let text: String = response
        .content
        .into_iter()
        .filter_map(|block| match block {
            ContentBlockResponse::Text { text } => Some(text),
            ContentBlockResponse::Other => None,
        })
        .collect();

    if text.is_empty() {
        return Err(BackendError::ExecutionFailed(
            "Claude API returned no text in the response content".into(),
        ));
    }
    Ok(text)
}
