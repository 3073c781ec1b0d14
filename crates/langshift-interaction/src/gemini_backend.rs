//! GeminiBackend - REST backend for the Gemini `generateContent` API.

use crate::http_error::{error_from_response, request_error};
use async_trait::async_trait;
use langshift_core::gateway::{BackendError, GenerationParams, ModelBackend};
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Backend that talks to the Gemini HTTP API.
#[derive(Clone)]
pub struct GeminiBackend {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiBackend {
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

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn build_request(prompt: &str, params: &GenerationParams) -> GenerateContentRequest {
        let generation_config = (params.max_tokens.is_some() || params.temperature.is_some())
            .then_some(GenerationConfig {
                max_output_tokens: params.max_tokens,
                temperature: params.temperature,
            });

        GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config,
        }
    }

    async fn send_request(&self, body: &GenerateContentRequest) -> Result<String, BackendError> {
        // Key goes in a header so it never shows up in logged URLs.
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|err| request_error("Gemini", err))?;

        if !response.status().is_success() {
            return Err(error_from_response("Gemini", response).await);
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|err| {
            BackendError::Other(format!("Failed to parse Gemini response: {err}"))
        })?;

        extract_text_response(parsed)
    }
}

#[async_trait]
impl ModelBackend for GeminiBackend {
    fn describe(&self) -> String {
        format!("gemini:{}", self.model)
    }

    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, BackendError> {
        let request = Self::build_request(prompt, params);
        self.send_request(&request).await
    }
}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

fn extract_text_response(response: GenerateContentResponse) -> Result<String, BackendError> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts.into_iter().map(|part| part.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(BackendError::ExecutionFailed(
            "Gemini API returned no text in the response".into(),
        ));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_config_only_when_set() {
        let json =
            serde_json::to_value(GeminiBackend::build_request("hi", &GenerationParams::default()))
                .unwrap();
        assert!(json.get("generationConfig").is_none());
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hi");

        let params = GenerationParams {
            max_tokens: Some(8192),
            temperature: None,
        };
        let json = serde_json::to_value(GeminiBackend::build_request("hi", &params)).unwrap();
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 8192);
    }

    #[test]
    fn test_extract_joins_parts() {
        let parsed: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"```kotlin\n"},{"text":"class A\n```"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text_response(parsed).unwrap(), "```kotlin\nclass A\n```");

        let blocked: GenerateContentResponse =
            serde_json::from_str(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).unwrap();
        assert!(extract_text_response(blocked).is_err());
    }

    #[test]
    fn test_endpoint() {
        let backend = GeminiBackend::new("key", "gemini-pro");
        assert_eq!(
            backend.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent"
        );
    }
}
