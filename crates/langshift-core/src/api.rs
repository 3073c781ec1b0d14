//! Wire types of the single-operation migration request.

use serde::{Deserialize, Serialize};

/// Inbound request: migrate `code` with `model` following `prompt`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationApiRequest {
    pub model: String,
    pub prompt: String,
    pub code: String,
}

/// Successful response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationApiResponse {
    pub original_code: String,
    pub migrated_code: String,
    pub model_used: String,
    /// Prose the model wrote around the code block.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub extra_content: String,
}

/// Failure response body paired with an HTTP-style status code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationApiError {
    #[serde(skip)]
    pub status: u16,
    pub error: String,
}

impl MigrationApiError {
    pub const BAD_REQUEST: u16 = 400;
    pub const UNPROCESSABLE: u16 = 422;
    pub const BAD_GATEWAY: u16 = 502;
    pub const GATEWAY_TIMEOUT: u16 = 504;

    pub fn new(status: u16, error: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_has_only_error_field() {
        let err = MigrationApiError::new(MigrationApiError::BAD_REQUEST, "Invalid model name");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json, serde_json::json!({ "error": "Invalid model name" }));
    }

    #[test]
    fn test_response_omits_empty_extra() {
        let response = MigrationApiResponse {
            original_code: "public class Foo{}".into(),
            migrated_code: "class Foo".into(),
            model_used: "m".into(),
            extra_content: String::new(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("extra_content").is_none());
        assert_eq!(json["migrated_code"], "class Foo");
    }
}
