use anyhow::{Context, Result};
use langshift_core::Language;
use langshift_core::migration::extract;
use serde_json::Value;
use std::path::Path;
use std::process::ExitCode;

/// Prints the extraction result for a saved response as JSON.
///
/// Accepts either raw model output or a metadata sidecar, whose
/// `raw_output` is used. Exits with 2 when no code could be extracted.
pub async fn run(file: &Path, language: Option<&str>) -> Result<ExitCode> {
    let content = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let raw = response_text(&content);

    let language = language.map(Language::new);
    let result = extract(&raw, language.as_ref());
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(if result.is_empty() {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    })
}

fn response_text(content: &str) -> String {
    match serde_json::from_str::<Value>(content) {
        Ok(Value::Object(map)) => match map.get("raw_output") {
            Some(Value::String(raw)) => raw.clone(),
            _ => content.to_string(),
        },
        _ => content.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_text_reads_sidecar() {
        let sidecar = r#"{"index": 0, "raw_output": "```kotlin\nclass Foo\n```"}"#;
        assert_eq!(response_text(sidecar), "```kotlin\nclass Foo\n```");
    }

    #[test]
    fn test_response_text_passes_plain_output_through() {
        let raw = "Sure:\n```kotlin\nclass Foo\n```";
        assert_eq!(response_text(raw), raw);
        assert_eq!(response_text("[1, 2]"), "[1, 2]");
    }
}
