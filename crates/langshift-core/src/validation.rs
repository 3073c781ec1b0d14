//! Validation runner contract.

use crate::error::Result;
use crate::language::Language;
use crate::migration::model::ValidationResult;
use async_trait::async_trait;

/// Executes the build/test command for a target language.
///
/// A nonzero exit status or an elapsed deadline both yield `passed = false`;
/// the combined stdout/stderr is the diagnostic. `Err` is reserved for the
/// runner itself being unusable (the command could not be spawned).
#[async_trait]
pub trait ValidationRunner: Send + Sync {
    async fn run(&self, target_language: &Language) -> Result<ValidationResult>;
}

/// Joins captured stdout and stderr into one diagnostic text.
pub fn combine_output(stdout: &str, stderr: &str) -> String {
    match (stdout.trim().is_empty(), stderr.trim().is_empty()) {
        (true, true) => String::new(),
        (false, true) => stdout.to_string(),
        (true, false) => stderr.to_string(),
        (false, false) => format!("{stdout}\n{stderr}"),
    }
}
