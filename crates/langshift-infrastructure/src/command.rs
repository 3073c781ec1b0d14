//! External command execution with a deadline.

use langshift_core::config::CommandSpec;
use langshift_core::migration::ValidationResult;
use langshift_core::validation::combine_output;
use langshift_core::{Result, ShiftError};
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;

/// Runs `spec` to completion or until its timeout.
///
/// The child is killed when the deadline passes. A nonzero exit status or a
/// timeout is a failed [`ValidationResult`], not an error; `Err` means the
/// process could not be started at all.
pub async fn run_command(spec: &CommandSpec) -> Result<ValidationResult> {
    let mut command = Command::new(&spec.program);
    command
        .args(&spec.args)
        .envs(&spec.env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = &spec.working_dir {
        command.current_dir(dir);
    }

    let started = Instant::now();
    let child = command.spawn().map_err(|e| {
        ShiftError::io(format!("failed to start '{}': {e}", spec.display_name()))
    })?;

    // Dropping the wait future on timeout drops the child, which kills it.
    let outcome = tokio::time::timeout(spec.timeout(), child.wait_with_output()).await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match outcome {
        Ok(Ok(output)) => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            Ok(ValidationResult {
                passed: output.status.success(),
                diagnostic_text: combine_output(&stdout, &stderr),
                exit_code: output.status.code(),
                timed_out: false,
                elapsed_ms,
            })
        }
        Ok(Err(e)) => Err(ShiftError::io(format!(
            "failed waiting for '{}': {e}",
            spec.display_name()
        ))),
        Err(_) => Ok(ValidationResult {
            passed: false,
            diagnostic_text: format!(
                "'{}' did not finish within {}s and was killed",
                spec.display_name(),
                spec.timeout_secs
            ),
            exit_code: None,
            timed_out: true,
            elapsed_ms,
        }),
    }
}
