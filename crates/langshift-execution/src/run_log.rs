//! JSONL run log fed by [`RunEventLayer`](crate::RunEventLayer).

use crate::run_events::RunEvent;
use langshift_core::{Result, ShiftError};
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Appends run events to `{logs_dir}/run-<timestamp>.jsonl`, one JSON object per line.
#[derive(Debug, Clone)]
pub struct RunLogWriter {
    path: PathBuf,
}

impl RunLogWriter {
    pub fn new(logs_dir: &Path) -> Self {
        let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%SZ");
        Self {
            path: logs_dir.join(format!("run-{stamp}.jsonl")),
        }
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drains `receiver` into the log until every sender is dropped.
    ///
    /// Each line is flushed as it is written so the log is readable while
    /// the batch is still running. Returns the number of lines written.
    pub async fn write_all(&self, mut receiver: mpsc::UnboundedReceiver<RunEvent>) -> Result<usize> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                ShiftError::io(format!("failed to create {}: {e}", parent.display()))
            })?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| ShiftError::io(format!("failed to open {}: {e}", self.path.display())))?;

        let mut written = 0;
        while let Some(event) = receiver.recv().await {
            let mut line = serde_json::to_string(&event)?;
            line.push('\n');
            file.write_all(line.as_bytes()).await?;
            file.flush().await?;
            written += 1;
        }
        Ok(written)
    }

    /// Runs [`write_all`](Self::write_all) on a background task.
    pub fn spawn(self, receiver: mpsc::UnboundedReceiver<RunEvent>) -> JoinHandle<Result<usize>> {
        tokio::spawn(async move {
            let result = self.write_all(receiver).await;
            if let Err(e) = &result {
                tracing::error!(path = %self.path.display(), "Run log writer stopped: {e}");
            }
            result
        })
    }
}
