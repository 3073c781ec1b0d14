//! Loads source artifacts named by the batch plan.
//!
//! Local sources are read from disk; GitHub sources are fetched from the raw
//! content host. A file that cannot be loaded is reported and skipped; it
//! never becomes a session.

use langshift_core::config::SourceSpec;
use langshift_core::{Result, ShiftError, SourceArtifact};
use reqwest::Client;
use std::path::Path;

pub const GITHUB_RAW_BASE_URL: &str = "https://raw.githubusercontent.com";

/// Artifacts that loaded, plus one message per source file that did not.
#[derive(Debug, Default)]
pub struct LoadedSources {
    pub artifacts: Vec<SourceArtifact>,
    pub failures: Vec<String>,
}

pub struct SourceLoader {
    client: Client,
    raw_base_url: String,
}

impl Default for SourceLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceLoader {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            raw_base_url: GITHUB_RAW_BASE_URL.to_string(),
        }
    }

    /// Overrides the raw content host (mirrors, tests).
    pub fn with_raw_base_url(mut self, url: impl Into<String>) -> Self {
        self.raw_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub async fn load_all(&self, specs: &[SourceSpec]) -> LoadedSources {
        let mut loaded = LoadedSources::default();
        for spec in specs {
            match spec {
                SourceSpec::Github {
                    repo,
                    branch,
                    file_paths,
                } => {
                    for file_path in file_paths {
                        match self.fetch_github(repo, branch, file_path).await {
                            Ok(artifact) => loaded.artifacts.push(artifact),
                            Err(e) => {
                                tracing::warn!(repo = %repo, path = %file_path, "Skipping source: {e}");
                                loaded.failures.push(format!("{repo}:{file_path}: {e}"));
                            }
                        }
                    }
                }
                SourceSpec::Local { path, extension } => {
                    match load_local(path, extension.as_deref()).await {
                        Ok(mut artifacts) => loaded.artifacts.append(&mut artifacts),
                        Err(e) => {
                            tracing::warn!(path = %path.display(), "Skipping source: {e}");
                            loaded.failures.push(format!("{}: {e}", path.display()));
                        }
                    }
                }
            }
        }
        loaded
    }

    pub async fn fetch_github(
        &self,
        repo: &str,
        branch: &str,
        file_path: &str,
    ) -> Result<SourceArtifact> {
        let file_path = file_path.trim_start_matches('/');
        let url = format!("{}/{repo}/{branch}/{file_path}", self.raw_base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ShiftError::io(format!("GET {url} failed: {}", e.without_url())))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ShiftError::io(format!("GET {url} returned HTTP {status}")));
        }
        let code = response
            .text()
            .await
            .map_err(|e| ShiftError::io(format!("reading {url} failed: {}", e.without_url())))?;

        tracing::debug!(repo, path = file_path, bytes = code.len(), "Fetched source");
        Ok(SourceArtifact::new(format!("{repo}:{file_path}"), file_path, code))
    }
}

/// Reads one file, or every regular file of a directory (non-recursive,
/// sorted by name), optionally filtered by extension.
pub async fn load_local(path: &Path, extension: Option<&str>) -> Result<Vec<SourceArtifact>> {
    let metadata = tokio::fs::metadata(path).await?;
    if metadata.is_file() {
        return Ok(vec![read_local_file(path).await?]);
    }

    let wanted = extension.map(|ext| ext.trim_start_matches('.').to_ascii_lowercase());
    let mut entries = tokio::fs::read_dir(path).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let file_path = entry.path();
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let matches = match &wanted {
            Some(ext) => file_path
                .extension()
                .is_some_and(|e| e.to_string_lossy().eq_ignore_ascii_case(ext)),
            None => true,
        };
        if matches {
            files.push(file_path);
        }
    }
    files.sort();

    let mut artifacts = Vec::with_capacity(files.len());
    for file in files {
        artifacts.push(read_local_file(&file).await?);
    }
    Ok(artifacts)
}

pub async fn read_local_file(path: &Path) -> Result<SourceArtifact> {
    let code = tokio::fs::read_to_string(path).await?;
    let display = path.to_string_lossy().into_owned();
    Ok(SourceArtifact::new(display.clone(), display, code))
}
