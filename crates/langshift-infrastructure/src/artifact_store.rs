//! Filesystem implementation of [`ArtifactStore`].

use crate::storage::AtomicFile;
use async_trait::async_trait;
use langshift_core::Result;
use langshift_core::artifact::{ArtifactKey, ArtifactLayout, ArtifactLocation, ArtifactStore};
use langshift_core::migration::Attempt;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Attempt code path whose content currently sits in a latest file.
type LatestOwner = Arc<Mutex<Option<PathBuf>>>;

/// Writes artifacts under an [`ArtifactLayout`] root.
///
/// Each persist writes four files: the attempt's own code and metadata,
/// which later attempts never touch, and the undecorated latest code and
/// metadata, which always reflect the last persisted attempt.
///
/// Sessions migrating the same source with different models share the latest
/// files. Writes to them are serialized per latest code path, and a session
/// only rewrites the latest metadata while its attempt still owns the latest
/// code.
pub struct FsArtifactStore {
    layout: ArtifactLayout,
    latest: Mutex<HashMap<PathBuf, LatestOwner>>,
}

impl FsArtifactStore {
    pub fn new(layout: ArtifactLayout) -> Self {
        Self {
            layout,
            latest: Mutex::new(HashMap::new()),
        }
    }

    async fn latest_owner(&self, code_path: &Path) -> LatestOwner {
        self.latest
            .lock()
            .await
            .entry(code_path.to_path_buf())
            .or_default()
            .clone()
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn persist(
        &self,
        key: &ArtifactKey<'_>,
        code: &str,
        attempt: &Attempt,
    ) -> Result<ArtifactLocation> {
        let location = ArtifactLocation {
            code_path: self
                .layout
                .latest_code_path(key.source, key.target_language),
            attempt_code_path: self.layout.attempt_code_path(key),
            metadata_path: self.layout.latest_metadata_path(key.source),
            attempt_metadata_path: self.layout.attempt_metadata_path(key),
        };

        let mut recorded = attempt.clone();
        recorded.artifact = Some(location.clone());

        // Attempt-specific files first; the latest copy only moves once they exist.
        AtomicFile::new(&location.attempt_code_path)
            .write_str(code)
            .await?;
        AtomicFile::new(&location.attempt_metadata_path)
            .write_json(&recorded)
            .await?;

        let owner = self.latest_owner(&location.code_path).await;
        let mut owner = owner.lock().await;
        AtomicFile::new(&location.code_path).write_str(code).await?;
        *owner = Some(location.attempt_code_path.clone());
        AtomicFile::new(&location.metadata_path)
            .write_json(&recorded)
            .await?;
        drop(owner);

        tracing::debug!(
            path = %location.code_path.display(),
            attempt_path = %location.attempt_code_path.display(),
            "Persisted artifact"
        );
        Ok(location)
    }

    async fn update_metadata(&self, location: &ArtifactLocation, attempt: &Attempt) -> Result<()> {
        AtomicFile::new(&location.attempt_metadata_path)
            .write_json(attempt)
            .await?;

        let owner = self.latest_owner(&location.code_path).await;
        let owner = owner.lock().await;
        if owner.as_ref() != Some(&location.attempt_code_path) {
            tracing::debug!(
                path = %location.metadata_path.display(),
                "Latest artifact belongs to another attempt, leaving its metadata"
            );
            return Ok(());
        }
        AtomicFile::new(&location.metadata_path)
            .write_json(attempt)
            .await?;
        Ok(())
    }
}
