//! Artifact persistence contract.

mod layout;

pub use layout::{ArtifactKey, ArtifactLayout, slugify};

use crate::error::Result;
use crate::migration::model::Attempt;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where one attempt's code and metadata were written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactLocation {
    /// Undecorated path inside the validated tree (`{root}/src/{group}/{base}.{ext}`).
    pub code_path: PathBuf,
    /// Attempt-specific copy that later attempts never touch.
    pub attempt_code_path: PathBuf,
    /// Sidecar JSON of the most recent attempt for this source.
    pub metadata_path: PathBuf,
    /// Sidecar JSON of this attempt only.
    pub attempt_metadata_path: PathBuf,
}

/// Persists migrated code plus a metadata sidecar.
///
/// Implementations create missing directories and report write failures as
/// `ShiftError::Io`, which ends the session for that artifact only.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Writes `code` and the attempt metadata for `key`.
    ///
    /// Repeated calls with different keys never overwrite each other's
    /// attempt-specific files.
    async fn persist(
        &self,
        key: &ArtifactKey<'_>,
        code: &str,
        attempt: &Attempt,
    ) -> Result<ArtifactLocation>;

    /// Rewrites the metadata sidecar once the attempt's validation is known.
    async fn update_metadata(&self, location: &ArtifactLocation, attempt: &Attempt) -> Result<()>;
}
