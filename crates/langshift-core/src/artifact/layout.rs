//! Deterministic on-disk placement of migrated artifacts.
//!
//! ```text
//! {root}/
//! ├── src/{group}/{base}.{ext}                        # latest code (validated tree)
//! ├── attempts/src/{group}/{base}.{token}.{ext}        # every attempt, never overwritten
//! ├── json/src/{group}/response_{base}.json            # latest attempt metadata
//! ├── json/src/{group}/response_{base}.{token}.json    # per-attempt metadata
//! └── logs/                                            # run logs
//! ```
//!
//! Per-attempt copies sit outside `src/` so a project-wide build over `src/`
//! only ever sees one version of each file.

use crate::language::Language;
use crate::source::SourceArtifact;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    root: PathBuf,
}

/// Identity of one persisted attempt.
#[derive(Debug, Clone, Copy)]
pub struct ArtifactKey<'a> {
    pub source: &'a SourceArtifact,
    pub target_language: &'a Language,
    pub model_id: &'a str,
    pub session_id: &'a str,
    pub attempt_index: usize,
}

impl ArtifactKey<'_> {
    /// Token that keeps attempts of different models, sessions and retries apart.
    pub fn token(&self) -> String {
        let session: String = self
            .session_id
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .take(8)
            .collect();
        format!(
            "{}-{}-a{}",
            slugify(self.model_id),
            session,
            self.attempt_index
        )
    }
}

impl ArtifactLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn grouped(&self, base: PathBuf, source: &SourceArtifact) -> PathBuf {
        match source.group() {
            Some(group) => base.join(group),
            None => base,
        }
    }

    pub fn code_dir(&self, source: &SourceArtifact) -> PathBuf {
        self.grouped(self.root.join("src"), source)
    }

    pub fn attempts_dir(&self, source: &SourceArtifact) -> PathBuf {
        self.grouped(self.root.join("attempts").join("src"), source)
    }

    pub fn metadata_dir(&self, source: &SourceArtifact) -> PathBuf {
        self.grouped(self.root.join("json").join("src"), source)
    }

    pub fn latest_code_path(&self, source: &SourceArtifact, language: &Language) -> PathBuf {
        self.code_dir(source)
            .join(format!("{}.{}", source.file_base(), language.extension()))
    }

    pub fn latest_metadata_path(&self, source: &SourceArtifact) -> PathBuf {
        self.metadata_dir(source)
            .join(format!("response_{}.json", source.file_base()))
    }

    pub fn attempt_code_path(&self, key: &ArtifactKey<'_>) -> PathBuf {
        self.attempts_dir(key.source).join(format!(
            "{}.{}.{}",
            key.source.file_base(),
            key.token(),
            key.target_language.extension()
        ))
    }

    pub fn attempt_metadata_path(&self, key: &ArtifactKey<'_>) -> PathBuf {
        self.metadata_dir(key.source).join(format!(
            "response_{}.{}.json",
            key.source.file_base(),
            key.token()
        ))
    }
}

/// Lowercase, filesystem-safe form of a model identifier.
///
/// `VertexAI - Gemini Pro` becomes `vertexai-gemini-pro`.
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_dash = false;
    for ch in value.chars() {
        if ch.is_ascii_alphanumeric() || ch == '.' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        "model".to_string()
    } else {
        slug
    }
}
