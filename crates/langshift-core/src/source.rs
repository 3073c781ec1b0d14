//! Source artifacts fed into a migration session.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// One source file to migrate.
///
/// `path` is the logical path the file was selected by (repository-relative
/// for remote sources, as given for local ones); artifact placement is
/// derived from it, never from where the bytes were actually read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceArtifact {
    /// Stable identifier, e.g. `emmaroche/data-preparation:src/main/Driver.java`
    pub id: String,
    pub path: String,
    pub code: String,
}

impl SourceArtifact {
    pub fn new(id: impl Into<String>, path: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            code: code.into(),
        }
    }

    /// File name without its extension (`Driver` for `src/main/Driver.java`).
    pub fn file_base(&self) -> String {
        let normalized = self.path.replace('\\', "/");
        Path::new(&normalized)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .filter(|stem| !stem.is_empty())
            .unwrap_or_else(|| "artifact".to_string())
    }

    /// Name of the directory that directly contains the file, if any.
    ///
    /// `src/main/Driver.java` groups under `main`; a bare `Driver.java` has no group.
    pub fn group(&self) -> Option<String> {
        let normalized = self.path.replace('\\', "/");
        let mut parts: Vec<&str> = normalized.split('/').filter(|p| !p.is_empty()).collect();
        parts.pop();
        parts
            .last()
            .filter(|name| **name != "." && **name != "..")
            .map(|name| name.to_string())
    }
}
