//! Atomic file writes.
//!
//! Every write goes to its own `.{name}.{uuid}.tmp` in the target directory,
//! is fsynced, and is then renamed over the destination. Readers never observe
//! a half-written artifact, and concurrent writers to one destination never
//! share a temp file; the last rename wins.

use langshift_core::ShiftError;
use serde::Serialize;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Errors that can occur during atomic writes.
#[derive(Debug)]
pub enum AtomicFileError {
    /// File I/O error, with the path being written.
    IoError(PathBuf, std::io::Error),
    /// JSON serialization error.
    JsonError(serde_json::Error),
    /// The destination has no parent directory or no file name.
    InvalidPath(PathBuf),
}

impl std::fmt::Display for AtomicFileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AtomicFileError::IoError(path, e) => {
                write!(f, "I/O error writing {}: {}", path.display(), e)
            }
            AtomicFileError::JsonError(e) => write!(f, "JSON serialization error: {}", e),
            AtomicFileError::InvalidPath(path) => {
                write!(f, "Invalid destination path: {}", path.display())
            }
        }
    }
}

impl std::error::Error for AtomicFileError {}

impl From<serde_json::Error> for AtomicFileError {
    fn from(e: serde_json::Error) -> Self {
        AtomicFileError::JsonError(e)
    }
}

impl From<AtomicFileError> for ShiftError {
    fn from(e: AtomicFileError) -> Self {
        match e {
            AtomicFileError::JsonError(inner) => inner.into(),
            other => ShiftError::io(other.to_string()),
        }
    }
}

/// Handle to one destination file.
pub struct AtomicFile {
    path: PathBuf,
}

impl AtomicFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Writes `content` atomically, creating missing parent directories.
    pub async fn write(&self, content: &[u8]) -> Result<(), AtomicFileError> {
        let io_err = |e: std::io::Error| AtomicFileError::IoError(self.path.clone(), e);

        let parent = self
            .path
            .parent()
            .ok_or_else(|| AtomicFileError::InvalidPath(self.path.clone()))?;
        fs::create_dir_all(parent).await.map_err(io_err)?;

        let tmp_path = self.temp_path()?;
        let mut tmp_file = fs::File::create(&tmp_path).await.map_err(io_err)?;
        tmp_file.write_all(content).await.map_err(io_err)?;
        tmp_file.sync_all().await.map_err(io_err)?;
        drop(tmp_file);

        if let Err(e) = fs::rename(&tmp_path, &self.path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(io_err(e));
        }
        Ok(())
    }

    pub async fn write_str(&self, content: &str) -> Result<(), AtomicFileError> {
        self.write(content.as_bytes()).await
    }

    /// Serializes `value` as pretty JSON and writes it atomically.
    pub async fn write_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<(), AtomicFileError> {
        let json = serde_json::to_string_pretty(value)?;
        self.write(json.as_bytes()).await
    }

    fn temp_path(&self) -> Result<PathBuf, AtomicFileError> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| AtomicFileError::InvalidPath(self.path.clone()))?;
        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| AtomicFileError::InvalidPath(self.path.clone()))?;
        Ok(parent.join(format!(
            ".{}.{}.tmp",
            file_name.to_string_lossy(),
            Uuid::new_v4().simple()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn leftover_temps(dir: &std::path::Path) -> usize {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .count()
    }

    #[tokio::test]
    async fn test_write_creates_parents_and_leaves_no_temp() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("src/main/Driver.kt");
        let file = AtomicFile::new(&path);

        file.write_str("class Driver").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "class Driver");
        assert_eq!(leftover_temps(&temp_dir.path().join("src/main")), 0);

        file.write_str("class Driver2").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "class Driver2");
    }

    #[tokio::test]
    async fn test_write_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("response.json");
        AtomicFile::new(&path)
            .write_json(&serde_json::json!({ "index": 0 }))
            .await
            .unwrap();
        let loaded: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded["index"], 0);
    }

    #[tokio::test]
    async fn test_write_into_file_path_fails_as_io() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("src");
        std::fs::write(&blocker, "not a directory").unwrap();

        let err = AtomicFile::new(blocker.join("Foo.kt"))
            .write_str("x")
            .await
            .unwrap_err();
        assert!(matches!(err, AtomicFileError::IoError(..)));
        assert!(ShiftError::from(err).is_io());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers_to_one_path_never_collide() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("src/main/Driver.kt");
        let left = "a".repeat(200 * 1024);
        let right = "b".repeat(200 * 1024);

        for _ in 0..20 {
            let writers = [left.clone(), right.clone()].map(|content| {
                let path = path.clone();
                tokio::spawn(async move { AtomicFile::new(path).write_str(&content).await })
            });
            for writer in writers {
                writer.await.unwrap().unwrap();
            }

            let written = std::fs::read_to_string(&path).unwrap();
            assert!(written == left || written == right, "torn write");
        }
        assert_eq!(leftover_temps(&temp_dir.path().join("src/main")), 0);
    }
}
