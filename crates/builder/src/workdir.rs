//! Per-request working directory
//!
//! Every build request gets a fresh directory under the work root. The
//! directory is removed when the guard drops, unless it has been handed over
//! to the job store with [`WorkDir::keep`].

use pdfbuild_config::constants::WORK_DIR_PREFIX;
use pdfbuild_errors::Error;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::fs;

const UPLOAD_FILE: &str = "upload.zip";
const SOURCE_DIR: &str = "src";

/// RAII guard for a working directory
#[derive(Debug)]
pub struct WorkDir {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl WorkDir {
    /// Create a new, never-before-used working directory under `root`
    ///
    /// # Errors
    ///
    /// Returns an error if the root cannot be created or canonicalized, or if
    /// the directory itself cannot be allocated.
    pub async fn create(root: &Path) -> Result<Self, Error> {
        fs::create_dir_all(root)
            .await
            .map_err(|e| Error::io_with_path(&e, root))?;
        let root = fs::canonicalize(root)
            .await
            .map_err(|e| Error::io_with_path(&e, root))?;

        let dir = tempfile::Builder::new()
            .prefix(WORK_DIR_PREFIX)
            .tempdir_in(&root)
            .map_err(|e| Error::io_with_path(&e, &root))?;
        let path = dir.path().to_path_buf();

        tracing::debug!(work_dir = %path.display(), "working directory created");
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    /// Get the path to the working directory
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where the uploaded archive is stored
    #[must_use]
    pub fn upload_path(&self) -> PathBuf {
        self.path.join(UPLOAD_FILE)
    }

    /// Extraction root for the uploaded archive
    #[must_use]
    pub fn source_dir(&self) -> PathBuf {
        self.path.join(SOURCE_DIR)
    }

    /// Give up automatic cleanup and return the directory path.
    ///
    /// The caller becomes responsible for deleting the directory.
    #[must_use]
    pub fn keep(mut self) -> PathBuf {
        if let Some(dir) = self.dir.take() {
            let _ = dir.keep();
        }
        self.path.clone()
    }
}

impl Drop for WorkDir {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            match dir.close() {
                Ok(()) => {
                    tracing::debug!(work_dir = %self.path.display(), "working directory removed");
                }
                Err(e) => {
                    tracing::warn!(
                        work_dir = %self.path.display(),
                        error = %e,
                        "failed to remove working directory"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dropped_work_dir_is_removed() {
        let root = tempfile::tempdir().unwrap();
        let work_dir = WorkDir::create(root.path()).await.unwrap();
        let path = work_dir.path().to_path_buf();
        assert!(path.is_dir());
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(WORK_DIR_PREFIX));

        drop(work_dir);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_kept_work_dir_survives() {
        let root = tempfile::tempdir().unwrap();
        let work_dir = WorkDir::create(root.path()).await.unwrap();
        let path = work_dir.keep();
        assert!(path.is_dir());
        assert!(path.is_absolute());
    }

    #[tokio::test]
    async fn test_work_dirs_are_never_reused() {
        let root = tempfile::tempdir().unwrap();
        let first = WorkDir::create(root.path()).await.unwrap();
        let second = WorkDir::create(root.path()).await.unwrap();
        assert_ne!(first.path(), second.path());
    }
}
