//! Deliverable lookup after a successful build

use crate::resolve::{is_metadata_dir, walk_error};
use pdfbuild_errors::{BuildError, Error};
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

/// How the deliverable is found in the build directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactStrategy {
    /// Convention-defined output path, relative to the build directory.
    Fixed(PathBuf),
    /// Newest regular file with this extension anywhere under the build
    /// directory.
    ///
    /// Best effort only: with several candidates the choice depends on
    /// filesystem timestamp granularity. It is sound only because every job
    /// builds in a fresh working directory, so no stale output from an
    /// earlier build can win.
    NewestWithExtension(String),
}

impl ArtifactStrategy {
    fn describe(&self) -> String {
        match self {
            Self::Fixed(path) => path.display().to_string(),
            Self::NewestWithExtension(ext) => format!("*.{ext}"),
        }
    }
}

/// Find the deliverable produced by a successful build
///
/// Symlinks are never returned, so a build cannot point the download at a
/// file outside its working directory.
///
/// # Errors
///
/// Returns `BuildError::ArtifactNotProduced` when no qualifying regular file
/// exists.
pub fn locate_artifact(build_dir: &Path, strategy: &ArtifactStrategy) -> Result<PathBuf, Error> {
    let found = match strategy {
        ArtifactStrategy::Fixed(relative) => fixed_artifact(build_dir, relative),
        ArtifactStrategy::NewestWithExtension(ext) => newest_with_extension(build_dir, ext)?,
    };

    match found {
        Some(path) => {
            tracing::debug!(artifact = %path.display(), "artifact located");
            Ok(path)
        }
        None => Err(BuildError::ArtifactNotProduced {
            dir: build_dir.display().to_string(),
            expected: strategy.describe(),
        }
        .into()),
    }
}

fn fixed_artifact(build_dir: &Path, relative: &Path) -> Option<PathBuf> {
    let stays_inside = relative
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !stays_inside {
        return None;
    }

    let path = build_dir.join(relative);
    let metadata = path.symlink_metadata().ok()?;
    metadata.file_type().is_file().then_some(path)
}

fn newest_with_extension(build_dir: &Path, ext: &str) -> Result<Option<PathBuf>, Error> {
    let mut candidates: Vec<(SystemTime, PathBuf)> = Vec::new();

    let walker = WalkDir::new(build_dir)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            !(entry.file_type().is_dir() && is_metadata_dir(&entry.file_name().to_string_lossy()))
        });

    for entry in walker {
        let entry = entry.map_err(walk_error)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry
            .path()
            .extension()
            .is_some_and(|e| e.to_string_lossy().eq_ignore_ascii_case(ext));
        if !matches {
            continue;
        }

        let modified = entry
            .metadata()
            .map_err(walk_error)?
            .modified()
            .map_err(|e| Error::io_with_path(&e, entry.path()))?;
        candidates.push((modified, entry.into_path()));
    }

    if candidates.len() > 1 {
        tracing::debug!(
            candidates = candidates.len(),
            "several artifacts found, serving the newest"
        );
    }

    // Newest first; equal timestamps fall back to path order.
    candidates.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    Ok(candidates.into_iter().next().map(|(_, path)| path))
}
