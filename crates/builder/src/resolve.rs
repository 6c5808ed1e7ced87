//! Build directory selection
//!
//! Uploaded archives come in three shapes: flat (descriptor at the root),
//! wrapped in a single top-level folder, or arbitrarily nested. The resolver
//! picks the shallowest descriptor, treating a lone wrapper folder as the
//! project root.

use pdfbuild_errors::{BuildError, Error};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Directories injected by archiving tools that never hold project files
const METADATA_DIRS: &[&str] = &["__MACOSX"];

pub(crate) fn is_metadata_dir(name: &str) -> bool {
    METADATA_DIRS.contains(&name)
}

fn is_metadata_entry(entry: &DirEntry) -> bool {
    entry.file_type().is_dir() && is_metadata_dir(&entry.file_name().to_string_lossy())
}

/// Choose the directory the build tool should run in
///
/// Preference order:
/// 1. the extraction root, if it holds `descriptor` directly;
/// 2. if the root holds exactly one directory and no files, the parent of
///    the shallowest `descriptor` inside that directory;
/// 3. the parent of the shallowest `descriptor` anywhere under the root.
///
/// # Errors
///
/// Returns `BuildError::NoBuildDescriptor` if no descriptor exists outside
/// metadata directories, or an I/O error if the tree cannot be read.
pub fn resolve_build_dir(root: &Path, descriptor: &str) -> Result<PathBuf, Error> {
    let descriptors = find_descriptors(root, descriptor)?;
    let Some(shallowest) = descriptors.first() else {
        return Err(BuildError::NoBuildDescriptor {
            descriptor: descriptor.to_string(),
        }
        .into());
    };

    if descriptors.iter().any(|(depth, _)| *depth == 1) {
        tracing::debug!(build_dir = %root.display(), "descriptor at extraction root");
        return Ok(root.to_path_buf());
    }

    let (dirs, files) = top_level_entries(root)?;
    if let ([wrapper], []) = (dirs.as_slice(), files.as_slice()) {
        if let Some((_, path)) = find_descriptors(wrapper, descriptor)?.first() {
            let build_dir = parent_of(path, wrapper);
            tracing::debug!(
                wrapper = %wrapper.display(),
                build_dir = %build_dir.display(),
                "descriptor inside single wrapper folder"
            );
            return Ok(build_dir);
        }
    }

    let build_dir = parent_of(&shallowest.1, root);
    tracing::debug!(build_dir = %build_dir.display(), "shallowest descriptor");
    Ok(build_dir)
}

/// All regular files named `descriptor` under `base`, as `(depth, path)`
/// sorted shallowest first, ties broken by path.
fn find_descriptors(base: &Path, descriptor: &str) -> Result<Vec<(usize, PathBuf)>, Error> {
    let mut found = Vec::new();

    let walker = WalkDir::new(base)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| !is_metadata_entry(entry));

    for entry in walker {
        let entry = entry.map_err(walk_error)?;
        if entry.file_type().is_file() && entry.file_name() == descriptor {
            found.push((entry.depth(), entry.into_path()));
        }
    }

    found.sort();
    Ok(found)
}

/// Immediate children of `root`, split into directories and everything else.
fn top_level_entries(root: &Path) -> Result<(Vec<PathBuf>, Vec<PathBuf>), Error> {
    let mut dirs = Vec::new();
    let mut files = Vec::new();

    for entry in fs::read_dir(root).map_err(|e| Error::io_with_path(&e, root))? {
        let entry = entry.map_err(|e| Error::io_with_path(&e, root))?;
        let file_type = entry
            .file_type()
            .map_err(|e| Error::io_with_path(&e, entry.path()))?;

        if file_type.is_dir() {
            if !is_metadata_dir(&entry.file_name().to_string_lossy()) {
                dirs.push(entry.path());
            }
        } else {
            files.push(entry.path());
        }
    }

    Ok((dirs, files))
}

fn parent_of(path: &Path, fallback: &Path) -> PathBuf {
    path.parent().unwrap_or(fallback).to_path_buf()
}

pub(crate) fn walk_error(err: walkdir::Error) -> Error {
    let path = err.path().map(Path::to_path_buf);
    match (err.into_io_error(), path) {
        (Some(io), Some(path)) => Error::io_with_path(&io, path),
        (Some(io), None) => io.into(),
        (None, _) => Error::internal("filesystem loop while walking extracted tree"),
    }
}
