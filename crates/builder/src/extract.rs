//! Archive extraction with path traversal protection
//!
//! Every entry is validated before anything is written: a late unsafe entry
//! must not leave earlier files behind on disk.

use pdfbuild_errors::{ArchiveError, Error};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufReader, Read, Seek};
use std::ops::Bound;
use std::path::{Component, Path, PathBuf};
use tokio::task;
use zip::result::ZipError;
use zip::ZipArchive;

/// An entry that passed validation, with its resolved destination
#[derive(Debug)]
struct PlannedEntry {
    index: usize,
    dest: PathBuf,
    is_dir: bool,
    mode: Option<u32>,
}

/// Extract a zip archive into `dest_dir` on the blocking pool
///
/// # Errors
///
/// See [`extract_archive`].
pub async fn extract(archive_path: &Path, dest_dir: &Path) -> Result<usize, Error> {
    let archive_path = archive_path.to_path_buf();
    let dest_dir = dest_dir.to_path_buf();

    task::spawn_blocking(move || extract_archive(&archive_path, &dest_dir))
        .await
        .map_err(|e| Error::internal(format!("extraction task failed: {e}")))?
}

/// Extract a zip archive into `dest_dir`, which must exist and be empty
///
/// Returns the number of entries written.
///
/// # Errors
///
/// Returns `ArchiveError::InvalidArchive` if the container cannot be read,
/// `ArchiveError::UnsafePath` if any entry is absolute, contains a `..`
/// segment, is a symlink, or resolves outside `dest_dir`, and
/// `ArchiveError::DestinationNotEmpty` if `dest_dir` already has content.
pub fn extract_archive(archive_path: &Path, dest_dir: &Path) -> Result<usize, Error> {
    let root = dest_dir
        .canonicalize()
        .map_err(|e| Error::io_with_path(&e, dest_dir))?;
    ensure_empty(&root)?;

    let file = File::open(archive_path).map_err(|e| Error::io_with_path(&e, archive_path))?;
    let mut archive = ZipArchive::new(BufReader::new(file)).map_err(invalid_archive)?;

    let plan = plan_entries(&mut archive, &root)?;
    tracing::debug!(
        archive = %archive_path.display(),
        entries = plan.len(),
        "archive validated"
    );

    for entry in &plan {
        write_entry(&mut archive, entry)?;
    }

    Ok(plan.len())
}

fn ensure_empty(root: &Path) -> Result<(), Error> {
    let mut entries = fs::read_dir(root).map_err(|e| Error::io_with_path(&e, root))?;
    if entries.next().is_some() {
        return Err(ArchiveError::DestinationNotEmpty {
            path: root.display().to_string(),
        }
        .into());
    }
    Ok(())
}

fn plan_entries<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    root: &Path,
) -> Result<Vec<PlannedEntry>, Error> {
    let mut plan = Vec::with_capacity(archive.len());
    let mut layout = PlannedLayout::default();

    for index in 0..archive.len() {
        let entry = archive.by_index_raw(index).map_err(invalid_archive)?;
        let name = entry.name().to_string();

        if entry.is_symlink() {
            return Err(unsafe_path(&name, "symbolic link"));
        }

        let relative = check_entry_name(&name)?;
        let dest = match resolve_within(root, &relative) {
            Ok(Some(dest)) => dest,
            Ok(None) => return Err(unsafe_path(&name, "resolves outside extraction root")),
            Err(e) => return Err(Error::io_with_path(&e, root.join(&relative))),
        };

        let is_dir = entry.is_dir();
        layout.insert(root, &dest, is_dir, &name)?;

        plan.push(PlannedEntry {
            index,
            dest,
            is_dir,
            mode: entry.unix_mode(),
        });
    }

    Ok(plan)
}

/// Destinations claimed so far, mapped to the entry name and whether it is a
/// directory. Paths order component-wise, so descendants of a path follow it
/// directly.
#[derive(Debug, Default)]
struct PlannedLayout {
    claimed: BTreeMap<PathBuf, (String, bool)>,
}

impl PlannedLayout {
    /// Claim `dest` for an entry, rejecting any layout that cannot be
    /// written: a file and a directory at the same path, a file below
    /// another file, or a file taking the place of the extraction root.
    fn insert(&mut self, root: &Path, dest: &Path, is_dir: bool, name: &str) -> Result<(), Error> {
        if !is_dir && dest == root {
            return Err(conflict(name, "extraction root"));
        }

        if let Some((other, other_is_dir)) = self.claimed.get(dest) {
            if *other_is_dir != is_dir {
                return Err(conflict(name, other));
            }
        }

        for ancestor in dest.ancestors().skip(1) {
            if ancestor == root {
                break;
            }
            if let Some((other, false)) = self.claimed.get(ancestor) {
                return Err(conflict(name, other));
            }
        }

        if !is_dir {
            let below = self
                .claimed
                .range::<Path, _>((Bound::Excluded(dest), Bound::Unbounded))
                .take_while(|(path, _)| path.starts_with(dest))
                .next();
            if let Some((_, (other, _))) = below {
                return Err(conflict(name, other));
            }
        }

        self.claimed
            .entry(dest.to_path_buf())
            .or_insert_with(|| (name.to_string(), is_dir));
        Ok(())
    }
}

fn conflict(entry: &str, other: &str) -> Error {
    ArchiveError::InvalidArchive {
        message: format!("entry {entry} conflicts with {other}"),
    }
    .into()
}

/// Textual checks on the stored entry name
///
/// Both `/` and `\` count as separators so that archives produced on Windows
/// cannot smuggle `..\` past the check.
fn check_entry_name(name: &str) -> Result<PathBuf, Error> {
    if is_absolute_name(name) {
        return Err(unsafe_path(name, "absolute path"));
    }

    if name.split(['/', '\\']).any(|segment| segment == "..") {
        return Err(unsafe_path(name, "parent directory segment"));
    }

    let mut relative = PathBuf::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(unsafe_path(name, "non-relative component"));
            }
        }
    }

    Ok(relative)
}

fn is_absolute_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    let has_drive = bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':';
    name.starts_with('/') || name.starts_with('\\') || has_drive || Path::new(name).is_absolute()
}

/// Resolve `root.join(relative)` through whatever already exists on disk.
///
/// The deepest existing ancestor is canonicalized (following any symlinks)
/// and the remaining components are appended. Returns `Ok(None)` when the
/// result is neither `root` nor a descendant of it. `root` must already be
/// canonical.
pub(crate) fn resolve_within(root: &Path, relative: &Path) -> io::Result<Option<PathBuf>> {
    let candidate = root.join(relative);

    let mut existing = candidate.as_path();
    let mut missing = Vec::new();
    while existing.symlink_metadata().is_err() {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => break,
        }
    }

    let mut resolved = existing.canonicalize()?;
    for name in missing.iter().rev() {
        resolved.push(name);
    }

    if resolved == root || resolved.starts_with(root) {
        Ok(Some(resolved))
    } else {
        Ok(None)
    }
}

fn write_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    planned: &PlannedEntry,
) -> Result<(), Error> {
    let dest = &planned.dest;

    if planned.is_dir {
        return fs::create_dir_all(dest).map_err(|e| Error::io_with_path(&e, dest));
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io_with_path(&e, parent))?;
    }

    let mut entry = archive.by_index(planned.index).map_err(invalid_archive)?;
    let mut outfile = File::create(dest).map_err(|e| Error::io_with_path(&e, dest))?;
    io::copy(&mut entry, &mut outfile).map_err(|e| {
        // Corrupt compressed data surfaces as InvalidData from the reader side.
        if e.kind() == io::ErrorKind::InvalidData {
            invalid_archive(ZipError::Io(e))
        } else {
            Error::io_with_path(&e, dest)
        }
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Some(mode) = planned.mode {
            // Keep rwx bits only; the owner always retains read/write.
            let mode = (mode & 0o777) | 0o600;
            fs::set_permissions(dest, fs::Permissions::from_mode(mode))
                .map_err(|e| Error::io_with_path(&e, dest))?;
        }
    }

    Ok(())
}

fn invalid_archive(err: ZipError) -> Error {
    ArchiveError::InvalidArchive {
        message: err.to_string(),
    }
    .into()
}

fn unsafe_path(entry: &str, reason: &str) -> Error {
    ArchiveError::UnsafePath {
        entry: entry.to_string(),
        reason: reason.to_string(),
    }
    .into()
}
