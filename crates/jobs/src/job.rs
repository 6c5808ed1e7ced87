//! Job records and identifiers

use chrono::{DateTime, TimeDelta, Utc};
use pdfbuild_errors::{Error, JobError};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

/// Opaque, globally unique job identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(Uuid);

impl JobId {
    /// Generate a fresh random identifier
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.as_hyphenated())
    }
}

impl FromStr for JobId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // A malformed identifier cannot name a job, so it is simply unknown.
        Uuid::parse_str(s).map(Self).map_err(|_| {
            JobError::NotFound {
                id: s.to_string(),
            }
            .into()
        })
    }
}

/// A completed build retained for download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    artifact: PathBuf,
    work_dir: PathBuf,
    created_at: DateTime<Utc>,
}

impl Job {
    pub(crate) fn new(artifact: PathBuf, work_dir: PathBuf, created_at: DateTime<Utc>) -> Self {
        Self {
            artifact,
            work_dir,
            created_at,
        }
    }

    /// Absolute path of the deliverable, inside [`Job::work_dir`]
    #[must_use]
    pub fn artifact(&self) -> &Path {
        &self.artifact
    }

    /// Working directory owned by this job
    #[must_use]
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether the job is older than `ttl` at `now`
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        let ttl = TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX);
        now.signed_duration_since(self.created_at) > ttl
    }

    /// File name offered to the client on download
    #[must_use]
    pub fn download_name(&self) -> String {
        self.artifact
            .file_name()
            .map_or_else(|| "artifact".to_string(), |n| n.to_string_lossy().into_owned())
    }
}
