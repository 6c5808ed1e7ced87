//! Shared job map with lazy expiry

use crate::job::{Job, JobId};
use chrono::{DateTime, Utc};
use pdfbuild_errors::{Error, JobError};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs;
use tokio::sync::Mutex;

/// Process-wide job store
///
/// Constructed once at startup and shared by handle. Every operation takes
/// the same lock, so inserts, lookups and sweeps never interleave. Directory
/// deletion happens after the lock is released.
#[derive(Debug, Default)]
pub struct JobStore {
    jobs: Mutex<HashMap<JobId, Job>>,
}

impl JobStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed build and return its fresh identifier
    ///
    /// The store takes ownership of `work_dir`: it is deleted when the job
    /// expires or the store is purged.
    ///
    /// # Errors
    ///
    /// Returns `JobError::ArtifactOutsideWorkDir` if either path is relative
    /// or the artifact does not live inside the working directory.
    pub async fn create(&self, artifact: PathBuf, work_dir: PathBuf) -> Result<JobId, Error> {
        if !work_dir.is_absolute() || !artifact.is_absolute() || !artifact.starts_with(&work_dir) {
            return Err(JobError::ArtifactOutsideWorkDir {
                artifact: artifact.display().to_string(),
                work_dir: work_dir.display().to_string(),
            }
            .into());
        }

        let job = Job::new(artifact, work_dir, Utc::now());
        let mut jobs = self.jobs.lock().await;
        let id = loop {
            let id = JobId::new();
            if let Entry::Vacant(slot) = jobs.entry(id) {
                slot.insert(job);
                break id;
            }
        };

        tracing::info!(job_id = %id, jobs = jobs.len(), "job created");
        Ok(id)
    }

    /// Get a job record, if the identifier is known
    pub async fn lookup(&self, id: &JobId) -> Option<Job> {
        self.jobs.lock().await.get(id).cloned()
    }

    /// Get a job whose artifact can still be served
    ///
    /// # Errors
    ///
    /// Returns `JobError::NotFound` for an unknown identifier and
    /// `JobError::ArtifactMissing` if the artifact is no longer a regular
    /// file on disk.
    pub async fn redeem(&self, id: &JobId) -> Result<Job, Error> {
        let job = self.lookup(id).await.ok_or_else(|| JobError::NotFound {
            id: id.to_string(),
        })?;

        match fs::symlink_metadata(job.artifact()).await {
            Ok(metadata) if metadata.file_type().is_file() => Ok(job),
            _ => {
                tracing::warn!(
                    job_id = %id,
                    artifact = %job.artifact().display(),
                    "artifact missing for live job"
                );
                Err(JobError::ArtifactMissing { id: id.to_string() }.into())
            }
        }
    }

    /// Remove every job older than `ttl` at `now` and delete its working
    /// directory. Returns the number of jobs removed.
    pub async fn sweep_expired(&self, now: DateTime<Utc>, ttl: Duration) -> usize {
        let expired: Vec<(JobId, Job)> = {
            let mut jobs = self.jobs.lock().await;
            let ids: Vec<JobId> = jobs
                .iter()
                .filter(|(_, job)| job.is_expired(now, ttl))
                .map(|(id, _)| *id)
                .collect();
            ids.into_iter()
                .filter_map(|id| jobs.remove(&id).map(|job| (id, job)))
                .collect()
        };

        if expired.is_empty() {
            return 0;
        }

        let count = expired.len();
        for (id, job) in expired {
            remove_work_dir(&id, job.work_dir().to_path_buf()).await;
        }
        tracing::info!(removed = count, "expired jobs swept");
        count
    }

    /// Remove every job regardless of age, deleting all working directories
    pub async fn purge(&self) -> usize {
        let drained: Vec<(JobId, Job)> = self.jobs.lock().await.drain().collect();
        let count = drained.len();
        for (id, job) in drained {
            remove_work_dir(&id, job.work_dir().to_path_buf()).await;
        }
        if count > 0 {
            tracing::info!(removed = count, "job store purged");
        }
        count
    }

    pub async fn len(&self) -> usize {
        self.jobs.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.lock().await.is_empty()
    }
}

async fn remove_work_dir(id: &JobId, work_dir: PathBuf) {
    match fs::remove_dir_all(&work_dir).await {
        Ok(()) => {
            tracing::debug!(job_id = %id, work_dir = %work_dir.display(), "working directory removed");
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(
                job_id = %id,
                work_dir = %work_dir.display(),
                error = %e,
                "failed to remove working directory"
            );
        }
    }
}
