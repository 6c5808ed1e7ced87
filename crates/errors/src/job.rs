//! Job store error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum JobError {
    #[error("job not found: {id}")]
    NotFound { id: String },

    #[error("artifact for job {id} no longer exists")]
    ArtifactMissing { id: String },

    #[error("artifact {artifact} is outside working directory {work_dir}")]
    ArtifactOutsideWorkDir { artifact: String, work_dir: String },
}

impl UserFacingError for JobError {
    fn user_message(&self) -> Cow<'_, str> {
        match self {
            // Unknown and expired identifiers are indistinguishable to callers.
            Self::NotFound { .. } | Self::ArtifactMissing { .. } => {
                Cow::Borrowed("job not found or expired")
            }
            Self::ArtifactOutsideWorkDir { .. } => Cow::Owned(self.to_string()),
        }
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::NotFound { .. } | Self::ArtifactMissing { .. } => {
                Some("Jobs expire shortly after the build; upload the archive again.")
            }
            Self::ArtifactOutsideWorkDir { .. } => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::NotFound { .. } => "job.not_found",
            Self::ArtifactMissing { .. } => "job.artifact_missing",
            Self::ArtifactOutsideWorkDir { .. } => "job.artifact_outside_work_dir",
        };
        Some(code)
    }
}
