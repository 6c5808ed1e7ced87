//! Build error types

use std::borrow::Cow;
use std::time::Duration;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum BuildError {
    #[error("no {descriptor} found in archive")]
    NoBuildDescriptor { descriptor: String },

    /// The build tool ran and exited unsuccessfully. `log` is the merged
    /// stdout/stderr stream, verbatim.
    #[error("build failed with exit code {}", .exit_code.map_or_else(|| "none".to_string(), |c| c.to_string()))]
    Failed { exit_code: Option<i32>, log: String },

    #[error("build timed out after {limit:?}")]
    Timeout { limit: Duration },

    #[error("failed to start {program}: {message}")]
    SpawnFailed { program: String, message: String },

    #[error("build succeeded but produced no {expected} in {dir}")]
    ArtifactNotProduced { dir: String, expected: String },
}

impl UserFacingError for BuildError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::NoBuildDescriptor { .. } => {
                Some("Include a Makefile at the top of the archive or inside a single folder.")
            }
            Self::Failed { .. } => Some("Inspect the build log below and fix the project."),
            Self::Timeout { .. } => Some("Reduce the amount of work the build target performs."),
            Self::SpawnFailed { .. } | Self::ArtifactNotProduced { .. } => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::NoBuildDescriptor { .. } => "build.no_build_descriptor",
            Self::Failed { .. } => "build.failed",
            Self::Timeout { .. } => "build.timeout",
            Self::SpawnFailed { .. } => "build.spawn_failed",
            Self::ArtifactNotProduced { .. } => "build.artifact_not_produced",
        };
        Some(code)
    }
}
