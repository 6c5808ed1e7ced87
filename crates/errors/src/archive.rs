//! Archive extraction error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum ArchiveError {
    #[error("invalid archive: {message}")]
    InvalidArchive { message: String },

    #[error("unsafe path in archive: {entry} ({reason})")]
    UnsafePath { entry: String, reason: String },

    #[error("extraction destination is not an empty directory: {path}")]
    DestinationNotEmpty { path: String },
}

impl UserFacingError for ArchiveError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::InvalidArchive { .. } => Some("Re-create the archive with a standard zip tool."),
            Self::UnsafePath { .. } => Some(
                "Archive entries must be relative paths without `..` segments or symlinks.",
            ),
            Self::DestinationNotEmpty { .. } => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::InvalidArchive { .. } => "archive.invalid",
            Self::UnsafePath { .. } => "archive.unsafe_path",
            Self::DestinationNotEmpty { .. } => "archive.destination_not_empty",
        };
        Some(code)
    }
}
