//! Upload validation error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

/// Rejections of the uploaded file itself, before any working directory exists.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum UploadError {
    #[error("missing file field `{field}`")]
    MissingFile { field: String },

    #[error("no file selected")]
    NoFileSelected,

    #[error("expected a .zip upload, got {file_name}")]
    WrongExtension { file_name: String },

    #[error("upload exceeds the {limit} byte limit")]
    TooLarge { limit: u64 },

    #[error("upload could not be read: {message}")]
    Unreadable { message: String },
}

impl UserFacingError for UploadError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::MissingFile { .. } | Self::NoFileSelected => {
                Some("Attach a .zip archive in the `file` form field.")
            }
            Self::WrongExtension { .. } => Some("Only .zip archives are accepted."),
            Self::TooLarge { .. } => Some("Remove build outputs and large assets from the archive."),
            Self::Unreadable { .. } => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::MissingFile { .. } => "upload.missing_file",
            Self::NoFileSelected => "upload.no_file_selected",
            Self::WrongExtension { .. } => "upload.wrong_extension",
            Self::TooLarge { .. } => "upload.too_large",
            Self::Unreadable { .. } => "upload.unreadable",
        };
        Some(code)
    }
}
