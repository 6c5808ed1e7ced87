#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Error types for the pdfbuild service
//!
//! This crate provides fine-grained error types organized by domain.
//! All error types implement Clone for easier handling across tasks.

use std::borrow::Cow;
use std::path::PathBuf;

use thiserror::Error;

pub mod archive;
pub mod build;
pub mod config;
pub mod job;
pub mod upload;

// Re-export all error types at the root
pub use archive::ArchiveError;
pub use build::BuildError;
pub use config::ConfigError;
pub use job::JobError;
pub use upload::UploadError;

/// Generic error type for cross-crate boundaries
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("upload error: {0}")]
    Upload(#[from] UploadError),

    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("build error: {0}")]
    Build(#[from] BuildError),

    #[error("job error: {0}")]
    Job(#[from] JobError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("I/O error: {message}")]
    Io {
        kind: std::io::ErrorKind,
        message: String,
        path: Option<PathBuf>,
    },
}

impl Error {
    /// Create an internal error with a message
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create an Io error with an associated path
    pub fn io_with_path(err: &std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
            path: Some(path.into()),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
            path: None,
        }
    }
}

/// Result type alias for pdfbuild operations
pub type Result<T> = std::result::Result<T, Error>;

/// Minimal interface for rendering user-facing error information.
pub trait UserFacingError {
    /// Short message suitable for a response body.
    fn user_message(&self) -> Cow<'_, str>;

    /// Optional remediation hint.
    fn user_hint(&self) -> Option<&'static str> {
        None
    }

    /// Stable error code for structured logging.
    fn user_code(&self) -> Option<&'static str> {
        None
    }
}

impl UserFacingError for Error {
    fn user_message(&self) -> Cow<'_, str> {
        match self {
            Error::Upload(err) => err.user_message(),
            Error::Archive(err) => err.user_message(),
            Error::Build(err) => err.user_message(),
            Error::Job(err) => err.user_message(),
            Error::Config(err) => err.user_message(),
            // Internal details stay in the logs.
            Error::Internal(_) | Error::Io { .. } => Cow::Borrowed("internal server error"),
        }
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Error::Upload(err) => err.user_hint(),
            Error::Archive(err) => err.user_hint(),
            Error::Build(err) => err.user_hint(),
            Error::Job(err) => err.user_hint(),
            Error::Config(err) => err.user_hint(),
            Error::Internal(_) | Error::Io { .. } => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        match self {
            Error::Upload(err) => err.user_code(),
            Error::Archive(err) => err.user_code(),
            Error::Build(err) => err.user_code(),
            Error::Job(err) => err.user_code(),
            Error::Config(err) => err.user_code(),
            Error::Internal(_) => Some("error.internal"),
            Error::Io { .. } => Some("error.io"),
        }
    }
}
