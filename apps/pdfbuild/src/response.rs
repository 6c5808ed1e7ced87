//! Mapping of service errors onto HTTP responses

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use pdfbuild_errors::{ArchiveError, BuildError, Error, JobError, UploadError, UserFacingError};

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Error returned by request handlers
#[derive(Debug)]
pub struct HttpError(pub Error);

impl<E: Into<Error>> From<E> for HttpError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl HttpError {
    /// Returns the HTTP status code for this error.
    ///
    /// - Upload rejected: 400 Bad Request, 413 Payload Too Large when oversized
    /// - Malformed or unsafe archive: 400 Bad Request
    /// - No build descriptor: 422 Unprocessable Entity
    /// - Build tool failed: 500 Internal Server Error
    /// - Build deadline exceeded: 504 Gateway Timeout
    /// - Unknown or expired job: 404 Not Found
    /// - Everything else: 500 Internal Server Error
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            Error::Upload(UploadError::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            Error::Upload(_) => StatusCode::BAD_REQUEST,
            Error::Archive(ArchiveError::InvalidArchive { .. } | ArchiveError::UnsafePath { .. }) => {
                StatusCode::BAD_REQUEST
            }
            Error::Build(BuildError::NoBuildDescriptor { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Build(BuildError::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
            Error::Job(JobError::NotFound { .. } | JobError::ArtifactMissing { .. }) => {
                StatusCode::NOT_FOUND
            }
            Error::Archive(_)
            | Error::Build(_)
            | Error::Job(_)
            | Error::Config(_)
            | Error::Internal(_)
            | Error::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self, status: StatusCode) -> String {
        match &self.0 {
            Error::Build(BuildError::Failed { log, .. }) => {
                format!("Build failed.\n\n----- build log -----\n{log}")
            }
            Error::Build(BuildError::Timeout { .. }) => "Build timed out.".to_string(),
            // Server-side faults never expose paths or internal state.
            _ if status.is_server_error() => "Internal server error".to_string(),
            err => match err.user_hint() {
                Some(hint) => format!("{}\n\n{hint}", err.user_message()),
                None => err.user_message().into_owned(),
            },
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.0.user_code().unwrap_or("internal");

        match &self.0 {
            Error::Build(BuildError::Failed { exit_code, .. }) => {
                tracing::info!(%status, code, exit_code = ?exit_code, "build failed");
            }
            err if status.is_server_error() => {
                tracing::error!(%status, code, error = %err, "request failed");
            }
            err => {
                tracing::info!(%status, code, error = %err, "request rejected");
            }
        }

        let body = self.body(status);
        (status, [(header::CONTENT_TYPE, TEXT_PLAIN)], body).into_response()
    }
}
