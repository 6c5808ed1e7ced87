//! Request handlers

use crate::pages;
use crate::response::HttpError;
use crate::server::AppState;
use axum::extract::multipart::{Multipart, MultipartError};
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use pdfbuild_builder::Upload;
use pdfbuild_errors::{Error, UploadError};
use pdfbuild_jobs::JobId;
use std::ffi::OsStr;
use tokio::fs;

const FILE_FIELD: &str = "file";

pub(crate) async fn index() -> Html<&'static str> {
    Html(pages::UPLOAD_FORM)
}

pub(crate) async fn healthz() -> &'static str {
    "ok"
}

/// Run a build for the uploaded archive and redirect to its job page
pub(crate) async fn submit_build(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Redirect, HttpError> {
    let upload = read_upload(&state, multipart).await?;
    let completed = state.pipeline.run(upload).await?;

    let work_dir = completed.work_dir.clone();
    match state.store.create(completed.artifact, completed.work_dir).await {
        Ok(id) => Ok(Redirect::to(&format!("/jobs/{id}"))),
        Err(e) => {
            // No job owns the directory, so it has to go now.
            if let Err(io_err) = fs::remove_dir_all(&work_dir).await {
                tracing::warn!(work_dir = %work_dir.display(), error = %io_err, "failed to remove working directory");
            }
            Err(e.into())
        }
    }
}

pub(crate) async fn job_ready(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Html<String>, HttpError> {
    let id: JobId = id.parse()?;
    let job = state.store.redeem(&id).await?;
    Ok(Html(pages::job_ready(&id, &job.download_name())))
}

pub(crate) async fn download_artifact(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, HttpError> {
    let id: JobId = id.parse()?;
    let job = state.store.redeem(&id).await?;

    let bytes = fs::read(job.artifact())
        .await
        .map_err(|e| Error::io_with_path(&e, job.artifact()))?;
    let content_type = content_type_for(job.artifact().extension());
    let disposition = format!(
        "attachment; filename=\"{}\"",
        header_safe_file_name(&job.download_name())
    );

    tracing::info!(job_id = %id, size = bytes.len(), "artifact downloaded");
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

/// Pull the archive out of the multipart body
///
/// Other fields are skipped. The file name is checked before the body is
/// buffered so that obviously wrong uploads are refused early.
async fn read_upload(state: &AppState, mut multipart: Multipart) -> Result<Upload, HttpError> {
    let limit = state.max_upload_bytes();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(&e, limit))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        state.pipeline.validate_upload(&file_name, 0)?;

        let bytes = field.bytes().await.map_err(|e| multipart_error(&e, limit))?;
        return Ok(Upload {
            file_name,
            bytes: bytes.to_vec(),
        });
    }

    Err(UploadError::MissingFile {
        field: FILE_FIELD.to_string(),
    }
    .into())
}

fn multipart_error(err: &MultipartError, limit: u64) -> HttpError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        UploadError::TooLarge { limit }.into()
    } else {
        UploadError::Unreadable {
            message: err.body_text(),
        }
        .into()
    }
}

fn content_type_for(extension: Option<&OsStr>) -> &'static str {
    match extension.map(|e| e.to_string_lossy().to_ascii_lowercase()) {
        Some(ext) if ext == "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

fn header_safe_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c == ' ' || (c.is_ascii_graphic() && c != '"' && c != '\\') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type() {
        assert_eq!(content_type_for(Some(OsStr::new("PDF"))), "application/pdf");
        assert_eq!(
            content_type_for(Some(OsStr::new("ps"))),
            "application/octet-stream"
        );
        assert_eq!(content_type_for(None), "application/octet-stream");
    }

    #[test]
    fn test_header_safe_file_name() {
        assert_eq!(header_safe_file_name("main.pdf"), "main.pdf");
        assert_eq!(header_safe_file_name("my paper.pdf"), "my paper.pdf");
        assert_eq!(header_safe_file_name("a\"b\\c\r\n.pdf"), "a_b_c__.pdf");
        assert_eq!(header_safe_file_name("résumé.pdf"), "r_sum_.pdf");
    }
}
