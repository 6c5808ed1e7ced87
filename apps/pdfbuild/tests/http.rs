//! End-to-end tests against a server bound to an ephemeral port
//!
//! `sh` plays the build tool: the descriptor is `build.sh` and the target is
//! the script itself.

use pdfbuild::{serve, AppState};
use pdfbuild_config::Config;
use reqwest::multipart::{Form, Part};
use reqwest::{redirect, Client, StatusCode};
use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const PDF_BYTES: &[u8] = b"%PDF-1.4 end-to-end";

struct TestServer {
    base: String,
    client: Client,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<std::io::Result<()>>,
}

impl TestServer {
    async fn start(config: &Config) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = AppState::from_config(config);
        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(serve(listener, state, async {
            let _ = rx.await;
        }));

        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .build()
            .unwrap();

        Self {
            base: format!("http://{addr}"),
            client,
            shutdown: Some(tx),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> reqwest::Response {
        let form = Form::new().part("file", Part::bytes(bytes).file_name(file_name.to_string()));
        self.client
            .post(self.url("/build"))
            .multipart(form)
            .send()
            .await
            .unwrap()
    }

    async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    async fn stop(mut self) {
        drop(self.client);
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.handle.await.unwrap().unwrap();
    }
}

fn config(work_root: &Path) -> Config {
    let mut config = Config::default();
    config.build.program = "sh".to_string();
    config.build.target = "build.sh".to_string();
    config.build.descriptor = "build.sh".to_string();
    config.build.timeout = 30;
    config.paths.work_root = Some(work_root.to_path_buf());
    config
}

fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().unix_permissions(0o644);
    for (name, data) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

fn succeeding_project() -> Vec<u8> {
    let script = format!(
        "printf '%s' '{}' > main.pdf\n",
        String::from_utf8_lossy(PDF_BYTES)
    );
    zip_bytes(&[
        ("paper/build.sh", script.as_bytes()),
        ("paper/main.tex", b"\\documentclass{article}"),
    ])
}

fn entries_in(dir: &Path) -> usize {
    fs::read_dir(dir).map(Iterator::count).unwrap_or(0)
}

fn job_location(response: &reqwest::Response) -> String {
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response
        .headers()
        .get(reqwest::header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(location.starts_with("/jobs/"), "unexpected location {location}");
    location
}

#[tokio::test]
async fn test_upload_build_and_download() {
    let root = TempDir::new().unwrap();
    let server = TestServer::start(&config(root.path())).await;

    let response = server.upload("paper.zip", succeeding_project()).await;
    let location = job_location(&response);

    let page = server.get(&location).await;
    assert_eq!(page.status(), StatusCode::OK);
    let html = page.text().await.unwrap();
    assert!(html.contains(&format!("{location}/download")));
    assert!(html.contains("main.pdf"));

    let download = server.get(&format!("{location}/download")).await;
    assert_eq!(download.status(), StatusCode::OK);
    let headers = download.headers().clone();
    assert_eq!(
        headers.get(reqwest::header::CONTENT_TYPE).unwrap(),
        "application/pdf"
    );
    assert_eq!(
        headers.get(reqwest::header::CONTENT_DISPOSITION).unwrap(),
        "attachment; filename=\"main.pdf\""
    );
    assert_eq!(download.bytes().await.unwrap().as_ref(), PDF_BYTES);

    // The job owns exactly one working directory until it expires.
    assert_eq!(entries_in(root.path()), 1);
    server.stop().await;
}

#[tokio::test]
async fn test_build_failure_returns_log() {
    let root = TempDir::new().unwrap();
    let server = TestServer::start(&config(root.path())).await;

    let bytes = zip_bytes(&[(
        "build.sh",
        b"echo 'Running pdflatex'\necho '! LaTeX Error: File not found.' >&2\nexit 2\n",
    )]);
    let response = server.upload("paper.zip", bytes).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.text().await.unwrap();
    assert_eq!(
        body,
        "Build failed.\n\n----- build log -----\nRunning pdflatex\n! LaTeX Error: File not found.\n"
    );
    assert_eq!(entries_in(root.path()), 0);
    server.stop().await;
}

#[tokio::test]
async fn test_build_timeout_is_distinct() {
    let root = TempDir::new().unwrap();
    let mut config = config(root.path());
    config.build.timeout = 1;
    let server = TestServer::start(&config).await;

    let bytes = zip_bytes(&[("build.sh", b"exec sleep 30\n")]);
    let response = server.upload("paper.zip", bytes).await;

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(response.text().await.unwrap(), "Build timed out.");
    assert_eq!(entries_in(root.path()), 0);
    server.stop().await;
}

#[tokio::test]
async fn test_input_validation_failures() {
    let root = TempDir::new().unwrap();
    let mut config = config(root.path());
    config.server.max_upload_bytes = 1024;
    let server = TestServer::start(&config).await;

    let response = server.upload("paper.tar.gz", succeeding_project()).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = server.upload("", succeeding_project()).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let form = Form::new().text("comment", "no file here");
    let response = server
        .client
        .post(server.url("/build"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = server.upload("paper.zip", vec![0; 4096]).await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let response = server
        .upload("paper.zip", b"definitely not a zip".to_vec())
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(entries_in(root.path()), 0);
    server.stop().await;
}

#[tokio::test]
async fn test_unsafe_archive_rejected() {
    let root = TempDir::new().unwrap();
    let server = TestServer::start(&config(root.path())).await;

    let bytes = zip_bytes(&[
        ("build.sh", b"printf x > out.pdf\n"),
        ("../../escape.txt", b"owned"),
    ]);
    let response = server.upload("paper.zip", bytes).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(entries_in(root.path()), 0);
    assert!(!root.path().join("escape.txt").exists());
    server.stop().await;
}

#[tokio::test]
async fn test_conflicting_entries_are_bad_request() {
    let root = TempDir::new().unwrap();
    let server = TestServer::start(&config(root.path())).await;

    let bytes = zip_bytes(&[
        ("build.sh", b"printf x > out.pdf\n"),
        ("a", b"file"),
        ("a/b", b"nested under a file"),
    ]);
    let response = server.upload("paper.zip", bytes).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(entries_in(root.path()), 0);
    server.stop().await;
}

#[tokio::test]
async fn test_body_over_transport_limit_is_too_large() {
    let root = TempDir::new().unwrap();
    let mut config = config(root.path());
    config.server.max_upload_bytes = 1024;
    let server = TestServer::start(&config).await;

    // Cap plus the multipart allowance is about 65 KiB.
    let response = server.upload("paper.zip", vec![0; 80 * 1024]).await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(entries_in(root.path()), 0);
    server.stop().await;
}

#[tokio::test]
async fn test_missing_descriptor_is_unprocessable() {
    let root = TempDir::new().unwrap();
    let server = TestServer::start(&config(root.path())).await;

    let bytes = zip_bytes(&[("paper/main.tex", b"\\documentclass{article}")]);
    let response = server.upload("paper.zip", bytes).await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(entries_in(root.path()), 0);
    server.stop().await;
}

#[tokio::test]
async fn test_unknown_jobs_are_not_found() {
    let root = TempDir::new().unwrap();
    let server = TestServer::start(&config(root.path())).await;

    let unknown = "/jobs/7f1e4a52-1b0c-4d8e-9a55-2f3c6d7e8a90";
    assert_eq!(server.get(unknown).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        server.get(&format!("{unknown}/download")).await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        server.get("/jobs/not-a-job/download").await.status(),
        StatusCode::NOT_FOUND
    );
    server.stop().await;
}

#[tokio::test]
async fn test_expired_job_is_swept_on_next_request() {
    let root = TempDir::new().unwrap();
    let mut config = config(root.path());
    config.jobs.ttl = 1;
    let server = TestServer::start(&config).await;

    let response = server.upload("paper.zip", succeeding_project()).await;
    let location = job_location(&response);
    assert_eq!(entries_in(root.path()), 1);

    tokio::time::sleep(Duration::from_millis(1_500)).await;

    // Any request triggers the sweep, before the handler runs.
    assert_eq!(server.get("/healthz").await.status(), StatusCode::OK);
    assert_eq!(entries_in(root.path()), 0);
    assert_eq!(
        server.get(&format!("{location}/download")).await.status(),
        StatusCode::NOT_FOUND
    );
    server.stop().await;
}

#[tokio::test]
async fn test_shutdown_purges_jobs() {
    let root = TempDir::new().unwrap();
    let server = TestServer::start(&config(root.path())).await;

    let response = server.upload("paper.zip", succeeding_project()).await;
    job_location(&response);
    assert_eq!(entries_in(root.path()), 1);

    server.stop().await;
    assert_eq!(entries_in(root.path()), 0);
}

#[tokio::test]
async fn test_index_serves_upload_form() {
    let root = TempDir::new().unwrap();
    let server = TestServer::start(&config(root.path())).await;

    let response = server.get("/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = response.text().await.unwrap();
    assert!(html.contains(r#"name="file""#));
    assert!(html.contains(r#"action="/build""#));
    server.stop().await;
}
