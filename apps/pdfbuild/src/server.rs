//! Router construction and server lifecycle

use crate::handlers;
use axum::extract::{DefaultBodyLimit, Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use chrono::Utc;
use pdfbuild_builder::BuildPipeline;
use pdfbuild_config::Config;
use pdfbuild_jobs::JobStore;
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Room for multipart boundaries and headers on top of the file itself
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

/// Shared state handed to every request handler
#[derive(Debug, Clone)]
pub struct AppState {
    pub pipeline: Arc<BuildPipeline>,
    pub store: Arc<JobStore>,
    pub job_ttl: Duration,
}

impl AppState {
    #[must_use]
    pub fn new(pipeline: BuildPipeline, store: JobStore, job_ttl: Duration) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            store: Arc::new(store),
            job_ttl,
        }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            BuildPipeline::from_config(config),
            JobStore::new(),
            config.job_ttl(),
        )
    }

    pub(crate) fn max_upload_bytes(&self) -> u64 {
        self.pipeline.settings().max_upload_bytes
    }
}

/// Build the application router
#[must_use]
pub fn router(state: AppState) -> Router {
    let body_limit = usize::try_from(state.max_upload_bytes().saturating_add(MULTIPART_OVERHEAD))
        .unwrap_or(usize::MAX);

    Router::new()
        .route("/", get(handlers::index))
        .route("/build", post(handlers::submit_build))
        .route("/jobs/{id}", get(handlers::job_ready))
        .route("/jobs/{id}/download", get(handlers::download_artifact))
        .route("/healthz", get(handlers::healthz))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn_with_state(state.clone(), sweep_expired_jobs))
        .with_state(state)
}

/// Reclaim expired jobs before the request itself is handled
async fn sweep_expired_jobs(State(state): State<AppState>, request: Request, next: Next) -> Response {
    state.store.sweep_expired(Utc::now(), state.job_ttl).await;
    next.run(request).await
}

/// Serve until `shutdown` resolves, then delete every remaining job
///
/// # Errors
///
/// Returns an error if the listener fails.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let store = Arc::clone(&state.store);
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "pdfbuild listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    let purged = store.purge().await;
    tracing::info!(purged, "server stopped");
    Ok(())
}
