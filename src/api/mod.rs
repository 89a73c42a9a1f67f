//! HTTP surface.
//!
//! - `jobs`: `/api/v1` generation, status, download, delete and listing
//! - `chat`: the furniture chatbot (`/chat`, `/quick_action`, `/clear`)
//! - `service`: descriptor, health and text-to-speech
//! - `ws`: `/ws/jobs` job-event stream

mod chat;
mod jobs;
mod service;
mod ws;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{delete, get, post};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::config::ServerConfig;
use crate::dialogue::SessionRegistry;
use crate::error::ConfigError;
use crate::jobs::{GenerationWorker, JobStore, OutputDirs};
use crate::pipelines::Pipelines;

/// Room left in the request body for multipart framing around the file.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<JobStore>,
    pub worker: GenerationWorker,
    pub sessions: Arc<SessionRegistry>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Wire a fresh job store and worker over `pipelines`.
    pub fn new(config: ServerConfig, pipelines: Pipelines, sessions: SessionRegistry) -> Self {
        let store = JobStore::new(OutputDirs::from_config(&config));
        let worker = GenerationWorker::new(Arc::clone(&store), Arc::new(pipelines));
        Self {
            store,
            worker,
            sessions: Arc::new(sessions),
            config: Arc::new(config),
        }
    }

    pub fn pipelines(&self) -> &Pipelines {
        self.worker.pipelines()
    }
}

/// CORS policy: any origin unless a comma-separated allow-list is given.
pub fn cors_layer(origins: Option<&str>) -> Result<CorsLayer, ConfigError> {
    let base = CorsLayer::new().allow_headers(Any).allow_methods(Any);
    let Some(origins) = origins else {
        return Ok(base.allow_origin(Any));
    };

    let parsed = origins
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<HeaderValue>()
                .map_err(|e| ConfigError::InvalidValue {
                    key: "DECOR_ASSIST_CORS_ORIGINS".to_string(),
                    message: format!("{s}: {e}"),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if parsed.is_empty() {
        return Ok(base.allow_origin(Any));
    }
    Ok(base.allow_origin(parsed))
}

/// Request body cap: the upload limit plus multipart framing.
fn body_limit(max_upload_bytes: usize) -> usize {
    max_upload_bytes.saturating_add(MULTIPART_OVERHEAD)
}

/// Build the complete application router.
pub fn router(state: AppState) -> Result<Router, ConfigError> {
    let cors = cors_layer(state.config.cors_allowed_origins.as_deref())?;
    let body_limit = body_limit(state.config.max_upload_bytes);

    let api = Router::new()
        .route("/generate/image", post(jobs::generate_image))
        .route("/generate/video", post(jobs::generate_video))
        .route("/generate/image-to-video", post(jobs::generate_image_to_video))
        .route("/status/{job_id}", get(jobs::job_status))
        .route("/download/image/{job_id}", get(jobs::download_image))
        .route("/download/video/{job_id}", get(jobs::download_video))
        .route("/jobs", get(jobs::list_jobs))
        .route("/jobs/{job_id}", delete(jobs::delete_job));

    Ok(Router::new()
        .route("/", get(service::root))
        .route("/health", get(service::health))
        .route("/tts", post(service::tts))
        .route("/chat", post(chat::chat))
        .route("/quick_action", post(chat::quick_action))
        .route("/clear", post(chat::clear))
        .route("/ws/jobs", get(ws::ws_handler))
        .nest("/api/v1", api)
        .layer(
            ServiceBuilder::new()
                .layer(cors)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state))
}

/// Bind `addr` and serve until the process exits.
pub async fn serve(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = router(state).context("Invalid server configuration")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, "HTTP server listening");
    axum::serve(listener, app)
        .await
        .context("HTTP server stopped")?;
    Ok(())
}
