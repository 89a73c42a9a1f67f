//! Service descriptor, health and text-to-speech.

use std::path::Path;

use axum::Json;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct TtsRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_language() -> String {
    "ar".to_string()
}

/// GET /
pub(super) async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": "Decor Assist",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "active",
        "endpoints": {
            "generate_image": "/api/v1/generate/image",
            "generate_video": "/api/v1/generate/video",
            "generate_image_to_video": "/api/v1/generate/image-to-video",
            "status": "/api/v1/status/{job_id}",
            "download_image": "/api/v1/download/image/{job_id}",
            "download_video": "/api/v1/download/video/{job_id}",
            "jobs": "/api/v1/jobs",
            "tts": "/tts",
            "chat": "/chat",
            "quick_action": "/quick_action",
            "clear": "/clear",
            "job_events": "/ws/jobs",
            "health": "/health"
        }
    }))
}

/// GET /health
pub(super) async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let pipelines = state.pipelines();
    Json(serde_json::json!({
        "status": "healthy",
        "image_model_loaded": pipelines.image.is_loaded(),
        "video_model_loaded": pipelines.video.is_loaded(),
        "speech_model_loaded": pipelines.speech.is_loaded(),
        "jobs": state.store.len().await,
        "timestamp": Utc::now(),
    }))
}

/// POST /tts → audio/wav
pub(super) async fn tts(
    State(state): State<AppState>,
    Json(body): Json<TtsRequest>,
) -> Result<Response, ApiError> {
    let text = body.text.trim().to_string();
    if text.is_empty() {
        return Err(ApiError::BadRequest("Text cannot be empty".to_string()));
    }

    let audio_id = Uuid::new_v4();
    let path = state.config.tts_dir.join(format!("{audio_id}.wav"));
    info!(audio_id = %audio_id, chars = text.chars().count(), language = %body.language, "Generating speech");

    let output = path.clone();
    let language = body.language;
    let synthesized = state
        .pipelines()
        .speech
        .run(|p| async move { p.synthesize(&text, &language, &output).await })
        .await;
    let bytes = match synthesized {
        Ok(()) => tokio::fs::read(&path).await.map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };
    // The audio travels in the response; the file is scratch space
    remove_scratch(&path).await;
    let bytes = bytes.map_err(|e| ApiError::Internal(format!("TTS generation failed: {e}")))?;

    Ok((
        [
            (header::CONTENT_TYPE, "audio/wav".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"speech_{audio_id}.wav\""),
            ),
        ],
        bytes,
    )
        .into_response())
}

async fn remove_scratch(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove speech file"),
    }
}
