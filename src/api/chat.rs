//! Chatbot endpoints. Each request names an optional session; image turns
//! run an image job inline and answer once it has finished.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::AppState;
use crate::dialogue::{Turn, TurnAction};
use crate::jobs::worker::image_download_url;
use crate::jobs::{JobKind, JobStatus, JobTask};
use crate::pipelines::ImageRequest;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QuickActionRequest {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ClearRequest {
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<Uuid>,
}

/// Carry out the turn's action, if any, and build the reply.
async fn complete_turn(state: &AppState, session_id: Option<&str>, turn: Turn) -> ChatResponse {
    let Some(TurnAction::GenerateImage { description }) = turn.action else {
        return ChatResponse {
            response: turn.response,
            image: None,
            job_id: None,
        };
    };

    let id = state.store.create(JobKind::Image).await;
    info!(job_id = %id, description = %description, "Chat image requested");
    let request = ImageRequest::new(description.clone());
    let succeeded = state
        .worker
        .run(id, JobTask::Image { request })
        .await
        .is_some_and(|job| job.status == JobStatus::Completed);

    let response = state
        .sessions
        .finish_image(session_id, &description, succeeded)
        .await;
    ChatResponse {
        response,
        image: succeeded.then(|| image_download_url(id)),
        job_id: Some(id),
    }
}

/// POST /chat
pub(super) async fn chat(
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> Json<ChatResponse> {
    let session = body.session_id.as_deref();
    debug!(session = ?session, "Chat message");
    let turn = state.sessions.respond(session, &body.message).await;
    Json(complete_turn(&state, session, turn).await)
}

/// POST /quick_action
pub(super) async fn quick_action(
    State(state): State<AppState>,
    Json(body): Json<QuickActionRequest>,
) -> Json<ChatResponse> {
    let session = body.session_id.as_deref();
    debug!(session = ?session, action = %body.action, "Quick action");
    let turn = state.sessions.quick_action(session, &body.action).await;
    Json(complete_turn(&state, session, turn).await)
}

/// POST /clear (body optional)
pub(super) async fn clear(
    State(state): State<AppState>,
    body: Option<Json<ClearRequest>>,
) -> Json<serde_json::Value> {
    let Json(body) = body.unwrap_or_default();
    state.sessions.clear(body.session_id.as_deref()).await;
    Json(serde_json::json!({ "status": "success", "message": "Chat cleared" }))
}
