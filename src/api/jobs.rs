//! `/api/v1` generation, status, download and job management endpoints.

use std::fmt::Display;
use std::path::Path as FsPath;

use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::AppState;
use crate::config::ALLOWED_EXTENSIONS;
use crate::error::ApiError;
use crate::jobs::{JobKind, JobRecord, JobStatus, JobTask};
use crate::pipelines::{ImageRequest, VideoSettings};

const STEPS_RANGE: (u32, u32) = (10, 50);
const GUIDANCE_RANGE: (f32, f32) = (1.0, 20.0);
const SIZE_RANGE: (u32, u32) = (256, 1024);

fn default_room_type() -> String {
    "living_room".to_string()
}

fn default_motion_style() -> String {
    "moderate".to_string()
}

fn default_steps() -> u32 {
    20
}

fn default_guidance() -> f32 {
    7.5
}

fn default_size() -> u32 {
    512
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct ImageGenerationRequest {
    pub prompt: String,
    #[serde(default = "default_room_type")]
    pub room_type: String,
    #[serde(default = "default_steps")]
    pub num_inference_steps: u32,
    #[serde(default = "default_guidance")]
    pub guidance_scale: f32,
    #[serde(default = "default_size")]
    pub width: u32,
    #[serde(default = "default_size")]
    pub height: u32,
}

#[derive(Debug, Deserialize)]
pub struct ImageToVideoRequest {
    pub prompt: String,
    #[serde(default = "default_room_type")]
    pub room_type: String,
    #[serde(default = "default_motion_style")]
    pub motion_style: String,
    #[serde(default = "default_steps")]
    pub num_inference_steps: u32,
    #[serde(default = "default_guidance")]
    pub guidance_scale: f32,
}

/// Query parameters of the upload endpoint.
#[derive(Debug, Deserialize)]
pub struct VideoQuery {
    #[serde(default = "default_room_type")]
    pub room_type: String,
    #[serde(default = "default_motion_style")]
    pub motion_style: String,
    #[serde(default = "default_true")]
    pub enhance_lighting: bool,
    #[serde(default = "default_true")]
    pub adjust_contrast: bool,
}

#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub message: String,
}

impl JobResponse {
    fn queued(job_id: Uuid, message: &str) -> Json<Self> {
        Json(Self {
            job_id,
            status: JobStatus::Queued,
            message: message.to_string(),
        })
    }
}

fn check_range<T: PartialOrd + Display>(
    name: &str,
    value: T,
    (min, max): (T, T),
) -> Result<(), ApiError> {
    if value < min || value > max {
        return Err(ApiError::BadRequest(format!(
            "{name} must be between {min} and {max}, got {value}"
        )));
    }
    Ok(())
}

fn check_prompt(prompt: &str) -> Result<(), ApiError> {
    if prompt.trim().is_empty() {
        return Err(ApiError::BadRequest("prompt must not be empty".to_string()));
    }
    Ok(())
}

fn parse_job_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("Invalid job id: {raw}")))
}

async fn find_job(state: &AppState, id: Uuid) -> Result<JobRecord, ApiError> {
    state
        .store
        .get(id)
        .await
        .ok_or_else(|| ApiError::NotFound("Job not found".to_string()))
}

/// Lowercased extension of an uploaded file name, if it is one we accept.
fn upload_extension(file_name: &str) -> Result<String, ApiError> {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();
    if ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        Ok(ext)
    } else {
        Err(ApiError::BadRequest(format!(
            "Invalid file type. Allowed: {}",
            ALLOWED_EXTENSIONS.join(", ")
        )))
    }
}

fn too_large(max_bytes: usize) -> ApiError {
    ApiError::PayloadTooLarge(format!(
        "File too large. Maximum size is {} MB",
        max_bytes / (1024 * 1024)
    ))
}

fn multipart_error(e: MultipartError, max_bytes: usize) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        too_large(max_bytes)
    } else {
        ApiError::BadRequest(e.body_text())
    }
}

async fn read_file(path: &FsPath, missing: &str) -> Result<Vec<u8>, ApiError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ApiError::NotFound(missing.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

fn attachment(bytes: Vec<u8>, content_type: &'static str, file_name: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        bytes,
    )
        .into_response()
}

/// POST /api/v1/generate/image
pub(super) async fn generate_image(
    State(state): State<AppState>,
    Json(body): Json<ImageGenerationRequest>,
) -> Result<Json<JobResponse>, ApiError> {
    check_prompt(&body.prompt)?;
    check_range("num_inference_steps", body.num_inference_steps, STEPS_RANGE)?;
    check_range("guidance_scale", body.guidance_scale, GUIDANCE_RANGE)?;
    check_range("width", body.width, SIZE_RANGE)?;
    check_range("height", body.height, SIZE_RANGE)?;

    let request = ImageRequest {
        prompt: body.prompt,
        num_inference_steps: body.num_inference_steps,
        guidance_scale: body.guidance_scale,
        width: body.width,
        height: body.height,
    };

    let id = state.store.create(JobKind::Image).await;
    info!(job_id = %id, room_type = %body.room_type, "Image generation requested");
    state.worker.spawn(id, JobTask::Image { request });

    Ok(JobResponse::queued(id, "Image generation started"))
}

/// POST /api/v1/generate/video (multipart `file`)
pub(super) async fn generate_video(
    State(state): State<AppState>,
    Query(query): Query<VideoQuery>,
    mut multipart: Multipart,
) -> Result<Json<JobResponse>, ApiError> {
    let max_bytes = state.config.max_upload_bytes;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_bytes))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let ext = upload_extension(&file_name)?;
        let data = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e, max_bytes))?;
        upload = Some((ext, data));
    }

    let (ext, data) =
        upload.ok_or_else(|| ApiError::BadRequest("Missing multipart field 'file'".to_string()))?;
    if data.len() > max_bytes {
        return Err(too_large(max_bytes));
    }

    let id = state.store.create(JobKind::Video).await;
    let source = state.store.dirs().upload_path(id, &ext);
    if let Err(e) = tokio::fs::write(&source, &data).await {
        warn!(job_id = %id, error = %e, "Failed to save upload");
        let _ = state.store.delete(id).await;
        return Err(ApiError::Internal(format!("Failed to save file: {e}")));
    }

    let settings = VideoSettings::resolve(&query.room_type, &query.motion_style)
        .with_preprocessing(query.enhance_lighting, query.adjust_contrast);
    info!(
        job_id = %id,
        bytes = data.len(),
        room_type = %query.room_type,
        motion_style = %query.motion_style,
        "Video generation requested"
    );
    state.worker.spawn(id, JobTask::Video { source, settings });

    Ok(JobResponse::queued(id, "Video generation started"))
}

/// POST /api/v1/generate/image-to-video
pub(super) async fn generate_image_to_video(
    State(state): State<AppState>,
    Json(body): Json<ImageToVideoRequest>,
) -> Result<Json<JobResponse>, ApiError> {
    check_prompt(&body.prompt)?;
    check_range("num_inference_steps", body.num_inference_steps, STEPS_RANGE)?;
    check_range("guidance_scale", body.guidance_scale, GUIDANCE_RANGE)?;

    let mut request = ImageRequest::new(body.prompt);
    request.num_inference_steps = body.num_inference_steps;
    request.guidance_scale = body.guidance_scale;
    let settings = VideoSettings::resolve(&body.room_type, &body.motion_style);

    let id = state.store.create(JobKind::ImageToVideo).await;
    info!(job_id = %id, room_type = %body.room_type, "Image-to-video generation requested");
    state.worker.spawn(id, JobTask::ImageToVideo { request, settings });

    Ok(JobResponse::queued(id, "Image-to-video generation started"))
}

/// GET /api/v1/status/{job_id}
pub(super) async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobRecord>, ApiError> {
    let id = parse_job_id(&job_id)?;
    Ok(Json(find_job(&state, id).await?))
}

/// GET /api/v1/download/image/{job_id}
///
/// `{id}_image` names the first-stage image of an image-to-video job, which
/// is downloadable as soon as the job publishes its `image_url`.
pub(super) async fn download_image(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Response, ApiError> {
    let (raw_id, stage) = match job_id.strip_suffix("_image") {
        Some(raw) => (raw, true),
        None => (job_id.as_str(), false),
    };
    let id = parse_job_id(raw_id)?;
    let job = find_job(&state, id).await?;

    let ready = job.status == JobStatus::Completed || (stage && job.image_url.is_some());
    if !ready {
        return Err(ApiError::BadRequest(format!(
            "Image not ready. Status: {}",
            job.status
        )));
    }

    let dirs = state.store.dirs();
    let path = if stage || job.job_type == JobKind::ImageToVideo {
        dirs.stage_image_path(id)
    } else {
        dirs.image_path(id)
    };
    let bytes = read_file(&path, "Image file not found").await?;
    Ok(attachment(bytes, "image/png", format!("interior_design_{job_id}.png")))
}

/// GET /api/v1/download/video/{job_id}
pub(super) async fn download_video(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_job_id(&job_id)?;
    let job = find_job(&state, id).await?;
    if job.status != JobStatus::Completed || job.video_url.is_none() {
        return Err(ApiError::BadRequest(format!(
            "Video not ready. Status: {}",
            job.status
        )));
    }

    let path = state.store.dirs().video_path(id);
    let bytes = read_file(&path, "Video file not found").await?;
    Ok(attachment(bytes, "video/mp4", format!("interior_design_{id}.mp4")))
}

/// DELETE /api/v1/jobs/{job_id}
pub(super) async fn delete_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_job_id(&job_id)?;
    let files_removed = state.store.delete(id).await?;
    Ok(Json(serde_json::json!({
        "message": "Job deleted successfully",
        "files_removed": files_removed,
    })))
}

/// GET /api/v1/jobs
pub(super) async fn list_jobs(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({ "jobs": state.store.list().await }))
}
