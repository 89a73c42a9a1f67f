//! HTTP inference backends.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::ImageFormat;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};

use super::preprocess::prepare_video_input;
use super::settings::{VideoSettings, enhance_prompt};
use super::{ImageOutput, ImagePipeline, ImageRequest, SpeechPipeline, VideoOutput, VideoPipeline};
use crate::error::GenerationError;
use crate::jobs::files::file_size_mb;

fn request_failed(backend: &str, reason: impl std::fmt::Display) -> GenerationError {
    GenerationError::RequestFailed {
        backend: backend.to_string(),
        reason: reason.to_string(),
    }
}

/// POST and return the body bytes, failing on non-2xx or an empty body.
async fn fetch_bytes(
    backend: &str,
    request: reqwest::RequestBuilder,
) -> Result<Vec<u8>, GenerationError> {
    let response = request.send().await.map_err(|e| request_failed(backend, e))?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(request_failed(backend, format!("HTTP {status}: {body}")));
    }
    let bytes = response
        .bytes()
        .await
        .map_err(|e| request_failed(backend, e))?;
    if bytes.is_empty() {
        return Err(GenerationError::InvalidResponse {
            backend: backend.to_string(),
            reason: "empty body".to_string(),
        });
    }
    Ok(bytes.to_vec())
}

// ── Image ───────────────────────────────────────────────────────────────

/// Hugging Face inference API text-to-image backend.
pub struct HfImagePipeline {
    client: reqwest::Client,
    url: String,
    api_key: SecretString,
}

impl HfImagePipeline {
    pub fn new(url: impl Into<String>, api_key: SecretString) -> Self {
        let url = url.into();
        info!(url = %url, "Using Hugging Face image backend");
        Self {
            client: reqwest::Client::new(),
            url,
            api_key,
        }
    }
}

#[async_trait]
impl ImagePipeline for HfImagePipeline {
    fn name(&self) -> &str {
        "huggingface"
    }

    async fn generate(
        &self,
        request: &ImageRequest,
        output: &Path,
    ) -> Result<ImageOutput, GenerationError> {
        let body = serde_json::json!({
            "inputs": enhance_prompt(&request.prompt),
            "parameters": {
                "num_inference_steps": request.num_inference_steps,
                "guidance_scale": request.guidance_scale,
                "width": request.width,
                "height": request.height,
            }
        });
        let bytes = fetch_bytes(
            self.name(),
            self.client
                .post(&self.url)
                .bearer_auth(self.api_key.expose_secret())
                .json(&body),
        )
        .await?;

        // The API may answer in any image format; store PNG.
        let path: PathBuf = output.to_path_buf();
        let (width, height) = tokio::task::spawn_blocking(move || {
            let img = image::load_from_memory(&bytes).map_err(|e| {
                GenerationError::InvalidResponse {
                    backend: "huggingface".to_string(),
                    reason: e.to_string(),
                }
            })?;
            img.save_with_format(&path, ImageFormat::Png)?;
            Ok::<_, GenerationError>((img.width(), img.height()))
        })
        .await
        .map_err(|e| request_failed("huggingface", e))??;

        debug!(path = %output.display(), width, height, "Image written");
        Ok(ImageOutput {
            width,
            height,
            file_size_mb: file_size_mb(output).await,
        })
    }
}

// ── Video ───────────────────────────────────────────────────────────────

/// Image-to-video service: multipart upload of the prepared image plus the
/// generation settings, mp4 bytes back.
pub struct RemoteVideoPipeline {
    client: reqwest::Client,
    url: String,
}

impl RemoteVideoPipeline {
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        info!(url = %url, "Using remote video backend");
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait]
impl VideoPipeline for RemoteVideoPipeline {
    fn name(&self) -> &str {
        "remote-video"
    }

    async fn generate(
        &self,
        image: &Path,
        settings: &VideoSettings,
        output: &Path,
    ) -> Result<VideoOutput, GenerationError> {
        let source = image.to_path_buf();
        let (lighting, contrast) = (settings.enhance_lighting, settings.adjust_contrast);
        let png = tokio::task::spawn_blocking(move || {
            prepare_video_input(&source, lighting, contrast)
        })
        .await
        .map_err(|e| request_failed(self.name(), e))??;

        let part = Part::bytes(png)
            .file_name("input.png")
            .mime_str("image/png")
            .map_err(|e| request_failed(self.name(), e))?;
        let form = Form::new()
            .part("image", part)
            .text("motion_bucket_id", settings.motion_bucket_id.to_string())
            .text("num_frames", settings.num_frames.to_string())
            .text("fps", settings.fps.to_string())
            .text("num_inference_steps", settings.num_inference_steps.to_string())
            .text("decode_chunk_size", settings.decode_chunk_size.to_string())
            .text("seed", settings.seed.to_string());

        let bytes = fetch_bytes(self.name(), self.client.post(&self.url).multipart(form)).await?;
        tokio::fs::write(output, &bytes).await?;

        Ok(VideoOutput {
            frames: settings.num_frames,
            fps: settings.fps,
            duration: settings.duration(),
            file_size_mb: file_size_mb(output).await,
        })
    }
}

// ── Speech ──────────────────────────────────────────────────────────────

/// Text-to-speech service: JSON `{text, language}`, wav bytes back.
pub struct RemoteSpeechPipeline {
    client: reqwest::Client,
    url: String,
}

impl RemoteSpeechPipeline {
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        info!(url = %url, "Using remote speech backend");
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait]
impl SpeechPipeline for RemoteSpeechPipeline {
    fn name(&self) -> &str {
        "remote-speech"
    }

    async fn synthesize(
        &self,
        text: &str,
        language: &str,
        output: &Path,
    ) -> Result<(), GenerationError> {
        let body = serde_json::json!({ "text": text, "language": language });
        let bytes = fetch_bytes(self.name(), self.client.post(&self.url).json(&body)).await?;
        tokio::fs::write(output, &bytes).await?;
        Ok(())
    }
}
