//! Generation backends.
//!
//! The crate never runs models itself: every pipeline is an external
//! inference service reached over HTTP, or the placeholder image renderer.
//!
//! - `settings`: room/motion tables and prompt enhancement
//! - `preprocess`: source-image lighting/contrast/resize before video generation
//! - `remote`: HTTP backends (Hugging Face image, video service, TTS service)
//! - `placeholder`: local image renderer used when no image API key is set
//! - `slot`: lazily-constructed, access-serialised model handle

pub mod placeholder;
pub mod preprocess;
pub mod remote;
pub mod settings;
pub mod slot;

pub use placeholder::PlaceholderImagePipeline;
pub use remote::{HfImagePipeline, RemoteSpeechPipeline, RemoteVideoPipeline};
pub use settings::{MotionStyle, RoomType, VideoSettings, enhance_prompt};
pub use slot::ModelSlot;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::error::GenerationError;

/// Parameters for one text-to-image call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRequest {
    pub prompt: String,
    pub num_inference_steps: u32,
    pub guidance_scale: f32,
    pub width: u32,
    pub height: u32,
}

impl ImageRequest {
    /// A 512×512, 20-step request for `prompt`.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            num_inference_steps: 20,
            guidance_scale: 7.5,
            width: 512,
            height: 512,
        }
    }
}

/// What an image backend produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageOutput {
    pub width: u32,
    pub height: u32,
    pub file_size_mb: f64,
}

/// What a video backend produced.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoOutput {
    pub frames: u32,
    pub fps: u32,
    /// Seconds.
    pub duration: f64,
    pub file_size_mb: f64,
}

/// Text-to-image backend.
#[async_trait]
pub trait ImagePipeline: Send + Sync {
    /// Backend name for logs and health output.
    fn name(&self) -> &str;

    /// Render `request` and write a PNG to `output`.
    async fn generate(
        &self,
        request: &ImageRequest,
        output: &Path,
    ) -> Result<ImageOutput, GenerationError>;
}

/// Image-to-video backend.
#[async_trait]
pub trait VideoPipeline: Send + Sync {
    fn name(&self) -> &str;

    /// Animate the image at `image` and write an mp4 to `output`.
    async fn generate(
        &self,
        image: &Path,
        settings: &VideoSettings,
        output: &Path,
    ) -> Result<VideoOutput, GenerationError>;
}

/// Text-to-speech backend.
#[async_trait]
pub trait SpeechPipeline: Send + Sync {
    fn name(&self) -> &str;

    /// Synthesise `text` and write a wav file to `output`.
    async fn synthesize(
        &self,
        text: &str,
        language: &str,
        output: &Path,
    ) -> Result<(), GenerationError>;
}

/// One slot per backend, shared by every job.
pub struct Pipelines {
    pub image: ModelSlot<dyn ImagePipeline>,
    pub video: ModelSlot<dyn VideoPipeline>,
    pub speech: ModelSlot<dyn SpeechPipeline>,
}

impl Pipelines {
    /// Build lazily-loading slots from configuration.
    pub fn from_config(config: &PipelineConfig) -> Self {
        let image_config = config.clone();
        let image = ModelSlot::new("image", move || {
            let pipeline: Arc<dyn ImagePipeline> = match &image_config.hf_api_key {
                Some(key) => Arc::new(HfImagePipeline::new(
                    image_config.image_api_url.clone(),
                    key.clone(),
                )),
                None => {
                    tracing::warn!("HF_API_KEY not set, using placeholder image generation");
                    Arc::new(PlaceholderImagePipeline)
                }
            };
            Ok(pipeline)
        });

        let video_url = config.video_api_url.clone();
        let video = ModelSlot::new("video", move || {
            let url = video_url.clone().ok_or_else(|| GenerationError::BackendUnavailable {
                backend: "video".to_string(),
            })?;
            let pipeline: Arc<dyn VideoPipeline> = Arc::new(RemoteVideoPipeline::new(url));
            Ok(pipeline)
        });

        let tts_url = config.tts_api_url.clone();
        let speech = ModelSlot::new("speech", move || {
            let url = tts_url.clone().ok_or_else(|| GenerationError::BackendUnavailable {
                backend: "speech".to_string(),
            })?;
            let pipeline: Arc<dyn SpeechPipeline> = Arc::new(RemoteSpeechPipeline::new(url));
            Ok(pipeline)
        });

        Self {
            image,
            video,
            speech,
        }
    }

    /// Use already-constructed backends (tests, embedding).
    pub fn with_backends(
        image: Arc<dyn ImagePipeline>,
        video: Arc<dyn VideoPipeline>,
        speech: Arc<dyn SpeechPipeline>,
    ) -> Self {
        Self {
            image: ModelSlot::ready("image", image),
            video: ModelSlot::ready("video", video),
            speech: ModelSlot::ready("speech", speech),
        }
    }

    /// Construct every backend now. Failures are logged; those slots will
    /// retry on first use and surface the error as a failed job.
    pub async fn preload(&self) {
        let (image, video, speech) =
            futures::join!(self.image.load(), self.video.load(), self.speech.load());
        for (name, result) in [
            ("image", image.err()),
            ("video", video.err()),
            ("speech", speech.err()),
        ] {
            if let Some(e) = result {
                tracing::warn!(backend = name, error = %e, "Could not preload backend");
            }
        }
    }
}
