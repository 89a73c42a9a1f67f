//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

/// Default Hugging Face inference endpoint for text-to-image.
pub const DEFAULT_IMAGE_API_URL: &str =
    "https://api-inference.huggingface.co/models/CompVis/stable-diffusion-v1-4";

/// Upload extensions accepted by the video endpoint.
pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port the HTTP server binds on.
    pub port: u16,
    /// Directory holding the chatbot data tables.
    pub data_dir: PathBuf,
    /// Uploaded source images.
    pub upload_dir: PathBuf,
    /// Generated videos.
    pub output_dir: PathBuf,
    /// Generated images.
    pub images_dir: PathBuf,
    /// Synthesised speech.
    pub tts_dir: PathBuf,
    /// Maximum accepted upload size in bytes.
    pub max_upload_bytes: usize,
    /// Output files older than this are removed by the cleanup task.
    pub cleanup_max_age: Duration,
    /// How often the cleanup task runs.
    pub cleanup_interval: Duration,
    /// Chat sessions idle longer than this are dropped.
    pub session_idle_timeout: Duration,
    /// Load every model backend at startup instead of on first use.
    pub preload_models: bool,
    /// Comma-separated CORS origins (None = allow any).
    pub cors_allowed_origins: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            data_dir: PathBuf::from("data"),
            upload_dir: PathBuf::from("uploads"),
            output_dir: PathBuf::from("outputs"),
            images_dir: PathBuf::from("generated_images"),
            tts_dir: PathBuf::from("tts_output"),
            max_upload_bytes: 10 * 1024 * 1024,
            cleanup_max_age: Duration::from_secs(3600), // 1 hour
            cleanup_interval: Duration::from_secs(600),
            session_idle_timeout: Duration::from_secs(30 * 60),
            preload_models: false,
            cors_allowed_origins: None,
        }
    }
}

impl ServerConfig {
    /// Build from `DECOR_ASSIST_*` environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let max_upload_mb: usize = env_parse("DECOR_ASSIST_MAX_UPLOAD_MB").unwrap_or(10);

        Self {
            port: env_parse("DECOR_ASSIST_PORT").unwrap_or(defaults.port),
            data_dir: env_path("DECOR_ASSIST_DATA_DIR").unwrap_or(defaults.data_dir),
            upload_dir: env_path("DECOR_ASSIST_UPLOAD_DIR").unwrap_or(defaults.upload_dir),
            output_dir: env_path("DECOR_ASSIST_OUTPUT_DIR").unwrap_or(defaults.output_dir),
            images_dir: env_path("DECOR_ASSIST_IMAGES_DIR").unwrap_or(defaults.images_dir),
            tts_dir: env_path("DECOR_ASSIST_TTS_DIR").unwrap_or(defaults.tts_dir),
            max_upload_bytes: mb_to_bytes(max_upload_mb),
            cleanup_max_age: env_parse("DECOR_ASSIST_CLEANUP_MAX_AGE_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.cleanup_max_age),
            cleanup_interval: env_parse("DECOR_ASSIST_CLEANUP_INTERVAL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.cleanup_interval),
            session_idle_timeout: env_parse("DECOR_ASSIST_SESSION_IDLE_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.session_idle_timeout),
            preload_models: std::env::var("DECOR_ASSIST_PRELOAD_MODELS")
                .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            cors_allowed_origins: std::env::var("DECOR_ASSIST_CORS_ORIGINS")
                .ok()
                .filter(|s| !s.trim().is_empty()),
        }
    }
}

/// Where the external generation backends live.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Hugging Face API key. Without it image generation uses the placeholder renderer.
    pub hf_api_key: Option<SecretString>,
    /// Text-to-image inference endpoint.
    pub image_api_url: String,
    /// Image-to-video endpoint (multipart upload, returns mp4 bytes).
    pub video_api_url: Option<String>,
    /// Text-to-speech endpoint (JSON body, returns wav bytes).
    pub tts_api_url: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            hf_api_key: None,
            image_api_url: DEFAULT_IMAGE_API_URL.to_string(),
            video_api_url: None,
            tts_api_url: None,
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        Self {
            hf_api_key: std::env::var("HF_API_KEY")
                .ok()
                .filter(|k| !k.is_empty())
                .map(SecretString::from),
            image_api_url: std::env::var("DECOR_ASSIST_IMAGE_API_URL")
                .unwrap_or_else(|_| DEFAULT_IMAGE_API_URL.to_string()),
            video_api_url: std::env::var("DECOR_ASSIST_VIDEO_API_URL").ok(),
            tts_api_url: std::env::var("DECOR_ASSIST_TTS_API_URL").ok(),
        }
    }
}

/// Megabytes to bytes, saturating instead of overflowing.
fn mb_to_bytes(mb: usize) -> usize {
    mb.saturating_mul(1024 * 1024)
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var(key).ok().filter(|s| !s.is_empty()).map(PathBuf::from)
}
