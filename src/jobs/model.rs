//! Job data model: kinds, statuses, records, partial updates and events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a job generates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobKind {
    #[serde(rename = "image")]
    Image,
    #[serde(rename = "video")]
    Video,
    #[serde(rename = "image-to-video")]
    ImageToVideo,
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::ImageToVideo => "image-to-video",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for JobKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            "image-to-video" => Ok(Self::ImageToVideo),
            _ => Err(format!("Unknown job kind: {}", s)),
        }
    }
}

/// Lifecycle status of a job.
///
/// Progresses queued → processing → completed | failed. A queued job may
/// also fail directly (e.g. its backend could not be constructed).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Created, worker not started yet.
    #[default]
    Queued,
    /// Worker is running the pipeline.
    Processing,
    /// Output files are ready.
    Completed,
    /// The pipeline raised an error.
    Failed,
}

impl JobStatus {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, target),
            (Queued, Processing)
                | (Queued, Failed)
                | (Processing, Completed)
                | (Processing, Failed)
        )
    }

    /// Whether this status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// A tracked generation job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: Uuid,
    pub job_type: JobKind,
    pub status: JobStatus,
    /// 0–100.
    pub progress: u8,
    /// Human-readable status line (holds the error text on failure).
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Video length in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frames: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size_mb: Option<f64>,
}

impl JobRecord {
    /// Create a new queued job.
    pub fn new(kind: JobKind) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            job_type: kind,
            status: JobStatus::Queued,
            progress: 0,
            message: "Job queued".to_string(),
            image_url: None,
            video_url: None,
            created_at: Utc::now(),
            completed_at: None,
            duration: None,
            frames: None,
            file_size_mb: None,
        }
    }
}

/// Partial update merged into a [`JobRecord`]. `None` fields are left as-is.
#[derive(Debug, Clone, Default)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub progress: Option<u8>,
    pub message: Option<String>,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration: Option<f64>,
    pub frames: Option<u32>,
    pub file_size_mb: Option<f64>,
}

impl JobUpdate {
    /// Move to `processing` with a progress checkpoint.
    pub fn processing(progress: u8, message: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Processing),
            progress: Some(progress),
            message: Some(message.into()),
            ..Default::default()
        }
    }

    /// Progress checkpoint without a status change.
    pub fn progress(progress: u8, message: impl Into<String>) -> Self {
        Self {
            progress: Some(progress),
            message: Some(message.into()),
            ..Default::default()
        }
    }

    /// Terminal success.
    pub fn completed(message: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Completed),
            progress: Some(100),
            message: Some(message.into()),
            completed_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    /// Terminal failure; the error text lands in the message.
    pub fn failed(error: impl std::fmt::Display) -> Self {
        Self {
            status: Some(JobStatus::Failed),
            message: Some(format!("Error: {error}")),
            completed_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    pub fn with_video_url(mut self, url: impl Into<String>) -> Self {
        self.video_url = Some(url.into());
        self
    }

    pub fn with_video_stats(mut self, duration: f64, frames: u32) -> Self {
        self.duration = Some(duration);
        self.frames = Some(frames);
        self
    }

    pub fn with_file_size_mb(mut self, size: f64) -> Self {
        self.file_size_mb = Some(size);
        self
    }

    /// Merge into `record`. Progress is clamped to 100 and never decreases.
    pub(crate) fn apply(self, record: &mut JobRecord) {
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(progress) = self.progress {
            record.progress = record.progress.max(progress.min(100));
        }
        if let Some(message) = self.message {
            record.message = message;
        }
        if let Some(url) = self.image_url {
            record.image_url = Some(url);
        }
        if let Some(url) = self.video_url {
            record.video_url = Some(url);
        }
        if let Some(at) = self.completed_at {
            record.completed_at = Some(at);
        }
        if let Some(duration) = self.duration {
            record.duration = Some(duration);
        }
        if let Some(frames) = self.frames {
            record.frames = Some(frames);
        }
        if let Some(size) = self.file_size_mb {
            record.file_size_mb = Some(size);
        }
    }
}

/// Job events broadcast to WebSocket subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobEvent {
    /// Full snapshot, sent when a client connects or lags behind.
    JobsSync { jobs: Vec<JobRecord> },
    JobCreated { job: JobRecord },
    JobUpdated { job: JobRecord },
    JobDeleted { job_id: Uuid },
}
