//! Generation worker: drives one job through its lifecycle.
//!
//! queued → processing → completed | failed. The worker never propagates a
//! pipeline error: it becomes the job's `failed` status with the error text
//! in the message. No retries, no timeout; the first failure is final.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use super::model::{JobRecord, JobUpdate};
use super::store::JobStore;
use crate::error::{GenerationError, JobError};
use crate::pipelines::{ImageRequest, Pipelines, VideoSettings};

/// What to generate for a job.
#[derive(Debug, Clone)]
pub enum JobTask {
    /// Text → image.
    Image { request: ImageRequest },
    /// Uploaded image → video.
    Video {
        source: PathBuf,
        settings: VideoSettings,
    },
    /// Text → image → video.
    ImageToVideo {
        request: ImageRequest,
        settings: VideoSettings,
    },
}

#[derive(Debug, thiserror::Error)]
enum StepError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Job(#[from] JobError),
}

pub fn image_download_url(id: Uuid) -> String {
    format!("/api/v1/download/image/{id}")
}

pub fn stage_image_download_url(id: Uuid) -> String {
    format!("/api/v1/download/image/{id}_image")
}

pub fn video_download_url(id: Uuid) -> String {
    format!("/api/v1/download/video/{id}")
}

/// Runs generation tasks against the shared pipelines and reports into the store.
#[derive(Clone)]
pub struct GenerationWorker {
    store: Arc<JobStore>,
    pipelines: Arc<Pipelines>,
}

impl GenerationWorker {
    pub fn new(store: Arc<JobStore>, pipelines: Arc<Pipelines>) -> Self {
        Self { store, pipelines }
    }

    pub fn pipelines(&self) -> &Pipelines {
        &self.pipelines
    }

    /// Run the task on its own tokio task (fire-and-forget).
    pub fn spawn(&self, id: Uuid, task: JobTask) -> tokio::task::JoinHandle<Option<JobRecord>> {
        let worker = self.clone();
        tokio::spawn(async move { worker.run(id, task).await })
    }

    /// Run the task to completion. Returns the final record, or `None` if the
    /// job disappeared (deleted) while running.
    pub async fn run(&self, id: Uuid, task: JobTask) -> Option<JobRecord> {
        let outcome = match task {
            JobTask::Image { request } => self.run_image(id, request).await,
            JobTask::Video { source, settings } => self.run_video(id, source, settings).await,
            JobTask::ImageToVideo { request, settings } => {
                self.run_image_to_video(id, request, settings).await
            }
        };

        let update = match outcome {
            Ok(update) => update,
            Err(StepError::Generation(e)) => {
                warn!(job_id = %id, error = %e, "Generation failed");
                JobUpdate::failed(e)
            }
            Err(StepError::Job(e)) => {
                warn!(job_id = %id, error = %e, "Job vanished while running");
                self.discard_output(id, &e).await;
                return None;
            }
        };

        match self.store.update(id, update).await {
            Ok(record) => {
                info!(job_id = %id, status = %record.status, "Job finished");
                Some(record)
            }
            Err(e) => {
                warn!(job_id = %id, error = %e, "Could not record job result");
                self.discard_output(id, &e).await;
                None
            }
        }
    }

    /// A job deleted mid-run may still have had output written after the
    /// delete swept its files. Remove that output.
    async fn discard_output(&self, id: Uuid, error: &JobError) {
        if !matches!(error, JobError::NotFound { .. }) {
            return;
        }
        match self.store.dirs().remove_job_files(id).await {
            Ok(0) => {}
            Ok(removed) => {
                info!(job_id = %id, files_removed = removed, "Removed output of deleted job")
            }
            Err(e) => warn!(job_id = %id, error = %e, "Failed to remove output of deleted job"),
        }
    }

    async fn run_image(&self, id: Uuid, request: ImageRequest) -> Result<JobUpdate, StepError> {
        self.store
            .update(id, JobUpdate::processing(20, "Generating image..."))
            .await?;

        let path = self.store.dirs().image_path(id);
        let output = self
            .pipelines
            .image
            .run(|p| async move { p.generate(&request, &path).await })
            .await?;

        Ok(JobUpdate::completed("Image generated successfully!")
            .with_image_url(image_download_url(id))
            .with_file_size_mb(output.file_size_mb))
    }

    async fn run_video(
        &self,
        id: Uuid,
        source: PathBuf,
        settings: VideoSettings,
    ) -> Result<JobUpdate, StepError> {
        self.store
            .update(id, JobUpdate::processing(20, "Generating video..."))
            .await?;

        let path = self.store.dirs().video_path(id);
        let output = self
            .pipelines
            .video
            .run(|p| async move { p.generate(&source, &settings, &path).await })
            .await?;

        Ok(JobUpdate::completed("Video generated successfully!")
            .with_video_url(video_download_url(id))
            .with_video_stats(output.duration, output.frames)
            .with_file_size_mb(output.file_size_mb))
    }

    async fn run_image_to_video(
        &self,
        id: Uuid,
        request: ImageRequest,
        settings: VideoSettings,
    ) -> Result<JobUpdate, StepError> {
        self.store
            .update(id, JobUpdate::processing(10, "Step 1/2: Generating image..."))
            .await?;

        let image_path = self.store.dirs().stage_image_path(id);
        let stage = image_path.clone();
        self.pipelines
            .image
            .run(|p| async move { p.generate(&request, &stage).await })
            .await?;

        self.store
            .update(
                id,
                JobUpdate::progress(50, "Step 2/2: Generating video...")
                    .with_image_url(stage_image_download_url(id)),
            )
            .await?;

        let video_path = self.store.dirs().video_path(id);
        let output = self
            .pipelines
            .video
            .run(|p| async move { p.generate(&image_path, &settings, &video_path).await })
            .await?;

        Ok(JobUpdate::completed("Image and video generated successfully!")
            .with_video_url(video_download_url(id))
            .with_video_stats(output.duration, output.frames)
            .with_file_size_mb(output.file_size_mb))
    }
}
