//! Output directories and id-prefixed file naming.
//!
//! Layout:
//! - `uploads/{id}.{ext}`: source images for video jobs
//! - `generated_images/{id}.png`: image jobs
//! - `generated_images/{id}_image.png`: first stage of image-to-video jobs
//! - `outputs/{id}.mp4`: video and image-to-video jobs

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::error::ConfigError;

/// The fixed set of directories generation output is written to.
#[derive(Debug, Clone)]
pub struct OutputDirs {
    pub uploads: PathBuf,
    pub outputs: PathBuf,
    pub images: PathBuf,
}

impl OutputDirs {
    pub fn new(uploads: PathBuf, outputs: PathBuf, images: PathBuf) -> Self {
        Self {
            uploads,
            outputs,
            images,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(
            config.upload_dir.clone(),
            config.output_dir.clone(),
            config.images_dir.clone(),
        )
    }

    /// All rooted under `base` (used by tests).
    pub fn under(base: &Path) -> Self {
        Self::new(
            base.join("uploads"),
            base.join("outputs"),
            base.join("generated_images"),
        )
    }

    /// Create every directory.
    pub async fn ensure(&self) -> Result<(), ConfigError> {
        for dir in self.all() {
            fs::create_dir_all(dir)
                .await
                .map_err(|source| ConfigError::Directory {
                    path: dir.to_path_buf(),
                    source,
                })?;
        }
        Ok(())
    }

    fn all(&self) -> [&Path; 3] {
        [&self.uploads, &self.outputs, &self.images]
    }

    pub fn upload_path(&self, id: Uuid, ext: &str) -> PathBuf {
        self.uploads.join(format!("{id}.{ext}"))
    }

    pub fn image_path(&self, id: Uuid) -> PathBuf {
        self.images.join(format!("{id}.png"))
    }

    /// Intermediate image of a two-stage image-to-video job.
    pub fn stage_image_path(&self, id: Uuid) -> PathBuf {
        self.images.join(format!("{id}_image.png"))
    }

    pub fn video_path(&self, id: Uuid) -> PathBuf {
        self.outputs.join(format!("{id}.mp4"))
    }

    /// Remove every file whose name starts with `id` in any output directory.
    /// Returns how many files were removed.
    pub async fn remove_job_files(&self, id: Uuid) -> std::io::Result<usize> {
        let prefix = id.to_string();
        let mut removed = 0;
        for dir in self.all() {
            let mut entries = match fs::read_dir(dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e),
            };
            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name();
                if name.to_string_lossy().starts_with(&prefix) {
                    fs::remove_file(entry.path()).await?;
                    debug!(path = %entry.path().display(), "Removed job file");
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }

    /// Remove files older than `max_age` from the uploads and outputs
    /// directories. Returns how many files were removed.
    pub async fn cleanup_older_than(&self, max_age: Duration) -> usize {
        let now = SystemTime::now();
        let mut removed = 0;
        for dir in [&self.uploads, &self.outputs] {
            let Ok(mut entries) = fs::read_dir(dir).await else {
                continue;
            };
            while let Ok(Some(entry)) = entries.next_entry().await {
                let Ok(meta) = entry.metadata().await else {
                    continue;
                };
                if !meta.is_file() {
                    continue;
                }
                let age = meta
                    .modified()
                    .ok()
                    .and_then(|m| now.duration_since(m).ok())
                    .unwrap_or_default();
                if age > max_age {
                    match fs::remove_file(entry.path()).await {
                        Ok(()) => removed += 1,
                        Err(e) => {
                            warn!(path = %entry.path().display(), error = %e, "Failed to remove old file")
                        }
                    }
                }
            }
        }
        removed
    }
}

/// Size of a file in MiB, 0.0 if it cannot be read.
pub async fn file_size_mb(path: &Path) -> f64 {
    fs::metadata(path)
        .await
        .map(|m| m.len() as f64 / (1024.0 * 1024.0))
        .unwrap_or(0.0)
}

/// Spawn a background task that periodically removes stale output files.
pub fn spawn_cleanup_task(
    dirs: OutputDirs,
    interval: Duration,
    max_age: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let removed = dirs.cleanup_older_than(max_age).await;
            if removed > 0 {
                info!(removed, "Cleaned up old output files");
            }
        }
    })
}
