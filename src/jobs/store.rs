//! Job store: in-memory job records with broadcast to WebSocket clients.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::files::OutputDirs;
use super::model::{JobEvent, JobKind, JobRecord, JobUpdate};
use crate::error::JobError;

/// Default broadcast channel capacity.
const DEFAULT_BROADCAST_CAPACITY: usize = 256;

/// Process-owned job table. Lives as long as the process; nothing is persisted.
pub struct JobStore {
    jobs: RwLock<HashMap<Uuid, JobRecord>>,
    dirs: OutputDirs,
    tx: broadcast::Sender<JobEvent>,
}

impl JobStore {
    /// Create a new store whose `delete` cleans up files in `dirs`.
    pub fn new(dirs: OutputDirs) -> Arc<Self> {
        let (tx, _rx) = broadcast::channel(DEFAULT_BROADCAST_CAPACITY);
        Arc::new(Self {
            jobs: RwLock::new(HashMap::new()),
            dirs,
            tx,
        })
    }

    /// Directories the store's jobs write to.
    pub fn dirs(&self) -> &OutputDirs {
        &self.dirs
    }

    /// Subscribe to job events. Each WS client calls this.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.tx.subscribe()
    }

    /// Create a queued job and return its id.
    pub async fn create(&self, kind: JobKind) -> Uuid {
        let record = JobRecord::new(kind);
        let id = record.job_id;
        info!(job_id = %id, kind = %kind, "Job queued");

        let event = JobEvent::JobCreated {
            job: record.clone(),
        };
        self.jobs.write().await.insert(id, record);

        // Ok if no receivers are listening
        let _ = self.tx.send(event);
        id
    }

    /// Merge `update` into the job. Status changes must be legal transitions;
    /// terminal jobs accept no further writes.
    pub async fn update(&self, id: Uuid, update: JobUpdate) -> Result<JobRecord, JobError> {
        let mut jobs = self.jobs.write().await;
        let record = jobs.get_mut(&id).ok_or(JobError::NotFound { id })?;

        let target = update.status.unwrap_or(record.status);
        let legal = if target == record.status {
            !record.status.is_terminal()
        } else {
            record.status.can_transition_to(target)
        };
        if !legal {
            warn!(job_id = %id, state = %record.status, target = %target, "Rejected job transition");
            return Err(JobError::InvalidTransition {
                id,
                state: record.status,
                target,
            });
        }

        update.apply(record);
        let updated = record.clone();
        debug!(job_id = %id, status = %updated.status, progress = updated.progress, "Job updated");

        let _ = self.tx.send(JobEvent::JobUpdated {
            job: updated.clone(),
        });
        Ok(updated)
    }

    /// Get a job by id.
    pub async fn get(&self, id: Uuid) -> Option<JobRecord> {
        self.jobs.read().await.get(&id).cloned()
    }

    /// All jobs, oldest first.
    pub async fn list(&self) -> Vec<JobRecord> {
        let mut jobs: Vec<JobRecord> = self.jobs.read().await.values().cloned().collect();
        jobs.sort_by_key(|j| j.created_at);
        jobs
    }

    /// Number of tracked jobs.
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    /// Remove every id-prefixed file in the output directories, then the job.
    /// Returns the number of files removed. If a file cannot be removed the
    /// job is kept so the delete can be retried.
    pub async fn delete(&self, id: Uuid) -> Result<usize, JobError> {
        // Held across the sweep so a worker cannot record a result in between
        let mut jobs = self.jobs.write().await;
        if !jobs.contains_key(&id) {
            return Err(JobError::NotFound { id });
        }
        let removed = self.dirs.remove_job_files(id).await?;
        jobs.remove(&id);
        drop(jobs);
        info!(job_id = %id, files_removed = removed, "Job deleted");

        let _ = self.tx.send(JobEvent::JobDeleted { job_id: id });
        Ok(removed)
    }
}
