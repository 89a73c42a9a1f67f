//! Generation jobs: records, store, output files and the worker.

pub mod files;
pub mod model;
pub mod store;
pub mod worker;

pub use files::{OutputDirs, spawn_cleanup_task};
pub use model::{JobEvent, JobKind, JobRecord, JobStatus, JobUpdate};
pub use store::JobStore;
pub use worker::{GenerationWorker, JobTask};
