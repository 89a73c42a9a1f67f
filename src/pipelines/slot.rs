//! Lazily-constructed, access-serialised backend handle.
//!
//! A slot builds its backend once, on first use (or at startup when models
//! are preloaded). A failed construction is not cached, so the next job
//! retries it. Calls through [`ModelSlot::run`] hold the slot's mutex for
//! the whole inference call: concurrent jobs queue up instead of sharing the
//! backend at the same time.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};
use tracing::info;

use crate::error::GenerationError;

type Loader<P> = Box<dyn Fn() -> Result<Arc<P>, GenerationError> + Send + Sync>;

pub struct ModelSlot<P: ?Sized> {
    name: &'static str,
    loader: Loader<P>,
    model: OnceCell<Arc<P>>,
    busy: Mutex<()>,
}

impl<P: ?Sized + Send + Sync> ModelSlot<P> {
    /// A slot that constructs its backend with `loader` on first use.
    pub fn new<F>(name: &'static str, loader: F) -> Self
    where
        F: Fn() -> Result<Arc<P>, GenerationError> + Send + Sync + 'static,
    {
        Self {
            name,
            loader: Box::new(loader),
            model: OnceCell::new(),
            busy: Mutex::new(()),
        }
    }

    /// A slot around an already-constructed backend.
    pub fn ready(name: &'static str, model: Arc<P>) -> Self
    where
        P: 'static,
    {
        Self {
            name,
            loader: Box::new(move || Ok(Arc::clone(&model))),
            model: OnceCell::new(),
            busy: Mutex::new(()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the backend has been constructed.
    pub fn is_loaded(&self) -> bool {
        self.model.initialized()
    }

    /// Construct the backend if needed and return it.
    pub async fn load(&self) -> Result<Arc<P>, GenerationError> {
        self.model
            .get_or_try_init(|| async {
                info!(backend = self.name, "Loading backend");
                (self.loader)()
            })
            .await
            .cloned()
    }

    /// Run `f` against the backend with exclusive access.
    pub async fn run<F, Fut, T>(&self, f: F) -> Result<T, GenerationError>
    where
        F: FnOnce(Arc<P>) -> Fut,
        Fut: Future<Output = Result<T, GenerationError>>,
    {
        let model = self.load().await?;
        let _busy = self.busy.lock().await;
        f(model).await
    }
}
