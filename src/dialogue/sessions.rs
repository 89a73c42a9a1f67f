//! One dialogue tracker per chat session.
//!
//! Sessions are keyed by the client-supplied id, so the registry bounds
//! itself: sessions idle past the timeout are dropped by the expiry task,
//! and at capacity the least recently used session makes room.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{debug, info};

use super::catalog::Catalog;
use super::tracker::{DialogueTracker, Turn};

/// Session used when a request names none.
pub const DEFAULT_SESSION: &str = "default";

/// Default idle time after which a session is dropped.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Default maximum number of live sessions.
pub const DEFAULT_MAX_SESSIONS: usize = 1024;

/// Where new trackers get their catalog from.
enum CatalogSource {
    Dir(PathBuf),
    Fixed(Catalog),
}

struct Session {
    tracker: DialogueTracker,
    last_seen: Instant,
}

pub struct SessionRegistry {
    source: CatalogSource,
    sessions: Mutex<HashMap<String, Session>>,
    idle_timeout: Duration,
    max_sessions: usize,
}

impl SessionRegistry {
    /// Trackers load their catalog from `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self::from_source(CatalogSource::Dir(data_dir.into()))
    }

    /// Trackers share a fixed catalog.
    pub fn with_catalog(catalog: Catalog) -> Self {
        Self::from_source(CatalogSource::Fixed(catalog))
    }

    fn from_source(source: CatalogSource) -> Self {
        Self {
            source,
            sessions: Mutex::new(HashMap::new()),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// At least one session is always allowed.
    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.max_sessions = max_sessions.max(1);
        self
    }

    fn session_key(session_id: Option<&str>) -> String {
        session_id
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SESSION)
            .to_string()
    }

    fn new_tracker(&self) -> DialogueTracker {
        match &self.source {
            CatalogSource::Dir(dir) => DialogueTracker::load(dir),
            CatalogSource::Fixed(catalog) => DialogueTracker::new(catalog.clone()),
        }
    }

    /// Run `f` against the session's tracker, creating it on first use.
    pub async fn with_session<T>(
        &self,
        session_id: Option<&str>,
        f: impl FnOnce(&mut DialogueTracker) -> T,
    ) -> T {
        let key = Self::session_key(session_id);
        let mut sessions = self.sessions.lock().await;
        if !sessions.contains_key(&key) && sessions.len() >= self.max_sessions {
            evict_least_recent(&mut sessions);
        }
        let session = match sessions.entry(key) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => {
                info!(session = %e.key(), "New chat session");
                e.insert(Session {
                    tracker: self.new_tracker(),
                    last_seen: Instant::now(),
                })
            }
        };
        session.last_seen = Instant::now();
        f(&mut session.tracker)
    }

    pub async fn respond(&self, session_id: Option<&str>, message: &str) -> Turn {
        self.with_session(session_id, |t| t.respond(message)).await
    }

    /// Resolve a quick-action name to its message and respond to it.
    pub async fn quick_action(&self, session_id: Option<&str>, action: &str) -> Turn {
        self.with_session(session_id, |t| {
            let text = t.quick_action_text(action).to_string();
            t.respond(&text)
        })
        .await
    }

    pub async fn finish_image(
        &self,
        session_id: Option<&str>,
        description: &str,
        succeeded: bool,
    ) -> String {
        self.with_session(session_id, |t| t.finish_image(description, succeeded))
            .await
    }

    /// Reset a session's dialogue. Unknown sessions are left absent.
    pub async fn clear(&self, session_id: Option<&str>) {
        let key = Self::session_key(session_id);
        if let Some(session) = self.sessions.lock().await.get_mut(&key) {
            session.tracker.clear();
            session.last_seen = Instant::now();
        }
    }

    /// Drop sessions idle longer than the timeout. Returns how many were dropped.
    pub async fn expire_idle(&self) -> usize {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.last_seen.elapsed() <= self.idle_timeout);
        let expired = before - sessions.len();
        if expired > 0 {
            info!(expired, remaining = sessions.len(), "Expired idle chat sessions");
        }
        expired
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}

fn evict_least_recent(sessions: &mut HashMap<String, Session>) {
    let oldest = sessions
        .iter()
        .min_by_key(|(_, s)| s.last_seen)
        .map(|(key, _)| key.clone());
    if let Some(key) = oldest {
        debug!(session = %key, "Evicting least recently used chat session");
        sessions.remove(&key);
    }
}

/// Spawn a background task that periodically drops idle sessions.
pub fn spawn_expiry_task(
    registry: Arc<SessionRegistry>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            registry.expire_idle().await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::PendingAction;

    #[tokio::test]
    async fn sessions_are_isolated() {
        let registry = SessionRegistry::with_catalog(Catalog::builtin());
        registry.respond(Some("a"), "أضف كنبة").await;

        let pending_a = registry
            .with_session(Some("a"), |t| t.pending_action())
            .await;
        let pending_b = registry
            .with_session(Some("b"), |t| t.pending_action())
            .await;
        assert_eq!(pending_a, PendingAction::AwaitingColor);
        assert_eq!(pending_b, PendingAction::None);
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn missing_or_blank_id_uses_default_session() {
        let registry = SessionRegistry::with_catalog(Catalog::builtin());
        registry.respond(None, "أضف كرسي").await;
        let pending = registry
            .with_session(Some("  "), |t| t.pending_item().map(str::to_string))
            .await;
        assert_eq!(pending.as_deref(), Some("كرسي"));
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn clear_only_touches_one_session() {
        let registry = SessionRegistry::with_catalog(Catalog::builtin());
        registry.respond(Some("a"), "أضف كنبة").await;
        registry.respond(Some("b"), "أضف كنبة").await;
        registry.clear(Some("a")).await;

        let a = registry.with_session(Some("a"), |t| t.pending_action()).await;
        let b = registry.with_session(Some("b"), |t| t.pending_action()).await;
        assert_eq!(a, PendingAction::None);
        assert_eq!(b, PendingAction::AwaitingColor);
    }

    #[tokio::test]
    async fn clear_does_not_create_sessions() {
        let registry = SessionRegistry::with_catalog(Catalog::builtin());
        registry.clear(Some("never-seen")).await;
        registry.clear(None).await;
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn idle_sessions_expire() {
        let registry = SessionRegistry::with_catalog(Catalog::builtin())
            .with_idle_timeout(Duration::from_millis(20));
        registry.respond(Some("old"), "أضف كنبة").await;
        tokio::time::sleep(Duration::from_millis(40)).await;
        registry.respond(Some("fresh"), "أضف كرسي").await;

        assert_eq!(registry.expire_idle().await, 1);
        assert_eq!(registry.len().await, 1);
        let pending = registry
            .with_session(Some("fresh"), |t| t.pending_action())
            .await;
        assert_eq!(pending, PendingAction::AwaitingColor);
    }

    #[tokio::test]
    async fn capacity_evicts_least_recently_used() {
        let registry =
            SessionRegistry::with_catalog(Catalog::builtin()).with_max_sessions(2);
        registry.respond(Some("a"), "أضف كنبة").await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        registry.respond(Some("b"), "أضف كنبة").await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        // Touching "a" makes "b" the oldest
        registry.respond(Some("a"), "شوف").await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        registry.respond(Some("c"), "أضف كرسي").await;

        assert_eq!(registry.len().await, 2);
        // "b" comes back as a fresh session
        let b = registry.with_session(Some("b"), |t| t.pending_action()).await;
        assert_eq!(b, PendingAction::None);
    }

    #[tokio::test]
    async fn expiry_task_drops_idle_sessions() {
        let registry = Arc::new(
            SessionRegistry::with_catalog(Catalog::builtin())
                .with_idle_timeout(Duration::from_millis(10)),
        );
        registry.respond(None, "مرحبا").await;
        let handle = spawn_expiry_task(Arc::clone(&registry), Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn quick_action_runs_mapped_text() {
        let registry = SessionRegistry::with_catalog(Catalog::builtin());
        let turn = registry.quick_action(None, "show_furniture").await;
        assert!(turn.response.starts_with("🪑 الأثاث المتاح:"));
    }

    #[tokio::test]
    async fn data_dir_catalog_is_loaded_per_session() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join(crate::dialogue::catalog::FURNITURE_FILE),
            r#"{"sofa": {"models": [{"name": "lounge", "available_colors": ["red"]}]}}"#,
        )
        .unwrap();
        let registry = SessionRegistry::new(tmp.path());
        let turn = registry.respond(None, "اضف sofa").await;
        assert!(turn.response.contains("sofa"));
    }
}
