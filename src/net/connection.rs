//! Session identity and live-session tracking.
//!
//! Every accepted client gets a `sess-N` id that tags its span and log
//! lines. The tracker counts sessions whose task is still running and keeps
//! the active-sessions gauge in step.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::observability::metrics;

static NEXT_SESSION: AtomicU64 = AtomicU64::new(1);

/// Identifier of one client session, shown as `sess-N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    /// Take the next id from the process-wide sequence.
    pub fn allocate() -> Self {
        Self(NEXT_SESSION.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sess-{}", self.0)
    }
}

/// Counts sessions that are still running.
#[derive(Debug, Clone, Default)]
pub struct SessionTracker {
    active_count: Arc<AtomicU64>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a new session and hand out its id. The count drops with the guard.
    pub fn track(&self) -> SessionGuard {
        self.active_count.fetch_add(1, Ordering::SeqCst);
        metrics::session_started();
        SessionGuard {
            active_count: Arc::clone(&self.active_count),
            id: SessionId::allocate(),
        }
    }

    /// Sessions whose guard is still alive.
    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }
}

/// Held by the task running a session; released on drop, panics included.
#[derive(Debug)]
pub struct SessionGuard {
    active_count: Arc<AtomicU64>,
    id: SessionId,
}

impl SessionGuard {
    pub fn id(&self) -> SessionId {
        self.id
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.active_count.fetch_sub(1, Ordering::SeqCst);
        metrics::session_finished();
        tracing::trace!(session_id = %self.id, "Session released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocated_ids_differ() {
        let id1 = SessionId::allocate();
        let id2 = SessionId::allocate();
        assert_ne!(id1, id2);
        assert!(id1.to_string().starts_with("sess-"));
    }

    #[test]
    fn guard_drop_releases_count() {
        let tracker = SessionTracker::new();
        assert_eq!(tracker.active_count(), 0);

        let guard1 = tracker.track();
        assert_eq!(tracker.active_count(), 1);

        let guard2 = tracker.track();
        assert_eq!(tracker.active_count(), 2);
        assert_ne!(guard1.id(), guard2.id());

        drop(guard1);
        assert_eq!(tracker.active_count(), 1);

        drop(guard2);
        assert_eq!(tracker.active_count(), 0);
    }

    #[tokio::test]
    async fn panicking_task_still_releases_count() {
        let tracker = SessionTracker::new();
        let guard = tracker.track();

        let task = tokio::spawn(async move {
            let _guard = guard;
            panic!("session task failed");
        });
        assert!(task.await.unwrap_err().is_panic());
        assert_eq!(tracker.active_count(), 0);
    }
}
