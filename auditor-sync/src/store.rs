//! Job state store
//!
//! Holds what one view currently shows. Every update replaces the whole
//! state, so a reader never sees a job status from one response paired with
//! findings from another.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

/// What a view can display
#[derive(Debug, Clone, PartialEq)]
pub enum ViewState<T> {
    /// Nothing accepted yet
    NotLoaded,
    /// Latest accepted snapshot
    Ready(T),
    /// The subject no longer exists (or is not visible to this user)
    NotFound(String),
    /// The subject could not be loaded
    Unavailable(String),
}

impl<T> ViewState<T> {
    pub fn snapshot(&self) -> Option<&T> {
        match self {
            ViewState::Ready(snapshot) => Some(snapshot),
            _ => None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        !matches!(self, ViewState::NotLoaded)
    }
}

struct StoreInner<T> {
    tx: watch::Sender<ViewState<T>>,
    revision: AtomicU64,
}

/// Latest accepted state of one view
///
/// Cheap to clone; clones share the same state.
pub struct JobStateStore<T> {
    inner: Arc<StoreInner<T>>,
}

impl<T> Clone for JobStateStore<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone> Default for JobStateStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> JobStateStore<T> {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ViewState::NotLoaded);
        Self {
            inner: Arc::new(StoreInner {
                tx,
                revision: AtomicU64::new(0),
            }),
        }
    }

    /// Replaces the held state with a new snapshot
    pub fn apply(&self, snapshot: T) {
        self.replace(ViewState::Ready(snapshot));
    }

    pub fn mark_not_found(&self, message: impl Into<String>) {
        self.replace(ViewState::NotFound(message.into()));
    }

    pub fn mark_unavailable(&self, message: impl Into<String>) {
        self.replace(ViewState::Unavailable(message.into()));
    }

    /// Back to `NotLoaded`, used when a view switches subject
    pub fn reset(&self) {
        self.replace(ViewState::NotLoaded);
    }

    fn replace(&self, state: ViewState<T>) {
        self.inner.tx.send_replace(state);
        self.inner.revision.fetch_add(1, Ordering::SeqCst);
    }

    /// Last accepted state, or `NotLoaded`
    pub fn current(&self) -> ViewState<T> {
        self.inner.tx.borrow().clone()
    }

    /// Number of updates applied so far
    pub fn revision(&self) -> u64 {
        self.inner.revision.load(Ordering::SeqCst)
    }

    /// Receiver woken on every update
    pub fn subscribe(&self) -> watch::Receiver<ViewState<T>> {
        self.inner.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_not_loaded() {
        let store: JobStateStore<u32> = JobStateStore::new();
        assert_eq!(store.current(), ViewState::NotLoaded);
        assert_eq!(store.revision(), 0);
        assert!(store.current().snapshot().is_none());
    }

    #[test]
    fn test_apply_replaces_whole_state() {
        let store = JobStateStore::new();
        store.apply(("running", vec![1]));
        store.apply(("done", vec![1, 2, 3]));

        assert_eq!(store.current(), ViewState::Ready(("done", vec![1, 2, 3])));
        assert_eq!(store.revision(), 2);
    }

    #[test]
    fn test_clones_share_state() {
        let store = JobStateStore::new();
        let view = store.clone();
        store.mark_not_found("gone");

        assert_eq!(view.current(), ViewState::<u8>::NotFound("gone".to_string()));
        assert!(view.current().is_loaded());
        view.reset();
        assert_eq!(store.current(), ViewState::NotLoaded);
    }

    #[tokio::test]
    async fn test_subscribers_see_updates() {
        let store = JobStateStore::new();
        let mut rx = store.subscribe();

        store.apply(7u32);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), ViewState::Ready(7));
    }
}
