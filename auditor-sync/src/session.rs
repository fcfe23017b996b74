//! Session guard
//!
//! The only component allowed to change the session token. Everyone else
//! reads it (the HTTP client) or reports authentication failures upward (the
//! pollers). An invalidation episode produces exactly one effect sequence:
//! token cleared, subscribers notified once, one redirect to login. Further
//! reports are ignored until the next successful login.

use auditor_client::TokenProvider;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::lock;

/// Persistent storage for the bearer token
pub trait TokenStore: Send + Sync {
    /// Returns the stored token, if any
    fn load(&self) -> Option<String>;

    /// Persists a freshly issued token
    fn save(&self, token: &str);

    /// Removes the stored token
    fn clear(&self);
}

/// Token store that lives only as long as the process
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<String> {
        lock(&self.token).clone()
    }

    fn save(&self, token: &str) {
        *lock(&self.token) = Some(token.to_string());
    }

    fn clear(&self) {
        *lock(&self.token) = None;
    }
}

/// Sends the user to the login entry point
pub trait LoginNavigator: Send + Sync {
    fn redirect_to_login(&self);
}

/// Identifies one registered invalidation handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Arc<dyn Fn() + Send + Sync>;

struct SessionState {
    token: Option<String>,
    /// One-shot flag; set by the first invalidation, cleared by login
    invalidated: bool,
}

struct SessionInner {
    tokens: Box<dyn TokenStore>,
    navigator: Box<dyn LoginNavigator>,
    state: Mutex<SessionState>,
    subscribers: Mutex<Vec<(SubscriptionId, Handler)>>,
    next_id: AtomicU64,
}

/// Process-wide authority over the session token
///
/// Cheap to clone; all clones share the same session.
#[derive(Clone)]
pub struct SessionGuard {
    inner: Arc<SessionInner>,
}

impl SessionGuard {
    /// Creates a guard, restoring any token already in `tokens`
    pub fn new(tokens: Box<dyn TokenStore>, navigator: Box<dyn LoginNavigator>) -> Self {
        let token = tokens.load();
        Self {
            inner: Arc::new(SessionInner {
                tokens,
                navigator,
                state: Mutex::new(SessionState {
                    token,
                    invalidated: false,
                }),
                subscribers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Current bearer token, `None` when logged out or invalidated
    pub fn token(&self) -> Option<String> {
        lock(&self.inner.state).token.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// Stores a freshly issued token and re-arms invalidation
    pub fn login(&self, token: impl Into<String>) {
        let token = token.into();
        let mut state = lock(&self.inner.state);
        self.inner.tokens.save(&token);
        state.token = Some(token);
        state.invalidated = false;
        info!("Session established");
    }

    /// Ends the session at the user's request
    ///
    /// Has the same effects as an invalidation. Returns `false` when the
    /// session was already invalidated.
    pub fn logout(&self) -> bool {
        self.invalidate("logout")
    }

    /// Reports that a request was rejected for missing or bad credentials
    ///
    /// Safe to call from any number of concurrent callers. Only the first
    /// report of an episode clears the token, notifies subscribers and
    /// redirects; it returns `true`, every other call returns `false`.
    pub fn report_auth_failure(&self) -> bool {
        self.invalidate("authentication failure")
    }

    fn invalidate(&self, reason: &str) -> bool {
        {
            let mut state = lock(&self.inner.state);
            if state.invalidated {
                debug!("Session already invalidated, ignoring {}", reason);
                return false;
            }
            state.invalidated = true;
            state.token = None;
            self.inner.tokens.clear();
        }

        // Handlers run without any session lock held: they are free to
        // unsubscribe or read the token.
        let handlers: Vec<Handler> = lock(&self.inner.subscribers)
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();

        warn!(
            "Session invalidated ({}), notifying {} subscriber(s)",
            reason,
            handlers.len()
        );

        for handler in handlers {
            handler();
        }

        self.inner.navigator.redirect_to_login();
        true
    }

    /// Registers a handler run once per invalidation
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.inner.subscribers).push((id, Arc::new(handler)));
        debug!("Session subscriber {:?} registered", id);
        id
    }

    /// Removes a handler; returns `false` if it was not registered
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = lock(&self.inner.subscribers);
        let before = subscribers.len();
        subscribers.retain(|(sub_id, _)| *sub_id != id);
        before != subscribers.len()
    }

    /// Number of registered handlers
    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner.subscribers).len()
    }
}

impl TokenProvider for SessionGuard {
    fn token(&self) -> Option<String> {
        SessionGuard::token(self)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    /// Navigator counting redirects
    #[derive(Clone, Default)]
    pub struct CountingNavigator {
        pub redirects: Arc<AtomicUsize>,
    }

    impl LoginNavigator for CountingNavigator {
        fn redirect_to_login(&self) {
            self.redirects.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Token store counting clears
    #[derive(Clone, Default)]
    pub struct CountingStore {
        pub token: Arc<Mutex<Option<String>>>,
        pub clears: Arc<AtomicUsize>,
    }

    impl TokenStore for CountingStore {
        fn load(&self) -> Option<String> {
            lock(&self.token).clone()
        }

        fn save(&self, token: &str) {
            *lock(&self.token) = Some(token.to_string());
        }

        fn clear(&self) {
            self.clears.fetch_add(1, Ordering::SeqCst);
            *lock(&self.token) = None;
        }
    }

    pub fn guard_with_token(token: &str) -> (SessionGuard, CountingStore, CountingNavigator) {
        let store = CountingStore::default();
        store.save(token);
        let navigator = CountingNavigator::default();
        let guard = SessionGuard::new(Box::new(store.clone()), Box::new(navigator.clone()));
        (guard, store, navigator)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::guard_with_token;
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    #[test]
    fn test_restores_token_from_store() {
        let guard = SessionGuard::new(
            Box::new(MemoryTokenStore::with_token("t0")),
            Box::new(super::testing::CountingNavigator::default()),
        );
        assert_eq!(guard.token().as_deref(), Some("t0"));
        assert!(guard.is_authenticated());
    }

    #[test]
    fn test_single_effect_for_repeated_reports() {
        let (guard, store, navigator) = guard_with_token("t0");
        let notified = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&notified);
        guard.subscribe(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(guard.report_auth_failure());
        assert!(!guard.report_auth_failure());
        assert!(!guard.logout());

        assert_eq!(store.clears.load(Ordering::SeqCst), 1);
        assert_eq!(navigator.redirects.load(Ordering::SeqCst), 1);
        assert_eq!(notified.load(Ordering::SeqCst), 1);
        assert_eq!(guard.token(), None);
        assert_eq!(store.load(), None);
    }

    #[test]
    fn test_concurrent_reports_produce_one_effect() {
        let (guard, store, navigator) = guard_with_token("t0");

        let winners: usize = (0..10)
            .map(|_| {
                let guard = guard.clone();
                thread::spawn(move || guard.report_auth_failure())
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|h| h.join().unwrap() as usize)
            .sum();

        assert_eq!(winners, 1);
        assert_eq!(store.clears.load(Ordering::SeqCst), 1);
        assert_eq!(navigator.redirects.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_login_rearms_invalidation() {
        let (guard, store, navigator) = guard_with_token("t0");

        assert!(guard.report_auth_failure());
        guard.login("t1");
        assert_eq!(guard.token().as_deref(), Some("t1"));
        assert_eq!(store.load().as_deref(), Some("t1"));

        assert!(guard.report_auth_failure());
        assert_eq!(navigator.redirects.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unsubscribe_removes_handler() {
        let (guard, _store, _navigator) = guard_with_token("t0");
        let notified = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&notified);
        let id = guard.subscribe(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(guard.subscriber_count(), 1);
        assert!(guard.unsubscribe(id));
        assert!(!guard.unsubscribe(id));
        assert_eq!(guard.subscriber_count(), 0);

        guard.report_auth_failure();
        assert_eq!(notified.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_handler_may_unsubscribe_itself() {
        let (guard, _store, _navigator) = guard_with_token("t0");
        let slot: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));

        let inner_guard = guard.clone();
        let inner_slot = Arc::clone(&slot);
        let id = guard.subscribe(move || {
            if let Some(id) = lock(&inner_slot).take() {
                inner_guard.unsubscribe(id);
            }
        });
        *lock(&slot) = Some(id);

        guard.report_auth_failure();
        assert_eq!(guard.subscriber_count(), 0);
    }
}
