//! Polling scheduler
//!
//! Drives periodic re-fetching of one subject into a [`JobStateStore`] until
//! the subject reaches a terminal state, the view stops it, or the session is
//! invalidated.
//!
//! Each `start` creates a [`PollingHandle`]: one timer task, one request
//! sequence and one session subscription. A scheduler owns at most one
//! handle; starting again retires the previous one first.
//!
//! Ticks do not wait for earlier requests. When a slow response is overtaken
//! by a newer one it is discarded by the sequence guard.

use auditor_client::ClientError;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::lock;
use crate::sequence::{SequenceGuard, Ticket};
use crate::session::{SessionGuard, SubscriptionId};
use crate::store::JobStateStore;

/// Boxed future returned by a subject fetcher
pub type FetchFuture<T> = Pin<Box<dyn Future<Output = auditor_client::Result<T>> + Send>>;

type Fetcher<T> = Arc<dyn Fn() -> FetchFuture<T> + Send + Sync>;
type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Shortest tick period the timer runs with
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Timing and tolerance of one polling session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Period between ticks once the timer runs
    pub interval: Duration,
    /// Delay between the initial fetch and the first tick
    pub initial_delay: Duration,
    /// Upper bound for a single fetch; exceeding it counts as a network error
    pub fetch_timeout: Duration,
    /// Consecutive tick failures tolerated before giving up, `None` for no limit
    pub max_consecutive_failures: Option<u32>,
}

impl PollConfig {
    /// Ticks every `interval`, the first one `interval` after the initial fetch
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            initial_delay: interval,
            fetch_timeout: interval,
            max_consecutive_failures: None,
        }
    }

    /// Job detail view: first tick after 2 s, then every 5 s
    pub fn detail() -> Self {
        Self::new(Duration::from_millis(5_000))
            .with_initial_delay(Duration::from_millis(2_000))
            .with_fetch_timeout(Duration::from_millis(4_000))
    }

    /// Job list view: every 10 s after the initial fetch
    pub fn list() -> Self {
        Self::new(Duration::from_millis(10_000)).with_fetch_timeout(Duration::from_millis(8_000))
    }

    pub fn with_initial_delay(mut self, initial_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self
    }

    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    pub fn with_max_consecutive_failures(mut self, limit: u32) -> Self {
        self.max_consecutive_failures = Some(limit);
        self
    }

    /// Tick period actually used: `interval`, but never below [`MIN_INTERVAL`]
    pub fn period(&self) -> Duration {
        self.interval.max(MIN_INTERVAL)
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::detail()
    }
}

/// State shared by the timer task, in-flight ticks and the session handler
struct HandleInner {
    subject: String,
    sequence: SequenceGuard,
    cancel: CancellationToken,
    session: SessionGuard,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl HandleInner {
    fn new(subject: String, session: SessionGuard) -> Self {
        Self {
            subject,
            sequence: SequenceGuard::new(),
            cancel: CancellationToken::new(),
            session,
            subscription: Mutex::new(None),
        }
    }

    /// Records the session subscription of this handle
    ///
    /// A handle retired before the id was stored has nothing left to clear
    /// it, so the subscription is dropped right away.
    fn register(&self, id: SubscriptionId) {
        *lock(&self.subscription) = Some(id);
        if !self.sequence.is_active() {
            self.release();
        }
    }

    fn release(&self) {
        let subscription = lock(&self.subscription).take();
        if let Some(id) = subscription {
            self.session.unsubscribe(id);
        }
    }

    /// Stops the timer and drops the subscription of a deactivated handle
    fn shutdown(&self, reason: &str) {
        self.cancel.cancel();
        self.release();
        info!(
            "Stopped polling {} after {} request(s) ({})",
            self.subject,
            self.sequence.latest(),
            reason
        );
    }

    /// Deactivates and shuts down; returns `false` if already retired
    fn retire(&self, reason: &str) -> bool {
        if !self.sequence.retire() {
            return false;
        }
        self.shutdown(reason);
        true
    }
}

/// One active scheduling session
pub struct PollingHandle {
    inner: Arc<HandleInner>,
    timer: JoinHandle<()>,
}

impl PollingHandle {
    pub fn subject(&self) -> &str {
        &self.inner.subject
    }

    pub fn is_active(&self) -> bool {
        self.inner.sequence.is_active()
    }

    /// Whether the periodic timer is running
    pub fn is_armed(&self) -> bool {
        self.inner.sequence.is_armed()
    }

    /// Clears the timer and invalidates the handle in one step
    ///
    /// Requests still in flight are aborted; any that complete anyway are
    /// rejected by the inactive check.
    fn retire(self, reason: &str) {
        self.inner.retire(reason);
        self.timer.abort();
    }
}

struct PollContext<T> {
    fetch: Fetcher<T>,
    is_terminal: Predicate<T>,
    store: JobStateStore<T>,
    session: SessionGuard,
    config: PollConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Initial,
    Tick,
}

/// Periodic fetcher for one view
///
/// Must be used inside a tokio runtime. Dropping the scheduler stops it.
pub struct PollingScheduler<T> {
    store: JobStateStore<T>,
    session: SessionGuard,
    handle: Option<PollingHandle>,
}

impl<T> PollingScheduler<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(store: JobStateStore<T>, session: SessionGuard) -> Self {
        Self {
            store,
            session,
            handle: None,
        }
    }

    /// Begins observing `subject`
    ///
    /// Issues one fetch right away. A terminal result ends observation
    /// without arming the timer; otherwise the first tick fires after
    /// `config.initial_delay` and then every `config.interval`. Any handle
    /// already active is retired first. Returns without waiting for the
    /// initial fetch.
    pub fn start<F, Fut, P>(
        &mut self,
        subject: impl Into<String>,
        fetcher: F,
        is_terminal: P,
        config: PollConfig,
    ) where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = auditor_client::Result<T>> + Send + 'static,
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let subject = subject.into();

        if let Some(previous) = self.handle.take() {
            let same_subject = previous.subject() == subject;
            previous.retire("restarted");
            if !same_subject {
                self.store.reset();
            }
        }

        let inner = Arc::new(HandleInner::new(subject.clone(), self.session.clone()));

        let weak = Arc::downgrade(&inner);
        let subscription = self.session.subscribe(move || {
            if let Some(inner) = weak.upgrade() {
                inner.retire("session invalidated");
            }
        });
        inner.register(subscription);

        let fetch: Fetcher<T> = Arc::new(move || Box::pin(fetcher()) as FetchFuture<T>);
        let ctx = Arc::new(PollContext {
            fetch,
            is_terminal: Arc::new(is_terminal),
            store: self.store.clone(),
            session: self.session.clone(),
            config,
        });

        info!(
            "Start polling {} (interval: {:?}, initial delay: {:?})",
            subject,
            config.period(),
            config.initial_delay
        );

        let timer = tokio::spawn(run(ctx, Arc::clone(&inner)));
        self.handle = Some(PollingHandle { inner, timer });
    }
}

impl<T> PollingScheduler<T> {
    /// Retires the current handle, if any
    ///
    /// After this returns no further fetch is issued and no response of the
    /// retired handle reaches the store. Calling it again is a no-op.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.retire("stopped");
        }
    }

    /// Whether a handle is still observing its subject
    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(PollingHandle::is_active)
    }

    /// Whether the periodic timer is armed
    pub fn is_polling(&self) -> bool {
        self.handle.as_ref().is_some_and(PollingHandle::is_armed)
    }

    pub fn handle(&self) -> Option<&PollingHandle> {
        self.handle.as_ref()
    }

    pub fn store(&self) -> &JobStateStore<T> {
        &self.store
    }

    pub fn session(&self) -> &SessionGuard {
        &self.session
    }
}

impl<T> Drop for PollingScheduler<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.retire("view dropped");
        }
    }
}

/// Timer task: initial fetch, then ticks until cancelled
async fn run<T>(ctx: Arc<PollContext<T>>, inner: Arc<HandleInner>)
where
    T: Clone + Send + Sync + 'static,
{
    let Some(ticket) = inner.sequence.issue() else {
        return;
    };

    tokio::select! {
        biased;
        _ = inner.cancel.cancelled() => return,
        _ = poll_once(&ctx, &inner, ticket, Phase::Initial) => {}
    }

    if !inner.sequence.arm() {
        return;
    }
    debug!("Timer armed for {}", inner.subject);

    let mut ticker = time::interval_at(
        Instant::now() + ctx.config.initial_delay,
        ctx.config.period(),
    );
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // Dropping the set aborts whatever is still in flight.
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            biased;
            _ = inner.cancel.cancelled() => break,
            Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
            _ = ticker.tick() => {
                let Some(ticket) = inner.sequence.issue() else {
                    break;
                };
                let ctx = Arc::clone(&ctx);
                let inner = Arc::clone(&inner);
                in_flight.spawn(async move {
                    poll_once(&ctx, &inner, ticket, Phase::Tick).await;
                });
            }
        }
    }
}

/// Issues one fetch and routes its outcome
async fn poll_once<T>(ctx: &PollContext<T>, inner: &HandleInner, ticket: Ticket, phase: Phase)
where
    T: Clone + Send + Sync + 'static,
{
    debug!("Fetching {} (request #{})", inner.subject, ticket.number());

    let result = match time::timeout(ctx.config.fetch_timeout, (ctx.fetch)()).await {
        Ok(result) => result,
        Err(_) => Err(ClientError::Network(format!(
            "request timed out after {:?}",
            ctx.config.fetch_timeout
        ))),
    };

    match result {
        Ok(snapshot) => {
            let applied = inner.sequence.commit(ticket, || {
                let terminal = (ctx.is_terminal)(&snapshot);
                ctx.store.apply(snapshot);
                terminal
            });

            match applied {
                Some(true) => inner.shutdown("terminal state reached"),
                Some(false) => {}
                None => debug!(
                    "Discarded stale response #{} for {}",
                    ticket.number(),
                    inner.subject
                ),
            }
        }
        Err(err) if err.is_auth() => {
            if !inner.sequence.is_active() {
                return;
            }
            warn!("Authentication rejected while polling {}: {}", inner.subject, err);
            ctx.session.report_auth_failure();
            inner.retire("authentication failure");
        }
        Err(err) if err.is_not_found() => {
            let message = err.to_string();
            let applied = inner.sequence.commit(ticket, || {
                ctx.store.mark_not_found(message);
                true
            });
            if applied.is_some() {
                inner.shutdown("subject not found");
            }
        }
        Err(err) if phase == Phase::Initial => {
            warn!("Initial fetch of {} failed: {}", inner.subject, err);
            let message = err.to_string();
            let applied = inner.sequence.commit(ticket, || {
                ctx.store.mark_unavailable(message);
                true
            });
            if applied.is_some() {
                inner.shutdown("initial fetch failed");
            }
        }
        Err(err) => {
            let Some(streak) = inner.sequence.record_failure(ticket) else {
                return;
            };
            if err.is_transient() {
                warn!(
                    "Polling {} failed ({} in a row), retrying: {}",
                    inner.subject, streak, err
                );
            } else {
                warn!(
                    "Polling {} was rejected ({} in a row): {}",
                    inner.subject, streak, err
                );
            }

            if ctx
                .config
                .max_consecutive_failures
                .is_some_and(|limit| streak >= limit)
            {
                let message = format!("giving up after {} failed attempts: {}", streak, err);
                let applied = inner.sequence.commit(ticket, || {
                    ctx.store.mark_unavailable(message);
                    true
                });
                if applied.is_some() {
                    inner.shutdown("too many consecutive failures");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::testing::{CountingNavigator, CountingStore, guard_with_token};
    use crate::store::ViewState;
    use auditor_core::domain::job::JobStatus;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type Snap = (JobStatus, &'static str);

    /// Replays canned responses; the last one repeats forever
    struct Script {
        steps: Mutex<VecDeque<(u64, Result<Snap, ClientError>)>>,
        calls: AtomicUsize,
    }

    impl Script {
        fn new(steps: Vec<(u64, Result<Snap, ClientError>)>) -> Arc<Self> {
            Arc::new(Self {
                steps: Mutex::new(steps.into()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        async fn next(&self) -> Result<Snap, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let (delay_ms, result) = {
                let mut steps = lock(&self.steps);
                if steps.len() > 1 {
                    steps.pop_front().unwrap()
                } else {
                    steps.front().cloned().unwrap()
                }
            };
            time::sleep(Duration::from_millis(delay_ms)).await;
            result
        }
    }

    fn ok(status: JobStatus, label: &'static str) -> (u64, Result<Snap, ClientError>) {
        (0, Ok((status, label)))
    }

    fn slow(delay_ms: u64, status: JobStatus, label: &'static str) -> (u64, Result<Snap, ClientError>) {
        (delay_ms, Ok((status, label)))
    }

    fn fail(err: ClientError) -> (u64, Result<Snap, ClientError>) {
        (0, Err(err))
    }

    fn network() -> ClientError {
        ClientError::Network("connection refused".to_string())
    }

    fn start(scheduler: &mut PollingScheduler<Snap>, subject: &str, script: &Arc<Script>, config: PollConfig) {
        let script = Arc::clone(script);
        scheduler.start(
            subject,
            move || {
                let script = Arc::clone(&script);
                async move { script.next().await }
            },
            |snap: &Snap| snap.0.is_terminal(),
            config,
        );
    }

    fn scheduler() -> (PollingScheduler<Snap>, CountingStore, CountingNavigator) {
        let (session, store, navigator) = guard_with_token("token");
        (
            PollingScheduler::new(JobStateStore::new(), session),
            store,
            navigator,
        )
    }

    async fn at(start: Instant, ms: u64) {
        time::sleep_until(start + Duration::from_millis(ms)).await;
    }

    fn status(scheduler: &PollingScheduler<Snap>) -> Option<Snap> {
        scheduler.store().current().snapshot().copied()
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_until_terminal() {
        let (mut scheduler, _, _) = scheduler();
        let script = Script::new(vec![
            ok(JobStatus::Queued, "q"),
            ok(JobStatus::Running, "r"),
            ok(JobStatus::Done, "d"),
        ]);
        let t0 = Instant::now();
        start(&mut scheduler, "job:1", &script, PollConfig::detail());

        at(t0, 100).await;
        assert_eq!(status(&scheduler), Some((JobStatus::Queued, "q")));
        assert!(scheduler.is_polling());

        at(t0, 2_500).await;
        assert_eq!(status(&scheduler), Some((JobStatus::Running, "r")));

        at(t0, 7_500).await;
        assert_eq!(status(&scheduler), Some((JobStatus::Done, "d")));
        assert!(!scheduler.is_active());
        assert!(!scheduler.is_polling());
        assert_eq!(script.calls(), 3);

        at(t0, 60_000).await;
        assert_eq!(script.calls(), 3);
        assert_eq!(scheduler.session().subscriber_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_initial_fetch_never_arms_timer() {
        let (mut scheduler, _, _) = scheduler();
        let script = Script::new(vec![ok(JobStatus::Failed, "f")]);
        let t0 = Instant::now();
        start(&mut scheduler, "job:1", &script, PollConfig::detail());

        at(t0, 100).await;
        assert_eq!(status(&scheduler), Some((JobStatus::Failed, "f")));
        assert!(!scheduler.is_active());
        assert!(!scheduler.is_polling());

        at(t0, 60_000).await;
        assert_eq!(script.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_keeps_single_timer() {
        let (mut scheduler, _, _) = scheduler();
        let script = Script::new(vec![ok(JobStatus::Running, "r")]);
        let t0 = Instant::now();

        start(&mut scheduler, "job:1", &script, PollConfig::detail());
        start(&mut scheduler, "job:1", &script, PollConfig::detail());
        assert_eq!(scheduler.session().subscriber_count(), 1);

        // Initial fetch, then ticks at 2 s and 7 s from a single timer.
        at(t0, 8_000).await;
        assert_eq!(script.calls(), 3);
        assert!(scheduler.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_on_new_subject_resets_store() {
        let (mut scheduler, _, _) = scheduler();
        let first = Script::new(vec![ok(JobStatus::Running, "a")]);
        let second = Script::new(vec![slow(1_000, JobStatus::Running, "b")]);
        let t0 = Instant::now();

        start(&mut scheduler, "jobs?status_filter=running", &first, PollConfig::list());
        at(t0, 100).await;
        assert_eq!(status(&scheduler), Some((JobStatus::Running, "a")));

        start(&mut scheduler, "jobs", &second, PollConfig::list());
        assert_eq!(scheduler.store().current(), ViewState::NotLoaded);

        at(t0, 1_500).await;
        assert_eq!(status(&scheduler), Some((JobStatus::Running, "b")));
        assert_eq!(first.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_before_initial_response_discards_it() {
        let (mut scheduler, _, _) = scheduler();
        let script = Script::new(vec![slow(1_000, JobStatus::Running, "r")]);
        let t0 = Instant::now();

        start(&mut scheduler, "job:y", &script, PollConfig::detail());
        at(t0, 10).await;
        assert_eq!(script.calls(), 1);
        scheduler.stop();
        scheduler.stop();

        at(t0, 30_000).await;
        assert_eq!(scheduler.store().current(), ViewState::NotLoaded);
        assert_eq!(scheduler.store().revision(), 0);
        assert_eq!(script.calls(), 1);
        assert!(!scheduler.is_polling());
        assert_eq!(scheduler.session().subscriber_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_tick_discards_in_flight_response() {
        let (mut scheduler, _, _) = scheduler();
        let script = Script::new(vec![
            ok(JobStatus::Queued, "q"),
            slow(3_000, JobStatus::Running, "late"),
        ]);
        let t0 = Instant::now();
        start(
            &mut scheduler,
            "job:1",
            &script,
            PollConfig::detail().with_fetch_timeout(Duration::from_secs(30)),
        );

        at(t0, 2_500).await;
        assert_eq!(script.calls(), 2);
        scheduler.stop();

        at(t0, 20_000).await;
        assert_eq!(status(&scheduler), Some((JobStatus::Queued, "q")));
        assert_eq!(scheduler.store().revision(), 1);
        assert_eq!(script.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_response_is_discarded() {
        let (mut scheduler, _, _) = scheduler();
        let script = Script::new(vec![
            ok(JobStatus::Queued, "initial"),
            // Issued at 2 s, answers at 8 s.
            slow(6_000, JobStatus::Running, "older"),
            // Issued at 7 s, answers at 7.5 s.
            slow(500, JobStatus::Running, "newer"),
            slow(60_000, JobStatus::Running, "hung"),
        ]);
        let t0 = Instant::now();
        start(
            &mut scheduler,
            "job:1",
            &script,
            PollConfig::detail().with_fetch_timeout(Duration::from_secs(120)),
        );

        at(t0, 7_700).await;
        assert_eq!(status(&scheduler), Some((JobStatus::Running, "newer")));

        at(t0, 8_200).await;
        assert_eq!(status(&scheduler), Some((JobStatus::Running, "newer")));
        assert_eq!(scheduler.store().revision(), 2);
        assert!(scheduler.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_auth_failure_stops_every_scheduler() {
        let (session, tokens, navigator) = guard_with_token("token");
        let mut failing = PollingScheduler::new(JobStateStore::new(), session.clone());
        let mut other = PollingScheduler::new(JobStateStore::new(), session.clone());

        let failing_script = Script::new(vec![
            ok(JobStatus::Queued, "q"),
            fail(ClientError::Auth("Token inválido o expirado".to_string())),
        ]);
        let other_script = Script::new(vec![ok(JobStatus::Running, "r")]);
        let t0 = Instant::now();

        start(&mut failing, "job:x", &failing_script, PollConfig::detail());
        start(&mut other, "jobs", &other_script, PollConfig::list());

        at(t0, 2_500).await;
        assert!(!failing.is_active());
        assert!(!other.is_active());
        assert_eq!(session.token(), None);
        assert_eq!(tokens.clears.load(Ordering::SeqCst), 1);
        assert_eq!(navigator.redirects.load(Ordering::SeqCst), 1);
        assert_eq!(session.subscriber_count(), 0);

        at(t0, 60_000).await;
        assert_eq!(failing_script.calls(), 2);
        assert_eq!(other_script.calls(), 1);
        // The view keeps its last good snapshot.
        assert_eq!(status(&failing), Some((JobStatus::Queued, "q")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_simultaneous_auth_failures_invalidate_once() {
        let (session, tokens, navigator) = guard_with_token("token");
        let mut first = PollingScheduler::new(JobStateStore::new(), session.clone());
        let mut second = PollingScheduler::new(JobStateStore::new(), session.clone());
        let expired = || fail(ClientError::Auth("expired".to_string()));
        let a = Script::new(vec![ok(JobStatus::Running, "a"), expired()]);
        let b = Script::new(vec![ok(JobStatus::Running, "b"), expired()]);
        let t0 = Instant::now();

        start(&mut first, "job:a", &a, PollConfig::detail());
        start(&mut second, "job:b", &b, PollConfig::detail());

        // Both ticks fire at 2 s and both come back rejected.
        at(t0, 2_500).await;
        assert_eq!(tokens.clears.load(Ordering::SeqCst), 1);
        assert_eq!(navigator.redirects.load(Ordering::SeqCst), 1);
        assert!(!first.is_active());
        assert!(!second.is_active());
        assert_eq!(status(&first), Some((JobStatus::Running, "a")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_during_tick_stops() {
        let (mut scheduler, _, navigator) = scheduler();
        let script = Script::new(vec![
            ok(JobStatus::Running, "r"),
            fail(ClientError::NotFound("Job no encontrado".to_string())),
        ]);
        let t0 = Instant::now();
        start(&mut scheduler, "job:1", &script, PollConfig::detail());

        at(t0, 2_500).await;
        assert!(matches!(scheduler.store().current(), ViewState::NotFound(_)));
        assert!(!scheduler.is_active());
        assert_eq!(navigator.redirects.load(Ordering::SeqCst), 0);

        at(t0, 30_000).await;
        assert_eq!(script.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_failure_surfaces_unavailable() {
        let (mut scheduler, _, _) = scheduler();
        let script = Script::new(vec![fail(network())]);
        let t0 = Instant::now();
        start(&mut scheduler, "job:1", &script, PollConfig::detail());

        at(t0, 100).await;
        assert!(matches!(scheduler.store().current(), ViewState::Unavailable(_)));
        assert!(!scheduler.is_active());

        at(t0, 30_000).await;
        assert_eq!(script.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_tick_failures_are_silent() {
        let (mut scheduler, _, _) = scheduler();
        let script = Script::new(vec![
            ok(JobStatus::Queued, "q"),
            fail(network()),
            ok(JobStatus::Running, "r"),
            ok(JobStatus::Done, "d"),
        ]);
        let t0 = Instant::now();
        start(&mut scheduler, "job:1", &script, PollConfig::detail());

        at(t0, 2_500).await;
        assert_eq!(status(&scheduler), Some((JobStatus::Queued, "q")));
        assert!(scheduler.is_polling());

        at(t0, 7_500).await;
        assert_eq!(status(&scheduler), Some((JobStatus::Running, "r")));

        at(t0, 12_500).await;
        assert_eq!(status(&scheduler), Some((JobStatus::Done, "d")));
        assert!(!scheduler.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_limit_gives_up() {
        let (mut scheduler, _, _) = scheduler();
        let script = Script::new(vec![ok(JobStatus::Running, "r"), fail(network())]);
        let t0 = Instant::now();
        start(
            &mut scheduler,
            "job:1",
            &script,
            PollConfig::detail().with_max_consecutive_failures(2),
        );

        at(t0, 2_500).await;
        assert!(scheduler.is_active());

        at(t0, 7_500).await;
        assert!(matches!(scheduler.store().current(), ViewState::Unavailable(_)));
        assert!(!scheduler.is_active());
        assert_eq!(script.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_fetch_times_out_and_polling_continues() {
        let (mut scheduler, _, _) = scheduler();
        let script = Script::new(vec![
            ok(JobStatus::Queued, "q"),
            slow(60_000, JobStatus::Running, "hung"),
            ok(JobStatus::Done, "d"),
        ]);
        let t0 = Instant::now();
        start(
            &mut scheduler,
            "job:1",
            &script,
            PollConfig::detail().with_fetch_timeout(Duration::from_secs(1)),
        );

        at(t0, 3_500).await;
        assert_eq!(status(&scheduler), Some((JobStatus::Queued, "q")));
        assert!(scheduler.is_active());

        at(t0, 7_500).await;
        assert_eq!(status(&scheduler), Some((JobStatus::Done, "d")));
        assert!(!scheduler.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_polling() {
        let (session, _, _) = guard_with_token("token");
        let script = Script::new(vec![ok(JobStatus::Running, "r")]);
        let t0 = Instant::now();
        {
            let mut scheduler = PollingScheduler::new(JobStateStore::new(), session.clone());
            start(&mut scheduler, "job:1", &script, PollConfig::detail());
            at(t0, 2_500).await;
            assert_eq!(script.calls(), 2);
        }

        assert_eq!(session.subscriber_count(), 0);
        at(t0, 30_000).await;
        assert_eq!(script.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_keeps_polling() {
        let (mut scheduler, _, _) = scheduler();
        let script = Script::new(vec![
            ok(JobStatus::Queued, "q"),
            ok(JobStatus::Running, "r"),
            ok(JobStatus::Done, "d"),
        ]);
        let t0 = Instant::now();
        start(
            &mut scheduler,
            "job:1",
            &script,
            PollConfig::new(Duration::ZERO).with_fetch_timeout(Duration::from_secs(1)),
        );

        at(t0, 100).await;
        assert_eq!(status(&scheduler), Some((JobStatus::Done, "d")));
        assert!(!scheduler.is_active());
        assert!(!scheduler.is_polling());
        assert_eq!(scheduler.session().subscriber_count(), 0);

        let calls = script.calls();
        assert!(calls >= 3);
        at(t0, 30_000).await;
        assert_eq!(script.calls(), calls);
    }

    #[test]
    fn test_subscription_registered_after_retire_is_dropped() {
        let (session, _, _) = guard_with_token("token");

        let live = HandleInner::new("job:1".to_string(), session.clone());
        live.register(session.subscribe(|| {}));
        assert_eq!(session.subscriber_count(), 1);
        assert!(live.retire("stopped"));
        assert_eq!(session.subscriber_count(), 0);

        let retired = HandleInner::new("job:2".to_string(), session.clone());
        assert!(retired.retire("session invalidated"));
        retired.register(session.subscribe(|| {}));
        assert_eq!(session.subscriber_count(), 0);
        assert!(retired.cancel.is_cancelled());
    }

    #[test]
    fn test_presets() {
        let detail = PollConfig::detail();
        assert_eq!(detail.interval, Duration::from_secs(5));
        assert_eq!(detail.initial_delay, Duration::from_secs(2));

        let list = PollConfig::list();
        assert_eq!(list.interval, Duration::from_secs(10));
        assert_eq!(list.initial_delay, list.interval);
        assert_eq!(list.max_consecutive_failures, None);

        assert_eq!(PollConfig::new(Duration::ZERO).period(), MIN_INTERVAL);
        assert_eq!(detail.period(), detail.interval);
    }
}
