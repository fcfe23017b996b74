//! Auditor Sync
//!
//! Keeps a local view of server-executed scan jobs eventually consistent by
//! polling until the observed subject reaches a terminal state.
//!
//! Architecture:
//! - Session: the single owner of the bearer token and of invalidation effects
//! - Store: the latest accepted snapshot of one view, replaced atomically
//! - Sequence: per-handle request numbering that rejects stale responses
//! - Scheduler: the generic poller driving fetches into a store
//! - Views: job-detail and job-list bindings of the scheduler

pub mod scheduler;
pub mod sequence;
pub mod session;
pub mod store;
pub mod views;

pub use scheduler::{PollConfig, PollingScheduler};
pub use session::{LoginNavigator, MemoryTokenStore, SessionGuard, SubscriptionId, TokenStore};
pub use store::{JobStateStore, ViewState};
pub use views::{JobDetailView, JobListView, JobSnapshot};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks a mutex, recovering the data if a panicking holder poisoned it
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
