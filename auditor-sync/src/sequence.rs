//! Request sequencing
//!
//! Every request a polling handle issues gets a ticket with a strictly
//! increasing number. A response may only touch view state while its handle
//! is still active and its ticket is the latest one issued. The check and the
//! mutation happen under one lock, so retiring a handle and applying a
//! response can never interleave.

use std::sync::Mutex;

use crate::lock;

/// Number of one issued request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

impl Ticket {
    pub fn number(self) -> u64 {
        self.0
    }
}

#[derive(Debug)]
struct GuardState {
    active: bool,
    armed: bool,
    latest: u64,
    consecutive_failures: u32,
}

/// Active flag plus request counter of one polling handle
#[derive(Debug)]
pub struct SequenceGuard {
    state: Mutex<GuardState>,
}

impl Default for SequenceGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceGuard {
    /// A fresh, active guard with no request issued
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GuardState {
                active: true,
                armed: false,
                latest: 0,
                consecutive_failures: 0,
            }),
        }
    }

    /// Issues the next ticket, or `None` once retired
    pub fn issue(&self) -> Option<Ticket> {
        let mut state = lock(&self.state);
        if !state.active {
            return None;
        }
        state.latest += 1;
        Some(Ticket(state.latest))
    }

    /// Number of the most recently issued ticket (0 if none)
    pub fn latest(&self) -> u64 {
        lock(&self.state).latest
    }

    pub fn is_active(&self) -> bool {
        lock(&self.state).active
    }

    /// Runs `apply` only if `ticket` is current, holding the lock throughout
    ///
    /// `apply` reports whether the state it wrote is final. A final commit
    /// retires the guard before the lock is released, so no ticket can be
    /// issued after it. Returns `None` when the ticket was stale or the guard
    /// retired. A successful commit also resets the consecutive failure count.
    pub fn commit(&self, ticket: Ticket, apply: impl FnOnce() -> bool) -> Option<bool> {
        let mut state = lock(&self.state);
        if !state.active || state.latest != ticket.0 {
            return None;
        }
        state.consecutive_failures = 0;
        let last = apply();
        if last {
            state.active = false;
            state.armed = false;
        }
        Some(last)
    }

    /// Counts a failed request; returns the new streak length
    ///
    /// Failures of stale or retired requests are not counted and yield `None`.
    pub fn record_failure(&self, ticket: Ticket) -> Option<u32> {
        let mut state = lock(&self.state);
        if !state.active || state.latest != ticket.0 {
            return None;
        }
        state.consecutive_failures += 1;
        Some(state.consecutive_failures)
    }

    /// Marks the timer as running; fails once retired
    pub fn arm(&self) -> bool {
        let mut state = lock(&self.state);
        if state.active {
            state.armed = true;
        }
        state.active
    }

    pub fn is_armed(&self) -> bool {
        let state = lock(&self.state);
        state.active && state.armed
    }

    /// Deactivates the guard; returns `true` only for the first call
    pub fn retire(&self) -> bool {
        let mut state = lock(&self.state);
        let was_active = state.active;
        state.active = false;
        state.armed = false;
        was_active
    }
}
