use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::thread::{self, ThreadId};

use tracing::error;

use crate::error::{acquire_state, LatchError, Result};

struct LockState {
    owner: Option<ThreadId>,
    // Tickets of threads currently parked in `lock`, in arrival order.
    queue: VecDeque<u64>,
    next_ticket: u64,
}

/// Non-reentrant exclusive lock with optional FIFO hand-off.
///
/// The non-reentrancy policy itself lives one level up in [`super::Latch`];
/// this type provides exclusion, the wait queue, and the advisory owner and
/// waiter accessors the latch exposes for diagnostics.
///
/// State transitions run under a `std::sync` mutex so that a panic inside a
/// transition poisons the state and every later caller receives
/// [`LatchError::RecoveryRequired`] rather than an unprovable lock state.
pub(crate) struct ExclusiveLock {
    fair: bool,
    state: Mutex<LockState>,
    available: Condvar,
}

impl ExclusiveLock {
    pub(crate) fn new(fair: bool) -> Self {
        Self {
            fair,
            state: Mutex::new(LockState {
                owner: None,
                queue: VecDeque::new(),
                next_ticket: 0,
            }),
            available: Condvar::new(),
        }
    }

    fn claimable(state: &LockState, ticket: u64, fair: bool) -> bool {
        state.owner.is_none() && (!fair || state.queue.front() == Some(&ticket))
    }

    /// Blocks until the calling thread is the sole owner.
    pub(crate) fn lock(&self, name: &str) -> Result<()> {
        let me = thread::current().id();
        let mut state = acquire_state(&self.state, name)?;
        let ticket = state.next_ticket;
        state.next_ticket += 1;
        state.queue.push_back(ticket);
        while !Self::claimable(&state, ticket, self.fair) {
            state = self.available.wait(state).map_err(|_| {
                error!("latch {name} wait abandoned - recovery required");
                LatchError::RecoveryRequired(format!("{name} wait abandoned"))
            })?;
        }
        if let Some(pos) = state.queue.iter().position(|&t| t == ticket) {
            state.queue.remove(pos);
        }
        state.owner = Some(me);
        Ok(())
    }

    /// Claims ownership iff the lock is free right now.
    ///
    /// In fair mode a free lock with parked waiters still refuses: barging
    /// ahead of the queue would break the FIFO grant order.
    pub(crate) fn try_lock(&self, name: &str) -> Result<bool> {
        let mut state = acquire_state(&self.state, name)?;
        if state.owner.is_none() && (!self.fair || state.queue.is_empty()) {
            state.owner = Some(thread::current().id());
            return Ok(true);
        }
        Ok(false)
    }

    /// Releases the lock and wakes the next owner.
    ///
    /// The caller must have verified ownership; only the owning thread ever
    /// clears `owner`, so the check cannot go stale in between.
    pub(crate) fn unlock(&self, name: &str) -> Result<()> {
        let mut state = acquire_state(&self.state, name)?;
        debug_assert_eq!(state.owner, Some(thread::current().id()));
        state.owner = None;
        let has_waiters = !state.queue.is_empty();
        drop(state);
        if has_waiters {
            if self.fair {
                // A single condvar serves all tickets; wake everyone and let
                // the queue front claim. Exactly one thread becomes owner.
                self.available.notify_all();
            } else {
                self.available.notify_one();
            }
        }
        Ok(())
    }

    /// True iff the calling thread owns the lock. Never fails: a poisoned
    /// state reads as "not owner" and the next transition escalates.
    pub(crate) fn held_by_current_thread(&self) -> bool {
        self.state
            .lock()
            .map(|state| state.owner == Some(thread::current().id()))
            .unwrap_or(false)
    }

    /// True iff some thread owns the lock. Advisory.
    pub(crate) fn is_locked(&self) -> bool {
        self.state
            .lock()
            .map(|state| state.owner.is_some())
            .unwrap_or(false)
    }

    /// The owning thread, if any. Advisory: may be stale on return.
    pub(crate) fn owner(&self) -> Option<ThreadId> {
        self.state.lock().map(|state| state.owner).unwrap_or(None)
    }

    /// Number of threads parked waiting. Advisory.
    pub(crate) fn queue_len(&self) -> usize {
        self.state.lock().map(|state| state.queue.len()).unwrap_or(0)
    }

    #[cfg(test)]
    fn poison_state(&self) {
        let _guard = self.state.lock().unwrap();
        panic!("poisoning lock state");
    }
}
