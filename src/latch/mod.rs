//! Exclusive, non-reentrant latches protecting in-memory engine structures.
//!
//! Engine components create one [`Latch`] per protected resource, acquire it
//! before touching the resource, and release it on every exit path. Latches
//! are short-held and deliberately non-reentrant: a thread re-acquiring a
//! latch it already owns is a logic bug, and the latch reports it loudly
//! instead of letting a reentrant grant mask a double traversal.

mod lock;
mod stats;
mod table;

pub use stats::{LatchStats, LatchStatsSnapshot};
pub use table::{LatchId, LatchTable, NoopTracker, OwnershipTracker};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::thread::ThreadId;

use tracing::error;

use crate::config::{self, LatchContext};
use crate::error::{LatchError, Result};
use lock::ExclusiveLock;

static NEXT_LATCH_ID: AtomicU64 = AtomicU64::new(1);

/// A short-held, non-reentrant exclusive lock.
///
/// Fairness and verification behavior come from the [`LatchContext`] the
/// latch was created against; [`Latch::new`] uses the process-wide context
/// (see [`crate::config::init`]), [`Latch::with_context`] lets tests run
/// against an isolated one.
pub struct Latch {
    id: LatchId,
    // Renameable after construction: latches materialized while replaying
    // persisted state are named post-hoc.
    name: parking_lot::Mutex<String>,
    lock: ExclusiveLock,
    stats: LatchStats,
    ctx: Arc<LatchContext>,
}

impl Latch {
    /// Creates a named latch against the process-wide context.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_context(name, Arc::clone(config::global()))
    }

    /// Creates a named latch against an explicit context.
    pub fn with_context(name: impl Into<String>, ctx: Arc<LatchContext>) -> Self {
        Self {
            id: NEXT_LATCH_ID.fetch_add(1, AtomicOrdering::Relaxed),
            name: parking_lot::Mutex::new(name.into()),
            lock: ExclusiveLock::new(ctx.fair_latches()),
            stats: LatchStats::default(),
            ctx,
        }
    }

    /// Returns the ledger id of this latch instance.
    pub fn id(&self) -> LatchId {
        self.id
    }

    /// Returns the latch name.
    pub fn name(&self) -> String {
        self.name.lock().clone()
    }

    /// Sets the latch name, used for latches in objects instantiated from
    /// persisted state.
    pub fn set_name(&self, name: impl Into<String>) {
        *self.name.lock() = name.into();
    }

    /// Acquires the latch for exclusive access.
    ///
    /// Waits if another thread holds the latch; when fairness is configured,
    /// parked threads are granted the latch in FIFO arrival order.
    ///
    /// # Errors
    /// * [`LatchError::SelfOwned`] - the calling thread already owns the
    ///   latch. Checked before locking; never retried.
    /// * [`LatchError::Verification`] - the ownership ledger rejected the
    ///   record (verification configurations only). The latch is held when
    ///   this is returned.
    /// * [`LatchError::RecoveryRequired`] - the wait was abandoned with
    ///   lock state unknowable.
    pub fn acquire(&self) -> Result<()> {
        // Snapshot the name up front: holding the name cell across the
        // blocking wait would stall every diagnostic path on this latch.
        let name = self.name();

        if self.lock.held_by_current_thread() {
            self.stats.inc_acquires_self_owned();
            return Err(LatchError::SelfOwned(name));
        }

        if self.lock.is_locked() {
            self.stats.inc_acquires_with_contention();
        } else {
            self.stats.inc_acquires_no_waiters();
        }

        self.lock.lock(&name)?;
        self.ctx.tracker().note(self.id, &name)
    }

    /// Acquires the latch for exclusive access, but does not block if it is
    /// unavailable.
    ///
    /// Returns `true` if the latch was acquired. A busy latch is a normal
    /// outcome, not an error.
    ///
    /// # Errors
    /// * [`LatchError::SelfOwned`] - the calling thread already owns the
    ///   latch.
    /// * [`LatchError::Verification`] - the ownership ledger rejected the
    ///   record (verification configurations only).
    /// * [`LatchError::RecoveryRequired`] - latch state is unknowable.
    pub fn try_acquire(&self) -> Result<bool> {
        let name = self.name();

        if self.lock.held_by_current_thread() {
            self.stats.inc_acquires_self_owned();
            return Err(LatchError::SelfOwned(name));
        }

        if self.lock.try_lock(&name)? {
            self.stats.inc_acquire_no_wait_successful();
            self.ctx.tracker().note(self.id, &name)?;
            Ok(true)
        } else {
            self.stats.inc_acquire_no_wait_unsuccessful();
            Ok(false)
        }
    }

    /// Releases the latch, waking the next waiting thread if any.
    ///
    /// # Errors
    /// * [`LatchError::NotHeld`] - the calling thread does not own the
    ///   latch. A correct caller always knows whether it holds the latch
    ///   before calling this variant.
    /// * [`LatchError::Verification`] - the ledger had no record of the
    ///   hold (verification configurations only); a double release detected
    ///   through a different path.
    /// * [`LatchError::RecoveryRequired`] - latch state is unknowable.
    pub fn release(&self) -> Result<()> {
        if self.do_release(true)? {
            return Err(LatchError::NotHeld(self.name()));
        }
        Ok(())
    }

    /// Releases the latch if and only if the calling thread owns it;
    /// otherwise a silent no-op.
    ///
    /// For cleanup and error-unwind paths where the caller may or may not
    /// have acquired. Never fails; a poisoned state is logged and left for
    /// the next transition to escalate.
    pub fn release_if_owner(&self) {
        if let Err(err) = self.do_release(false) {
            error!("latch {} release-if-owner failed: {err}", self.name());
        }
    }

    // Does the work of releasing and waking waiters. Returns true if the
    // latch was not owned by the caller.
    fn do_release(&self, check_held: bool) -> Result<bool> {
        if !self.lock.held_by_current_thread() {
            return Ok(true);
        }
        let name = self.name();
        self.lock.unlock(&name)?;
        self.stats.inc_releases();
        self.ctx.tracker().un_note(self.id, &name, check_held)?;
        Ok(false)
    }

    /// True iff the calling thread currently owns the latch.
    /// Never blocks on the latch, never fails.
    pub fn is_owner(&self) -> bool {
        self.lock.held_by_current_thread()
    }

    /// The thread currently holding the latch, or `None`.
    ///
    /// Diagnostics and tests only: the result may be stale by the time the
    /// caller inspects it.
    pub fn owner(&self) -> Option<ThreadId> {
        self.lock.owner()
    }

    /// Approximate count of threads parked waiting for this latch.
    /// Diagnostics only; not exact under concurrent mutation.
    pub fn n_waiters(&self) -> usize {
        self.lock.queue_len()
    }

    /// Returns an independent snapshot of this latch's counters.
    /// Never blocks on the latch.
    pub fn stats(&self) -> LatchStatsSnapshot {
        self.stats.snapshot()
    }

    /// Emits this latch's counters to the tracing infrastructure.
    pub fn emit_stats_tracing(&self) {
        self.stats.emit_tracing(&self.name.lock());
    }
}

impl fmt::Display for Latch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[owner={:?}, waiters={}]",
            self.name.lock(),
            self.lock.owner(),
            self.lock.queue_len()
        )
    }
}

impl fmt::Debug for Latch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Latch")
            .field("id", &self.id)
            .field("name", &*self.name.lock())
            .field("owner", &self.lock.owner())
            .field("waiters", &self.lock.queue_len())
            .finish()
    }
}
