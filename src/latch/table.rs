use std::fmt::Write as _;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::error::{LatchError, Result};

/// Unique identifier assigned to each latch instance for ledger keying.
pub type LatchId = u64;

/// Strategy interface recording which thread holds which latch.
///
/// The latch consults its tracker on every successful acquire and release.
/// Production configurations install [`NoopTracker`], which keeps the fast
/// path free of bookkeeping; verification configurations install a
/// [`LatchTable`] that detects discipline violations the primitive's own
/// checks cannot see.
pub trait OwnershipTracker: Send + Sync {
    /// Records that the calling thread now holds `latch`.
    ///
    /// Fails with [`LatchError::Verification`] if the (thread, latch) pair is
    /// already recorded: the non-reentrancy check upstream was bypassed,
    /// which is a defect in the primitive, not the caller.
    fn note(&self, latch: LatchId, name: &str) -> Result<()>;

    /// Removes the (calling thread, `latch`) record.
    ///
    /// With `check_held` set, the absence of a record is a
    /// [`LatchError::Verification`] failure (a release of a latch this
    /// ledger never saw acquired). Without it, absence simply means the
    /// latch was not held, consistent with the silent-release contract.
    fn un_note(&self, latch: LatchId, name: &str, check_held: bool) -> Result<()>;
}

/// Tracker that discards all records. Zero overhead, never fails.
#[derive(Default)]
pub struct NoopTracker;

impl OwnershipTracker for NoopTracker {
    fn note(&self, _latch: LatchId, _name: &str) -> Result<()> {
        Ok(())
    }

    fn un_note(&self, _latch: LatchId, _name: &str, _check_held: bool) -> Result<()> {
        Ok(())
    }
}

/// Process-wide ledger of currently held latches, keyed by thread.
///
/// Entries are removed only by matching [`OwnershipTracker::un_note`] calls,
/// so a leaked acquire leaves a permanent entry: inspecting the table at
/// shutdown (or from test hooks) doubles as a leak detector.
///
/// The table carries its own lock, independent of any individual latch; one
/// thread's note races freely with another's un-note on a different latch.
#[derive(Default)]
pub struct LatchTable {
    held: Mutex<FxHashMap<ThreadId, FxHashMap<LatchId, String>>>,
}

impl LatchTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of latches the calling thread currently holds.
    pub fn held_by_current_thread(&self) -> usize {
        let held = self.held.lock();
        held.get(&thread::current().id()).map_or(0, FxHashMap::len)
    }

    /// Returns the names of the latches the calling thread currently holds.
    pub fn latches_held_by_current_thread(&self) -> Vec<String> {
        let held = self.held.lock();
        held.get(&thread::current().id())
            .map(|latches| latches.values().cloned().collect())
            .unwrap_or_default()
    }

    /// True if no thread is recorded as holding any latch.
    pub fn is_empty(&self) -> bool {
        self.held.lock().is_empty()
    }

    /// Formats every (thread, latch) record for shutdown diagnostics.
    pub fn dump(&self) -> String {
        let held = self.held.lock();
        let mut out = String::new();
        for (thread_id, latches) in held.iter() {
            let _ = write!(out, "{thread_id:?} holds [");
            for (i, (latch_id, name)) in latches.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "{name}#{latch_id}");
            }
            out.push_str("]\n");
        }
        out
    }
}

impl OwnershipTracker for LatchTable {
    fn note(&self, latch: LatchId, name: &str) -> Result<()> {
        let mut held = self.held.lock();
        let latches = held.entry(thread::current().id()).or_default();
        if latches.insert(latch, name.to_string()).is_some() {
            return Err(LatchError::Verification(format!(
                "latch {name} already noted for this thread"
            )));
        }
        Ok(())
    }

    fn un_note(&self, latch: LatchId, name: &str, check_held: bool) -> Result<()> {
        let mut held = self.held.lock();
        let thread_id = thread::current().id();
        let removed = match held.get_mut(&thread_id) {
            Some(latches) => {
                let removed = latches.remove(&latch).is_some();
                if latches.is_empty() {
                    held.remove(&thread_id);
                }
                removed
            }
            None => false,
        };
        if check_held && !removed {
            return Err(LatchError::Verification(format!(
                "latch {name} not noted for this thread"
            )));
        }
        Ok(())
    }
}
