use std::sync::{Mutex, MutexGuard};

use thiserror::Error;
use tracing::error;

/// Convenience alias used by every fallible operation in this crate.
pub type Result<T> = std::result::Result<T, LatchError>;

/// Failures surfaced by latch operations.
///
/// The first three variants are local, synchronous, caller-visible failures:
/// the latch never retries on the caller's behalf. [`LatchError::RecoveryRequired`]
/// is different in kind — it means the engine instance can no longer prove its
/// invariants intact and must be restarted through recovery.
#[derive(Debug, Error)]
pub enum LatchError {
    /// The calling thread attempted to acquire a latch it already owns.
    /// Always a caller logic defect, never a timing condition.
    #[error("latch {0} already held by calling thread")]
    SelfOwned(String),
    /// The calling thread attempted the owner-checked release of a latch it
    /// does not hold.
    #[error("latch {0} not held by calling thread")]
    NotHeld(String),
    /// The ownership ledger observed a state that is unreachable if the
    /// latch primitive itself is correct. Verification configurations only.
    #[error("latch verification failure: {0}")]
    Verification(String),
    /// A blocking wait was abandoned with lock state unknowable. The engine
    /// must be shut down and restarted through its recovery path.
    #[error("latch state unrecoverable, restart required: {0}")]
    RecoveryRequired(String),
    /// Invalid or conflicting process-wide configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Locks internal latch state, escalating a poisoned mutex to
/// [`LatchError::RecoveryRequired`].
///
/// A poisoned state mutex means some thread panicked mid-transition: whether
/// the latch was obtained can no longer be determined, so no guess is made.
pub fn acquire_state<'a, T>(mutex: &'a Mutex<T>, name: &str) -> Result<MutexGuard<'a, T>> {
    mutex.lock().map_err(|_| {
        error!("latch {name} state poisoned - recovery required");
        LatchError::RecoveryRequired(format!("{name} state poisoned"))
    })
}
