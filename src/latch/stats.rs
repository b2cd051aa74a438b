use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

/// Snapshot of latch statistics at a point in time.
///
/// Produced by [`LatchStats::snapshot`] without blocking on the latch; fields
/// are read individually, so a snapshot taken concurrently with mutation may
/// be torn across counters.
#[derive(Default, Debug, Clone, Copy)]
pub struct LatchStatsSnapshot {
    /// Number of acquires that found the latch free
    pub acquires_no_waiters: u64,
    /// Number of acquires that found the latch held by another thread
    pub acquires_with_contention: u64,
    /// Number of rejected attempts to acquire an already-owned latch
    pub acquires_self_owned: u64,
    /// Number of non-blocking acquires that obtained the latch
    pub acquire_no_wait_successful: u64,
    /// Number of non-blocking acquires that found the latch busy
    pub acquire_no_wait_unsuccessful: u64,
    /// Number of releases
    pub releases: u64,
}

impl fmt::Display for LatchStatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "acquires_no_waiters={} acquires_with_contention={} acquires_self_owned={} \
             acquire_no_wait_successful={} acquire_no_wait_unsuccessful={} releases={}",
            self.acquires_no_waiters,
            self.acquires_with_contention,
            self.acquires_self_owned,
            self.acquire_no_wait_successful,
            self.acquire_no_wait_unsuccessful,
            self.releases
        )
    }
}

/// Thread-safe statistics tracking for a single latch.
///
/// Counters are bumped only by the thread performing the corresponding
/// acquire/release transition; reads are relaxed and never block.
#[derive(Default)]
pub struct LatchStats {
    acquires_no_waiters: AtomicU64,
    acquires_with_contention: AtomicU64,
    acquires_self_owned: AtomicU64,
    acquire_no_wait_successful: AtomicU64,
    acquire_no_wait_unsuccessful: AtomicU64,
    releases: AtomicU64,
}

impl LatchStats {
    /// Returns the current count of uncontended acquires.
    pub fn acquires_no_waiters(&self) -> u64 {
        self.acquires_no_waiters.load(AtomicOrdering::Relaxed)
    }

    /// Returns the current count of contended acquires.
    pub fn acquires_with_contention(&self) -> u64 {
        self.acquires_with_contention.load(AtomicOrdering::Relaxed)
    }

    /// Returns the current count of rejected self-owned acquire attempts.
    pub fn acquires_self_owned(&self) -> u64 {
        self.acquires_self_owned.load(AtomicOrdering::Relaxed)
    }

    /// Returns the current count of successful non-blocking acquires.
    pub fn acquire_no_wait_successful(&self) -> u64 {
        self.acquire_no_wait_successful.load(AtomicOrdering::Relaxed)
    }

    /// Returns the current count of failed non-blocking acquires.
    pub fn acquire_no_wait_unsuccessful(&self) -> u64 {
        self.acquire_no_wait_unsuccessful.load(AtomicOrdering::Relaxed)
    }

    /// Returns the current count of releases.
    pub fn releases(&self) -> u64 {
        self.releases.load(AtomicOrdering::Relaxed)
    }

    pub(crate) fn inc_acquires_no_waiters(&self) {
        self.acquires_no_waiters
            .fetch_add(1, AtomicOrdering::Relaxed);
    }

    pub(crate) fn inc_acquires_with_contention(&self) {
        self.acquires_with_contention
            .fetch_add(1, AtomicOrdering::Relaxed);
    }

    pub(crate) fn inc_acquires_self_owned(&self) {
        self.acquires_self_owned
            .fetch_add(1, AtomicOrdering::Relaxed);
    }

    pub(crate) fn inc_acquire_no_wait_successful(&self) {
        self.acquire_no_wait_successful
            .fetch_add(1, AtomicOrdering::Relaxed);
    }

    pub(crate) fn inc_acquire_no_wait_unsuccessful(&self) {
        self.acquire_no_wait_unsuccessful
            .fetch_add(1, AtomicOrdering::Relaxed);
    }

    pub(crate) fn inc_releases(&self) {
        self.releases.fetch_add(1, AtomicOrdering::Relaxed);
    }

    /// Creates a snapshot of all current statistics.
    pub fn snapshot(&self) -> LatchStatsSnapshot {
        LatchStatsSnapshot {
            acquires_no_waiters: self.acquires_no_waiters(),
            acquires_with_contention: self.acquires_with_contention(),
            acquires_self_owned: self.acquires_self_owned(),
            acquire_no_wait_successful: self.acquire_no_wait_successful(),
            acquire_no_wait_unsuccessful: self.acquire_no_wait_unsuccessful(),
            releases: self.releases(),
        }
    }

    /// Emits current statistics to the tracing infrastructure.
    pub fn emit_tracing(&self, name: &str) {
        let snapshot = self.snapshot();
        tracing::info!(
            target: "vesper_latch::stats",
            latch = name,
            acquires_no_waiters = snapshot.acquires_no_waiters,
            acquires_with_contention = snapshot.acquires_with_contention,
            acquires_self_owned = snapshot.acquires_self_owned,
            acquire_no_wait_successful = snapshot.acquire_no_wait_successful,
            acquire_no_wait_unsuccessful = snapshot.acquire_no_wait_unsuccessful,
            releases = snapshot.releases,
            "latch stats snapshot"
        );
    }
}
