//! Process-wide latch configuration.
//!
//! Fairness and verification are environment-level decisions made once at
//! startup, not per-latch knobs: every latch created afterward consumes the
//! same [`LatchContext`]. Tests that need isolation build their own context
//! with [`LatchContext::new`] and pass it to
//! [`Latch::with_context`](crate::Latch::with_context).

use std::sync::{Arc, OnceLock};

use crate::error::{LatchError, Result};
use crate::latch::{LatchTable, NoopTracker, OwnershipTracker};

/// Configuration options consumed when building a [`LatchContext`].
#[derive(Clone, Copy, Debug, Default)]
pub struct LatchConfig {
    /// Whether contended latches are granted to waiters in FIFO order.
    /// Fairness trades raw throughput for starvation-freedom.
    pub fair_latches: bool,
    /// Whether the ownership-ledger verification subsystem is enabled.
    /// Adds per-acquire/release bookkeeping; intended for debug builds.
    pub verify_latches: bool,
}

impl LatchConfig {
    /// Creates the default configuration: unfair queueing, verification off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables FIFO hand-off for contended latches.
    pub fn fair_latches(mut self, enabled: bool) -> Self {
        self.fair_latches = enabled;
        self
    }

    /// Enables or disables the ownership-ledger verification subsystem.
    pub fn verify_latches(mut self, enabled: bool) -> Self {
        self.verify_latches = enabled;
        self
    }
}

/// Immutable environment every latch is created against: the fairness flag
/// plus the ownership-tracking strategy selected by the configuration.
pub struct LatchContext {
    fair: bool,
    tracker: Arc<dyn OwnershipTracker>,
    table: Option<Arc<LatchTable>>,
}

impl LatchContext {
    /// Builds a context from a configuration.
    ///
    /// With verification enabled the context carries a [`LatchTable`] ledger;
    /// otherwise a [`NoopTracker`] keeps the production path free of
    /// bookkeeping.
    pub fn new(config: LatchConfig) -> Arc<Self> {
        let (tracker, table): (Arc<dyn OwnershipTracker>, Option<Arc<LatchTable>>) =
            if config.verify_latches {
                let table = Arc::new(LatchTable::new());
                (Arc::clone(&table) as Arc<dyn OwnershipTracker>, Some(table))
            } else {
                (Arc::new(NoopTracker), None)
            };
        Arc::new(Self {
            fair: config.fair_latches,
            tracker,
            table,
        })
    }

    /// Whether latches created against this context use FIFO hand-off.
    pub fn fair_latches(&self) -> bool {
        self.fair
    }

    /// Whether the ownership-ledger verification subsystem is active.
    pub fn verification_enabled(&self) -> bool {
        self.table.is_some()
    }

    /// The ownership ledger, when verification is enabled. Exposed for
    /// shutdown leak checks and test hooks.
    pub fn table(&self) -> Option<&Arc<LatchTable>> {
        self.table.as_ref()
    }

    pub(crate) fn tracker(&self) -> &dyn OwnershipTracker {
        self.tracker.as_ref()
    }
}

static GLOBAL_CONTEXT: OnceLock<Arc<LatchContext>> = OnceLock::new();

/// Installs the process-wide latch context. Call once at environment
/// startup, before any latch is created.
///
/// # Errors
/// * [`LatchError::Config`] - a context was already installed, either by an
///   earlier call or implicitly by a latch created before this one.
pub fn init(config: LatchConfig) -> Result<()> {
    let mut installed = false;
    GLOBAL_CONTEXT.get_or_init(|| {
        installed = true;
        LatchContext::new(config)
    });
    if installed {
        Ok(())
    } else {
        Err(LatchError::Config(
            "latch context already initialized".into(),
        ))
    }
}

/// The process-wide context, defaulting lazily if [`init`] was never called.
pub fn global() -> &'static Arc<LatchContext> {
    GLOBAL_CONTEXT.get_or_init(|| LatchContext::new(LatchConfig::default()))
}
