//! Latch primitives for the Vesper storage engine.
//!
//! Exclusive, non-reentrant, optionally fair latches protecting in-memory
//! engine structures (pages, tree nodes, internal metadata), with per-latch
//! contention statistics and a debug-only ownership ledger that verifies
//! latch discipline across threads.
//!
//! Callers are responsible for acquisition ordering across multiple latches;
//! this crate detects and reports single-latch misuse only.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod latch;
pub mod logging;

pub use config::{init, LatchConfig, LatchContext};
pub use error::{LatchError, Result};
pub use latch::{
    Latch, LatchId, LatchStats, LatchStatsSnapshot, LatchTable, NoopTracker, OwnershipTracker,
};
