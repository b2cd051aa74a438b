//! Tracing subscriber setup shared by the stress binary and embedders.

use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{LatchError, Result};

/// Initializes the global tracing subscriber with the given filter directive
/// (e.g. `"info"` or `"vesper_latch=debug"`).
pub fn init_logging(level: &str) -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_new(level)
                .map_err(|e| LatchError::Config(format!("invalid log level: {e}")))?,
        )
        .with_target(true)
        .with_thread_ids(true)
        .try_init()
        .map_err(|_| LatchError::Config("logging already initialized".into()))
}
