//! Tracing setup
//!
//! Events go to stderr only: a worker's stdout carries protocol frames.
//! The filter comes from `FIELDSPLIT_LOG`, then `RUST_LOG`, then `info`.

use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

use crate::config::LOG_ENV;

static INIT_GUARD: OnceLock<()> = OnceLock::new();

/// Ensures tracing has been initialised for the current process.
///
/// Safe to call from every entry point; if the host already installed a
/// global subscriber, that one is kept.
pub fn init_tracing() {
    INIT_GUARD.get_or_init(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV)
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    });
}
