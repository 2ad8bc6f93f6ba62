//! Tracing/logging initialization for processes embedding the back office
//! core (CLI shells, desktop hosts, test harnesses).

use tracing_subscriber::EnvFilter;

/// Initialize tracing/logging for the process.
///
/// JSON-formatted events, filter driven by `RUST_LOG` (defaulting to `info`
/// so every document finalization and catalog mutation is visible). Safe to
/// call multiple times; subsequent calls are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}
