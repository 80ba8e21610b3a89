//! Optional `tracing` subscriber setup for binaries and examples.
//!
//! The library itself only emits events; installing a subscriber is left to
//! the application.

use tracing_subscriber::EnvFilter;

/// Install a formatted stderr subscriber.
///
/// `RUST_LOG` takes precedence over `default_directive` (e.g. `"bybit_pnl=info"`).
/// Returns `false` if a global subscriber was already installed.
pub fn init(default_directive: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}
