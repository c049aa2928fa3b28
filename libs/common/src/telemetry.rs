//! Tracing setup shared by the service binaries

use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber.
///
/// The filter comes from `RUST_LOG` and falls back to `info`.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // A second call (tests, embedded use) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
