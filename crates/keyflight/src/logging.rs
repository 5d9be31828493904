//! Logging initialization for binaries and tests embedding the library.

use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::util::SubscriberInitExt;

/// Initializes the global `tracing` subscriber with the given env-filter
/// directives, e.g. `"keyflight=trace"`.
///
/// Panics if a global subscriber is already set.
pub fn init_logging(env_filter: &str) {
    tracing_subscriber::fmt()
        .with_timer(UtcTime::rfc_3339())
        .with_target(true)
        .with_env_filter(env_filter)
        .finish()
        .init();
}
