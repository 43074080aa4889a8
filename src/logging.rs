//! Logging setup
//!
//! Installs a `tracing` subscriber with env-filter support. Library modules
//! only emit events; hosts that want output call this once at startup.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global tracing subscriber.
///
/// Honors `RUST_LOG`, defaulting to `mado=debug,info`. Calling this more than
/// once is harmless; later calls are no-ops.
pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "mado=debug,info".into()),
    );
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
