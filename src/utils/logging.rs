//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Initializes the global tracing subscriber.
///
/// The filter directive is read from `RUST_LOG` when set and defaults to
/// `info`. Calling this more than once is a no-op, so tests and binaries
/// can both call it unconditionally.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init();
}
