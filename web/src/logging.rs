use tracing_subscriber::{EnvFilter, fmt};

/// Initialize logging to stdout, filtered by `RUST_LOG` (default `info`).
///
/// Calling it twice is harmless; only the first subscriber is installed.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}
