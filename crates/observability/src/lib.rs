//! Tracing and logging setup shared by every binary and test harness.

/// Initialize process-wide logging with the defaults (`RUST_LOG` or `info`, JSON).
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Initialize process-wide logging from configuration.
pub fn init_with(config: &LoggingConfig) {
    tracing::init_with(config);
}

pub mod tracing;

pub use tracing::LoggingConfig;
