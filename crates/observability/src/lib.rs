//! Tracing/logging setup shared by ledger hosts and tests.

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use self::tracing::{LogFormat, ObservabilityConfig};

/// Initialize process-wide tracing from the environment.
///
/// Safe to call multiple times; subsequent calls become no-ops. Invalid
/// settings fall back to JSON output at `info`.
pub fn init() {
    let config = ObservabilityConfig::from_env().unwrap_or_default();
    self::tracing::init_with(&config);
}

/// Initialize process-wide tracing with an explicit configuration.
pub fn init_with(config: &ObservabilityConfig) {
    self::tracing::init_with(config);
}
