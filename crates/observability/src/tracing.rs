//! Tracing/logging initialization.

use tracing_subscriber::EnvFilter;

/// Initialize tracing/logging for the process.
///
/// `service` names the emitting binary (e.g. `fixtrack-api`) so log
/// pipelines can tell the API apart from future workers.
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init(service: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // JSON logs + timestamps, configurable via RUST_LOG.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();

    ::tracing::info!(service, "logging initialized");
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_is_idempotent() {
        super::init("fixtrack-test");
        super::init("fixtrack-test");
    }
}
