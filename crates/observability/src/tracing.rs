//! Tracing/logging initialization.

use tracing_subscriber::EnvFilter;

/// Filter used when neither `RUST_LOG` nor explicit directives are given.
pub const DEFAULT_FILTER: &str = "info";

fn filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// JSON logs + timestamps, configurable via RUST_LOG.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init(fallback: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(fallback))
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}

/// Human-readable output routed through the test harness capture.
pub fn init_test_writer() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter("debug"))
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init("warn");
        init("debug");
        init_test_writer();
        ::tracing::info!(component = "observability", "still logging after re-init");
    }

    #[test]
    fn invalid_directives_fall_back() {
        let f = filter("=[not a filter");
        assert!(!f.to_string().is_empty());
    }
}
