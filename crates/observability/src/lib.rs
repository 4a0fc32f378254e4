//! Tracing and logging setup shared by the pipeline crates.

/// Initialize process-wide tracing with the default filter.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(tracing::DEFAULT_FILTER);
}

/// Like [`init`], with `directives` used when `RUST_LOG` is unset.
pub fn init_with(directives: &str) {
    tracing::init(directives);
}

/// Initialize tracing for test binaries (output captured per test).
pub fn init_for_tests() {
    tracing::init_test_writer();
}

/// Tracing configuration (filters, layers).
pub mod tracing;
