//! Tracing setup for the receiver cores
//!
//! The frequency synchronizer emits one debug event per coarse window and
//! per fine estimate, and the BCH decoder one per corrected or failed
//! codeword. These helpers install a subscriber filtered for that traffic;
//! `RUST_LOG` overrides the defaults either way.

use tracing_subscriber::{fmt, EnvFilter};

/// Consumer default: estimator updates and decode failures stay quiet
/// unless asked for.
const DEFAULT_FILTER: &str = "rustydvbs2=info";

/// Test default: surface the per-window and per-codeword debug events of
/// both cores.
const TEST_FILTER: &str = "rustydvbs2::bch=debug,rustydvbs2::freq_sync=debug";

/// Install the global subscriber for a consumer.
///
/// Call once, early in main(). Panics if a subscriber is already set, which
/// points at a double initialization in the caller.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

/// Install the subscriber for a test, with output captured per test.
///
/// Safe to call at the top of every test; calls after the first find the
/// global subscriber already set and back off.
pub fn init_test_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(TEST_FILTER));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_test_writer()
        .try_init();
}
