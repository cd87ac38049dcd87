#![forbid(unsafe_code)]

//! Test harness and reference fixtures for FrankenStore.
//!
//! - [`recorder`]: an observer that logs every notification it receives.
//! - [`flaky`]: a preference backend with switchable failures.
//! - [`shrink`]: delta-debugging minimization of failing event sequences.
//!
//! [`init_test_logging`] installs a `tracing` subscriber that writes through
//! the test harness's captured output.

pub mod flaky;
pub mod recorder;
pub mod shrink;

pub use flaky::FlakyBackend;
pub use recorder::{Notification, Recorder};
pub use shrink::{Shrunk, minimize_events};

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "fstore_core=debug,fstore_harness=debug";

/// Install a test-writer `fmt` subscriber. Safe to call from every test;
/// only the first call in a process takes effect.
pub fn init_test_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_test_logging_is_idempotent() {
        init_test_logging();
        init_test_logging();
        tracing::debug!(message = "harness.logging.ready");
    }
}
