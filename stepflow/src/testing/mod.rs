//! Testing utilities for stepflow pipelines.
//!
//! This module provides:
//! - A shared call log for recording which steps ran
//! - Probe mutators that record calls without changing behaviour
//! - Test-friendly tracing setup

mod probes;
mod recorder;

pub use probes::{probe_handler, probe_linear};
pub use recorder::CallLog;

/// Installs a test-writer subscriber once; later calls are no-ops.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("stepflow=trace")),
        )
        .try_init();
}
