//! Observability utilities.
//!
//! Setup-time events (registration, compilation, mutator attachment) are
//! plain `tracing` events. Per-invocation spans are opt-in through
//! [`CompileOptions::instrument_steps`](crate::pipeline::CompileOptions).

mod spans;
mod subscriber;

pub(crate) use spans::instrument;
pub use subscriber::init_tracing;
