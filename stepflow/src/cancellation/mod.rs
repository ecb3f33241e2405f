//! Cooperative cancellation for the cancellable execution modes.
//!
//! A [`CancellationToken`] is threaded through every step and continuation
//! of a pipeline compiled for
//! [`BlockingCancellable`](crate::mode::BlockingCancellable) or
//! [`SuspendingCancellable`](crate::mode::SuspendingCancellable).

mod token;

pub use token::{CancelCallback, CancellationToken};
