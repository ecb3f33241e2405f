//! Execution modes.
//!
//! A compiled pipeline is a chain of continuations. How each continuation
//! is invoked (synchronously or by returning a future, with or without a
//! cancellation token, returning a value or `()`) is captured by one
//! [`Mode`], and everything else in the crate is written once against it.
//!
//! | Mode | Token | Outcome |
//! |---|---|---|
//! | [`Blocking<R>`] | `()` | `R` |
//! | [`BlockingCancellable<R>`] | [`CancellationToken`] | `R` |
//! | [`Suspending<R>`] | `()` | `BoxFuture<'static, R>` |
//! | [`SuspendingCancellable<R>`] | [`CancellationToken`] | `BoxFuture<'static, R>` |
//!
//! Fire-and-forget pipelines use `R = ()`.

use crate::cancellation::CancellationToken;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{Instrument, Span};

/// How the steps of a pipeline are invoked.
pub trait Mode: Send + Sync + 'static {
    /// Value threaded through every step and continuation call.
    type Token: Clone + Send + Sync + 'static;
    /// What every step, continuation and compiled pipeline returns.
    type Outcome: Send + 'static;
    /// Short label used in logs and introspection.
    const NAME: &'static str;

    /// Keeps `span` attached to work the outcome still has to do.
    ///
    /// Blocking outcomes are finished values, so the default returns them
    /// unchanged.
    fn follow_span(outcome: Self::Outcome, _span: &Span) -> Self::Outcome {
        outcome
    }
}

/// A continuation: the compiled remainder of a pipeline for input `T`.
///
/// Step bodies receive their downstream as `Next` values and invoke them
/// like functions: `next(value, token)`.
pub type Next<T, M> = Arc<dyn Fn(T, <M as Mode>::Token) -> <M as Mode>::Outcome + Send + Sync>;

/// Wraps a closure as a [`Next`], giving it the mode's full signature.
pub fn next_fn<T, M, F>(f: F) -> Next<T, M>
where
    M: Mode,
    F: Fn(T, M::Token) -> M::Outcome + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Synchronous invocation without cancellation.
pub struct Blocking<R = ()>(PhantomData<fn() -> R>);

impl<R: Send + 'static> Mode for Blocking<R> {
    type Token = ();
    type Outcome = R;
    const NAME: &'static str = "blocking";
}

/// Synchronous invocation with a cooperative cancellation token.
pub struct BlockingCancellable<R = ()>(PhantomData<fn() -> R>);

impl<R: Send + 'static> Mode for BlockingCancellable<R> {
    type Token = CancellationToken;
    type Outcome = R;
    const NAME: &'static str = "blocking_cancellable";
}

/// Suspending invocation: every call returns a boxed future.
pub struct Suspending<R = ()>(PhantomData<fn() -> R>);

impl<R: Send + 'static> Mode for Suspending<R> {
    type Token = ();
    type Outcome = BoxFuture<'static, R>;
    const NAME: &'static str = "suspending";

    fn follow_span(outcome: Self::Outcome, span: &Span) -> Self::Outcome {
        outcome.instrument(span.clone()).boxed()
    }
}

/// Suspending invocation with a cooperative cancellation token.
pub struct SuspendingCancellable<R = ()>(PhantomData<fn() -> R>);

impl<R: Send + 'static> Mode for SuspendingCancellable<R> {
    type Token = CancellationToken;
    type Outcome = BoxFuture<'static, R>;
    const NAME: &'static str = "suspending_cancellable";

    fn follow_span(outcome: Self::Outcome, span: &Span) -> Self::Outcome {
        outcome.instrument(span.clone()).boxed()
    }
}
