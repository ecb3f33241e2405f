//! Per-step tracing spans.

use crate::mode::{next_fn, Mode, Next};
use crate::pipeline::StepSite;
use crate::steps::StepShape;
use tracing::trace_span;

/// Wraps a bound step so each call runs inside a `step` span.
///
/// For suspending modes the span also follows the returned future.
pub(crate) fn instrument<T: 'static, M: Mode>(
    site: StepSite,
    shape: StepShape,
    next: Next<T, M>,
) -> Next<T, M> {
    next_fn::<T, M, _>(move |input, token| {
        let span = trace_span!(
            "step",
            pipeline = %site.pipeline,
            step = %site.step,
            shape = shape.as_str(),
            mode = M::NAME,
        );
        let outcome = span.in_scope(|| next(input, token));
        M::follow_span(outcome, &span)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::{Blocking, Suspending};
    use futures::FutureExt;

    #[test]
    fn test_instrumented_blocking_step() {
        crate::testing::init_test_tracing();
        let inner = next_fn::<i32, Blocking<i32>, _>(|x: i32, ()| x + 1);
        let site = StepSite::new("main", "inc");
        let wrapped = instrument::<i32, Blocking<i32>>(site, StepShape::Linear, inner);
        assert_eq!(wrapped(1, ()), 2);
    }

    #[test]
    fn test_instrumented_suspending_step() {
        crate::testing::init_test_tracing();
        let inner =
            next_fn::<i32, Suspending<i32>, _>(|x: i32, ()| async move { x * 3 }.boxed());
        let site = StepSite::new("main", "triple");
        let wrapped = instrument::<i32, Suspending<i32>>(site, StepShape::Handler, inner);
        assert_eq!(tokio_test::block_on(wrapped(2, ())), 6);
    }
}
