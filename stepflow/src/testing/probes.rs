//! Probe mutators.
//!
//! A probe records its label in a [`CallLog`] every time its step runs and
//! then delegates to the wrapped function unchanged.

use super::CallLog;
use crate::mode::Mode;
use crate::mutation::Mutator;
use crate::steps::{handler_fn, linear_fn, HandlerFn, LinearFn};
use std::sync::Arc;

/// Records `label` on each call of a Handler step.
pub fn probe_handler<T: 'static, M: Mode>(
    log: &CallLog,
    label: impl Into<String>,
) -> Mutator<HandlerFn<T, M>> {
    let label: Arc<str> = Arc::from(label.into());
    let log = log.clone();
    Mutator::new(format!("probe:{label}"), move |core: HandlerFn<T, M>| {
        let label = Arc::clone(&label);
        let log = log.clone();
        handler_fn::<T, M, _>(move |input, token| {
            log.record(label.as_ref());
            core(input, token)
        })
    })
}

/// Records `label` on each call of a Linear step.
pub fn probe_linear<T: 'static, U: 'static, M: Mode>(
    log: &CallLog,
    label: impl Into<String>,
) -> Mutator<LinearFn<T, U, M>> {
    let label: Arc<str> = Arc::from(label.into());
    let log = log.clone();
    Mutator::new(format!("probe:{label}"), move |core: LinearFn<T, U, M>| {
        let label = Arc::clone(&label);
        let log = log.clone();
        linear_fn::<T, U, M, _>(move |input, token, next| {
            log.record(label.as_ref());
            core(input, token, next)
        })
    })
}
