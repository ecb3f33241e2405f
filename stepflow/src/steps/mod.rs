//! Step shapes.
//!
//! A step is a named function whose shape decides how it is wired into a
//! pipeline. Every shape takes its input and the mode's token, and every
//! continuation it receives is a [`Next`]. The `*Fn` aliases below are the
//! exact function types mutators wrap.

mod branch;
mod cases;
mod chain;
mod info;
mod shape;
mod terminal;

pub use branch::{Branch, BranchTarget};
pub use cases::{CaseKey, Cases};
pub use chain::{If, IfElse, Linear, Switch};
pub use info::{BranchInfo, BranchRole, BranchSource, StepInfo};
pub use shape::StepShape;
pub use terminal::{Fork, Handler, MultiFork};

use crate::mode::{Mode, Next};
use std::collections::HashSet;
use std::sync::Arc;

/// Core function of a Handler step.
pub type HandlerFn<T, M> = Next<T, M>;

/// Core function of a Linear step.
pub type LinearFn<T, U, M> =
    Arc<dyn Fn(T, <M as Mode>::Token, Next<U, M>) -> <M as Mode>::Outcome + Send + Sync>;

/// Core function of a step with two continuations (If, IfElse, Fork).
pub type BinaryFn<T, A, B, M> = Arc<
    dyn Fn(T, <M as Mode>::Token, Next<A, M>, Next<B, M>) -> <M as Mode>::Outcome + Send + Sync,
>;

/// Core function of a step with keyed continuations (Switch, MultiFork).
pub type KeyedFn<T, K, D, M> = Arc<
    dyn Fn(T, <M as Mode>::Token, Cases<K, D, M>, Next<D, M>) -> <M as Mode>::Outcome
        + Send
        + Sync,
>;

/// Core function of an If step: `(in, token, divert, next)`.
pub type IfFn<T, D, N, M> = BinaryFn<T, D, N, M>;
/// Core function of an IfElse step: `(in, token, on_true, on_false)`.
pub type IfElseFn<T, A, B, M> = BinaryFn<T, A, B, M>;
/// Core function of a Fork step: `(in, token, left, right)`.
pub type ForkFn<T, A, B, M> = BinaryFn<T, A, B, M>;
/// Core function of a Switch step: `(in, token, cases, default)`.
pub type SwitchFn<T, K, D, M> = KeyedFn<T, K, D, M>;
/// Core function of a MultiFork step: `(in, token, branches, default)`.
pub type MultiForkFn<T, K, D, M> = KeyedFn<T, K, D, M>;

/// Wraps a closure as a [`HandlerFn`].
pub fn handler_fn<T, M, F>(f: F) -> HandlerFn<T, M>
where
    M: Mode,
    F: Fn(T, M::Token) -> M::Outcome + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wraps a closure as a [`LinearFn`].
pub fn linear_fn<T, U, M, F>(f: F) -> LinearFn<T, U, M>
where
    M: Mode,
    F: Fn(T, M::Token, Next<U, M>) -> M::Outcome + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wraps a closure as a [`BinaryFn`].
pub fn binary_fn<T, A, B, M, F>(f: F) -> BinaryFn<T, A, B, M>
where
    M: Mode,
    F: Fn(T, M::Token, Next<A, M>, Next<B, M>) -> M::Outcome + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wraps a closure as a [`KeyedFn`].
pub fn keyed_fn<T, K, D, M, F>(f: F) -> KeyedFn<T, K, D, M>
where
    M: Mode,
    F: Fn(T, M::Token, Cases<K, D, M>, Next<D, M>) -> M::Outcome + Send + Sync + 'static,
{
    Arc::new(f)
}

fn first_duplicate<'a, K: CaseKey>(keys: impl IntoIterator<Item = &'a K>) -> Option<&'a K> {
    let mut seen = HashSet::new();
    keys.into_iter().find(|key| !seen.insert(*key))
}
