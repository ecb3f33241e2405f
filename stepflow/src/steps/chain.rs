//! Steps that continue the main chain: Linear, If, IfElse and Switch.

use super::{
    first_duplicate, Branch, BranchRole, CaseKey, Cases, IfElseFn, IfFn, LinearFn, StepInfo,
    StepShape, SwitchFn,
};
use crate::mode::{Mode, Next};
use crate::pipeline::OpenPipeline;
use std::fmt;
use std::sync::Arc;

/// A step that transforms `T` and hands a `U` downstream.
///
/// The body may return without calling `next`; the rest of the pipeline
/// then does not run and the body's own outcome is the pipeline's outcome.
pub struct Linear<T, U, M: Mode> {
    pub(crate) name: String,
    pub(crate) func: LinearFn<T, U, M>,
}

impl<T: 'static, U: 'static, M: Mode> Linear<T, U, M> {
    /// Creates a linear step from a closure `(in, token, next) -> outcome`.
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(T, M::Token, Next<U, M>) -> M::Outcome + Send + Sync + 'static,
    {
        Self::from_fn(name, Arc::new(func))
    }

    /// Creates a linear step from an already shared function.
    pub fn from_fn(name: impl Into<String>, func: LinearFn<T, U, M>) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }

    /// Returns the step name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn describe(&self) -> StepInfo {
        StepInfo::new::<T, LinearFn<T, U, M>>(&self.name, StepShape::Linear, Vec::new())
    }
}

/// A step that either diverts into an open branch or continues the chain.
///
/// The divert branch is an open pipeline `D -> N`; when compiled its end is
/// bound to the same downstream as `next`, so both paths rejoin.
pub struct If<T, D, N, M: Mode> {
    pub(crate) name: String,
    pub(crate) divert: Branch<OpenPipeline<D, N, M>, M>,
    pub(crate) func: IfFn<T, D, N, M>,
}

impl<T: 'static, D: 'static, N: 'static, M: Mode> If<T, D, N, M> {
    /// Creates an If step from a closure `(in, token, divert, next) -> outcome`.
    pub fn new<F>(
        name: impl Into<String>,
        divert: Branch<OpenPipeline<D, N, M>, M>,
        func: F,
    ) -> Self
    where
        F: Fn(T, M::Token, Next<D, M>, Next<N, M>) -> M::Outcome + Send + Sync + 'static,
    {
        Self::from_fn(name, divert, Arc::new(func))
    }

    /// Creates an If step from an already shared function.
    pub fn from_fn(
        name: impl Into<String>,
        divert: Branch<OpenPipeline<D, N, M>, M>,
        func: IfFn<T, D, N, M>,
    ) -> Self {
        Self {
            name: name.into(),
            divert,
            func,
        }
    }

    /// Returns the step name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn describe(&self) -> StepInfo {
        StepInfo::new::<T, IfFn<T, D, N, M>>(
            &self.name,
            StepShape::If,
            vec![self.divert.info(BranchRole::Divert, None)],
        )
    }
}

/// A step that picks one of two open branches, both rejoining at `N`.
pub struct IfElse<T, A, B, N, M: Mode> {
    pub(crate) name: String,
    pub(crate) on_true: Branch<OpenPipeline<A, N, M>, M>,
    pub(crate) on_false: Branch<OpenPipeline<B, N, M>, M>,
    pub(crate) func: IfElseFn<T, A, B, M>,
}

impl<T: 'static, A: 'static, B: 'static, N: 'static, M: Mode> IfElse<T, A, B, N, M> {
    /// Creates an IfElse step from a closure `(in, token, on_true, on_false) -> outcome`.
    pub fn new<F>(
        name: impl Into<String>,
        on_true: Branch<OpenPipeline<A, N, M>, M>,
        on_false: Branch<OpenPipeline<B, N, M>, M>,
        func: F,
    ) -> Self
    where
        F: Fn(T, M::Token, Next<A, M>, Next<B, M>) -> M::Outcome + Send + Sync + 'static,
    {
        Self::from_fn(name, on_true, on_false, Arc::new(func))
    }

    /// Creates an IfElse step from an already shared function.
    pub fn from_fn(
        name: impl Into<String>,
        on_true: Branch<OpenPipeline<A, N, M>, M>,
        on_false: Branch<OpenPipeline<B, N, M>, M>,
        func: IfElseFn<T, A, B, M>,
    ) -> Self {
        Self {
            name: name.into(),
            on_true,
            on_false,
            func,
        }
    }

    /// Returns the step name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn describe(&self) -> StepInfo {
        StepInfo::new::<T, IfElseFn<T, A, B, M>>(
            &self.name,
            StepShape::IfElse,
            vec![
                self.on_true.info(BranchRole::OnTrue, None),
                self.on_false.info(BranchRole::OnFalse, None),
            ],
        )
    }
}

/// A step that routes to one of N keyed open branches or a default.
///
/// Every branch, the default included, is an open pipeline `D -> N` that
/// rejoins the main chain.
pub struct Switch<T, K, D, N, M: Mode> {
    pub(crate) name: String,
    pub(crate) cases: Vec<(K, Branch<OpenPipeline<D, N, M>, M>)>,
    pub(crate) default: Branch<OpenPipeline<D, N, M>, M>,
    pub(crate) func: SwitchFn<T, K, D, M>,
}

impl<T: 'static, K: CaseKey, D: 'static, N: 'static, M: Mode> Switch<T, K, D, N, M> {
    /// Creates a Switch step from a closure `(in, token, cases, default) -> outcome`.
    ///
    /// Cases are added with [`Switch::case`].
    pub fn new<F>(
        name: impl Into<String>,
        default: Branch<OpenPipeline<D, N, M>, M>,
        func: F,
    ) -> Self
    where
        F: Fn(T, M::Token, Cases<K, D, M>, Next<D, M>) -> M::Outcome + Send + Sync + 'static,
    {
        Self::from_fn(name, default, Arc::new(func))
    }

    /// Creates a Switch step from an already shared function.
    pub fn from_fn(
        name: impl Into<String>,
        default: Branch<OpenPipeline<D, N, M>, M>,
        func: SwitchFn<T, K, D, M>,
    ) -> Self {
        Self {
            name: name.into(),
            cases: Vec::new(),
            default,
            func,
        }
    }

    /// Adds a keyed branch.
    #[must_use]
    pub fn case(mut self, key: K, branch: Branch<OpenPipeline<D, N, M>, M>) -> Self {
        self.cases.push((key, branch));
        self
    }

    /// Returns the step name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of keyed branches, not counting the default.
    #[must_use]
    pub fn case_count(&self) -> usize {
        self.cases.len()
    }

    pub(crate) fn duplicate_key(&self) -> Option<&K> {
        first_duplicate(self.cases.iter().map(|(key, _)| key))
    }

    pub(crate) fn describe(&self) -> StepInfo {
        let mut branches: Vec<_> = self
            .cases
            .iter()
            .map(|(key, branch)| branch.info(BranchRole::Case, Some(format!("{key:?}"))))
            .collect();
        branches.push(self.default.info(BranchRole::Default, None));
        StepInfo::new::<T, SwitchFn<T, K, D, M>>(&self.name, StepShape::Switch, branches)
    }
}

impl<T, U, M: Mode> fmt::Debug for Linear<T, U, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Linear").field("name", &self.name).finish_non_exhaustive()
    }
}

impl<T, D, N, M: Mode> fmt::Debug for If<T, D, N, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("If")
            .field("name", &self.name)
            .field("divert", &self.divert)
            .finish_non_exhaustive()
    }
}

impl<T, A, B, N, M: Mode> fmt::Debug for IfElse<T, A, B, N, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IfElse")
            .field("name", &self.name)
            .field("on_true", &self.on_true)
            .field("on_false", &self.on_false)
            .finish_non_exhaustive()
    }
}

impl<T, K: fmt::Debug, D, N, M: Mode> fmt::Debug for Switch<T, K, D, N, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Switch")
            .field("name", &self.name)
            .field("cases", &self.cases)
            .field("default", &self.default)
            .finish_non_exhaustive()
    }
}
