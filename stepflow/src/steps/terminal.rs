//! Steps that end a pipeline: Handler, Fork and MultiFork.

use super::{
    first_duplicate, Branch, BranchRole, CaseKey, Cases, ForkFn, HandlerFn, MultiForkFn, StepInfo,
    StepShape,
};
use crate::mode::{Mode, Next};
use crate::pipeline::Pipeline;
use std::fmt;
use std::sync::Arc;

/// The terminal step: consumes its input and produces the outcome.
pub struct Handler<T, M: Mode> {
    pub(crate) name: String,
    pub(crate) func: HandlerFn<T, M>,
}

impl<T: 'static, M: Mode> Handler<T, M> {
    /// Creates a handler from a closure `(in, token) -> outcome`.
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(T, M::Token) -> M::Outcome + Send + Sync + 'static,
    {
        Self::from_fn(name, Arc::new(func))
    }

    /// Creates a handler from an already shared function.
    pub fn from_fn(name: impl Into<String>, func: HandlerFn<T, M>) -> Self {
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
        StepInfo::new::<T, HandlerFn<T, M>>(&self.name, StepShape::Handler, Vec::new())
    }
}

/// A terminal step that hands its input to one of two complete pipelines.
///
/// Neither branch rejoins; each is compiled with its own terminal.
pub struct Fork<T, A, B, M: Mode> {
    pub(crate) name: String,
    pub(crate) left: Branch<Pipeline<A, M>, M>,
    pub(crate) right: Branch<Pipeline<B, M>, M>,
    pub(crate) func: ForkFn<T, A, B, M>,
}

impl<T: 'static, A: 'static, B: 'static, M: Mode> Fork<T, A, B, M> {
    /// Creates a Fork step from a closure `(in, token, left, right) -> outcome`.
    pub fn new<F>(
        name: impl Into<String>,
        left: Branch<Pipeline<A, M>, M>,
        right: Branch<Pipeline<B, M>, M>,
        func: F,
    ) -> Self
    where
        F: Fn(T, M::Token, Next<A, M>, Next<B, M>) -> M::Outcome + Send + Sync + 'static,
    {
        Self::from_fn(name, left, right, Arc::new(func))
    }

    /// Creates a Fork step from an already shared function.
    pub fn from_fn(
        name: impl Into<String>,
        left: Branch<Pipeline<A, M>, M>,
        right: Branch<Pipeline<B, M>, M>,
        func: ForkFn<T, A, B, M>,
    ) -> Self {
        Self {
            name: name.into(),
            left,
            right,
            func,
        }
    }

    /// Returns the step name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn describe(&self) -> StepInfo {
        StepInfo::new::<T, ForkFn<T, A, B, M>>(
            &self.name,
            StepShape::Fork,
            vec![
                self.left.info(BranchRole::Left, None),
                self.right.info(BranchRole::Right, None),
            ],
        )
    }
}

/// A terminal step that hands its input to one of N keyed complete
/// pipelines or a default one.
pub struct MultiFork<T, K, D, M: Mode> {
    pub(crate) name: String,
    pub(crate) branches: Vec<(K, Branch<Pipeline<D, M>, M>)>,
    pub(crate) default: Branch<Pipeline<D, M>, M>,
    pub(crate) func: MultiForkFn<T, K, D, M>,
}

impl<T: 'static, K: CaseKey, D: 'static, M: Mode> MultiFork<T, K, D, M> {
    /// Creates a MultiFork step from a closure `(in, token, branches, default) -> outcome`.
    ///
    /// Keyed branches are added with [`MultiFork::case`].
    pub fn new<F>(name: impl Into<String>, default: Branch<Pipeline<D, M>, M>, func: F) -> Self
    where
        F: Fn(T, M::Token, Cases<K, D, M>, Next<D, M>) -> M::Outcome + Send + Sync + 'static,
    {
        Self::from_fn(name, default, Arc::new(func))
    }

    /// Creates a MultiFork step from an already shared function.
    pub fn from_fn(
        name: impl Into<String>,
        default: Branch<Pipeline<D, M>, M>,
        func: MultiForkFn<T, K, D, M>,
    ) -> Self {
        Self {
            name: name.into(),
            branches: Vec::new(),
            default,
            func,
        }
    }

    /// Adds a keyed branch.
    #[must_use]
    pub fn case(mut self, key: K, branch: Branch<Pipeline<D, M>, M>) -> Self {
        self.branches.push((key, branch));
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
        self.branches.len()
    }

    pub(crate) fn duplicate_key(&self) -> Option<&K> {
        first_duplicate(self.branches.iter().map(|(key, _)| key))
    }

    pub(crate) fn describe(&self) -> StepInfo {
        let mut branches: Vec<_> = self
            .branches
            .iter()
            .map(|(key, branch)| branch.info(BranchRole::Case, Some(format!("{key:?}"))))
            .collect();
        branches.push(self.default.info(BranchRole::Default, None));
        StepInfo::new::<T, MultiForkFn<T, K, D, M>>(&self.name, StepShape::MultiFork, branches)
    }
}

impl<T, M: Mode> fmt::Debug for Handler<T, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler").field("name", &self.name).finish_non_exhaustive()
    }
}

impl<T, A, B, M: Mode> fmt::Debug for Fork<T, A, B, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fork")
            .field("name", &self.name)
            .field("left", &self.left)
            .field("right", &self.right)
            .finish_non_exhaustive()
    }
}

impl<T, K: fmt::Debug, D, M: Mode> fmt::Debug for MultiFork<T, K, D, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiFork")
            .field("name", &self.name)
            .field("branches", &self.branches)
            .field("default", &self.default)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::Blocking;
    use crate::steps::BranchSource;

    type M = Blocking<String>;

    #[test]
    fn test_handler_describe() {
        let step: Handler<i32, M> = Handler::new("print", |x: i32, ()| x.to_string());
        let info = step.describe();

        assert_eq!(step.name(), "print");
        assert_eq!(info.shape, StepShape::Handler);
        assert!(info.has_signature::<HandlerFn<i32, M>>());
        assert_eq!(info.input_type, "i32");
    }

    #[test]
    fn test_fork_branches() {
        let step: Fork<i32, i32, String, M> = Fork::new(
            "split",
            Branch::named("numbers"),
            Branch::inline(|_space| unreachable!("not resolved in this test")),
            |x: i32, (), left: Next<i32, M>, right: Next<String, M>| {
                if x > 0 {
                    left(x, ())
                } else {
                    right(x.to_string(), ())
                }
            },
        );

        let info = step.describe();
        assert_eq!(info.shape, StepShape::Fork);
        assert_eq!(info.branches[0].role, BranchRole::Left);
        assert_eq!(info.branches[1].source, BranchSource::Inline);
    }

    #[test]
    fn test_multi_fork_duplicate_key() {
        let step: MultiFork<u8, u8, u8, M> = MultiFork::new(
            "fan",
            Branch::named("fallback"),
            |x: u8, (), branches: Cases<u8, u8, M>, default: Next<u8, M>| {
                branches.select(&x, &default)(x, ())
            },
        )
        .case(1, Branch::named("one"))
        .case(2, Branch::named("two"));

        assert_eq!(step.duplicate_key(), None);
        assert_eq!(step.describe().branches.len(), 3);

        let step = step.case(1, Branch::named("uno"));
        assert_eq!(step.duplicate_key(), Some(&1));
    }
}
