//! Pipeline compiler.
//!
//! Compilation binds each step's effective function (its core function
//! with the step's mutators applied) to its compiled downstream, starting
//! from the terminal and walking back to the first step. Branch pipelines
//! are resolved and compiled at this point: open branches are handed the
//! remaining chain as their continuation, terminal branches are compiled on
//! their own. The result is a single [`CompiledPipeline`].

use super::graph::{ChainLink, OpenPipeline, Pipeline, TerminalLink};
use crate::errors::PipelineError;
use crate::mode::{next_fn, Mode, Next};
use crate::mutation::Mutators;
use crate::observability::instrument;
use crate::space::Space;
use crate::steps::{
    Branch, BranchTarget, CaseKey, Cases, ForkFn, HandlerFn, IfElseFn, IfFn, LinearFn,
    MultiForkFn, StepShape, SwitchFn,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Options applied while compiling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Wrap every bound step in a `trace`-level span.
    pub instrument_steps: bool,
}

impl CompileOptions {
    /// Creates default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether bound steps are wrapped in tracing spans.
    #[must_use]
    pub fn with_instrument_steps(mut self, instrument_steps: bool) -> Self {
        self.instrument_steps = instrument_steps;
        self
    }
}

/// Address of a step: owning pipeline and step name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct StepSite {
    pub(crate) pipeline: Arc<str>,
    pub(crate) step: Arc<str>,
}

impl StepSite {
    pub(crate) fn new(pipeline: &str, step: &str) -> Self {
        Self {
            pipeline: Arc::from(pipeline),
            step: Arc::from(step),
        }
    }
}

impl fmt::Display for StepSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.pipeline, self.step)
    }
}

/// A compiled pipeline: one function from input to outcome.
///
/// Holds no framework-owned mutable state, so it can be cloned and invoked
/// concurrently.
pub struct CompiledPipeline<I, M: Mode> {
    name: Arc<str>,
    entry: Next<I, M>,
}

impl<I, M: Mode> CompiledPipeline<I, M> {
    /// Returns the name of the compiled pipeline.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the pipeline.
    pub fn invoke(&self, input: I, token: M::Token) -> M::Outcome {
        (self.entry)(input, token)
    }

    /// Returns the entry continuation.
    #[must_use]
    pub fn as_next(&self) -> Next<I, M> {
        Arc::clone(&self.entry)
    }
}

impl<I, M: Mode<Token = ()>> CompiledPipeline<I, M> {
    /// Runs the pipeline in a mode without a token.
    pub fn call(&self, input: I) -> M::Outcome {
        (self.entry)(input, ())
    }
}

impl<I, M: Mode> Clone for CompiledPipeline<I, M> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            entry: Arc::clone(&self.entry),
        }
    }
}

impl<I, M: Mode> fmt::Debug for CompiledPipeline<I, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledPipeline")
            .field("name", &self.name)
            .field("mode", &M::NAME)
            .finish_non_exhaustive()
    }
}

/// State of one compilation run.
pub(crate) struct Compiler<'c, M: Mode> {
    space: &'c Space<M>,
    mutators: Option<&'c Mutators>,
    options: CompileOptions,
    stack: Vec<String>,
}

impl<'c, M: Mode> Compiler<'c, M> {
    pub(crate) fn new(
        space: &'c Space<M>,
        mutators: Option<&'c Mutators>,
        options: CompileOptions,
    ) -> Self {
        Self {
            space,
            mutators,
            options,
            stack: Vec::new(),
        }
    }

    /// Compiles a terminal pipeline and wraps it.
    pub(crate) fn compile_pipeline<I: 'static>(
        mut self,
        pipeline: &Pipeline<I, M>,
    ) -> Result<CompiledPipeline<I, M>, PipelineError> {
        let entry = self.compile(pipeline)?;
        debug!(
            pipeline = pipeline.name(),
            mode = M::NAME,
            steps = pipeline.step_count(),
            "Compiled pipeline"
        );
        Ok(CompiledPipeline {
            name: Arc::from(pipeline.name()),
            entry,
        })
    }

    fn compile<I>(&mut self, pipeline: &Pipeline<I, M>) -> Result<Next<I, M>, PipelineError> {
        self.enter(pipeline.name())?;
        let result = (pipeline.link)(self);
        self.stack.pop();
        result
    }

    fn compile_open<I, O>(
        &mut self,
        pipeline: &OpenPipeline<I, O, M>,
        next: Next<O, M>,
    ) -> Result<Next<I, M>, PipelineError> {
        self.enter(pipeline.name())?;
        let result = (pipeline.link)(self, next);
        self.stack.pop();
        result
    }

    fn enter(&mut self, name: &str) -> Result<(), PipelineError> {
        if let Some(start) = self.stack.iter().position(|entered| entered == name) {
            let mut path = self.stack[start..].to_vec();
            path.push(name.to_string());
            return Err(PipelineError::CycleDetected { path });
        }
        self.stack.push(name.to_string());
        Ok(())
    }

    fn resolve<P: BranchTarget<M>>(
        &self,
        branch: &Branch<P, M>,
        site: &StepSite,
    ) -> Result<P, PipelineError> {
        branch.resolve(self.space, &site.to_string())
    }

    fn effective<F>(&self, site: &StepSite, core: &F) -> Result<F, PipelineError>
    where
        F: Clone + Send + Sync + 'static,
    {
        match self.mutators {
            Some(mutators) => mutators.apply(&site.pipeline, &site.step, core.clone()),
            None => Ok(core.clone()),
        }
    }

    fn finish<T: 'static>(
        &self,
        site: &StepSite,
        shape: StepShape,
        bound: Next<T, M>,
    ) -> Next<T, M> {
        trace!(pipeline = %site.pipeline, step = %site.step, shape = %shape, "Bound step");
        if self.options.instrument_steps {
            instrument::<T, M>(site.clone(), shape, bound)
        } else {
            bound
        }
    }

    pub(crate) fn link_handler<T: 'static>(
        &mut self,
        site: &StepSite,
        func: &HandlerFn<T, M>,
    ) -> Result<Next<T, M>, PipelineError> {
        let bound: Next<T, M> = self.effective(site, func)?;
        Ok(self.finish(site, StepShape::Handler, bound))
    }

    pub(crate) fn link_linear<T: 'static, U: 'static>(
        &mut self,
        site: &StepSite,
        func: &LinearFn<T, U, M>,
        next: Next<U, M>,
    ) -> Result<Next<T, M>, PipelineError> {
        let effective = self.effective(site, func)?;
        let bound =
            next_fn::<T, M, _>(move |input, token| effective(input, token, Arc::clone(&next)));
        Ok(self.finish(site, StepShape::Linear, bound))
    }

    pub(crate) fn link_if<T: 'static, D: 'static, N: 'static>(
        &mut self,
        site: &StepSite,
        divert: &Branch<OpenPipeline<D, N, M>, M>,
        func: &IfFn<T, D, N, M>,
        next: Next<N, M>,
    ) -> Result<Next<T, M>, PipelineError> {
        let divert = self.resolve(divert, site)?;
        let divert = self.compile_open(&divert, Arc::clone(&next))?;
        let effective = self.effective(site, func)?;
        let bound = next_fn::<T, M, _>(move |input, token| {
            effective(input, token, Arc::clone(&divert), Arc::clone(&next))
        });
        Ok(self.finish(site, StepShape::If, bound))
    }

    pub(crate) fn link_if_else<T: 'static, A: 'static, B: 'static, N: 'static>(
        &mut self,
        site: &StepSite,
        on_true: &Branch<OpenPipeline<A, N, M>, M>,
        on_false: &Branch<OpenPipeline<B, N, M>, M>,
        func: &IfElseFn<T, A, B, M>,
        next: Next<N, M>,
    ) -> Result<Next<T, M>, PipelineError> {
        let on_true = self.resolve(on_true, site)?;
        let on_true = self.compile_open(&on_true, Arc::clone(&next))?;
        let on_false = self.resolve(on_false, site)?;
        let on_false = self.compile_open(&on_false, next)?;
        let effective = self.effective(site, func)?;
        let bound = next_fn::<T, M, _>(move |input, token| {
            effective(input, token, Arc::clone(&on_true), Arc::clone(&on_false))
        });
        Ok(self.finish(site, StepShape::IfElse, bound))
    }

    pub(crate) fn link_switch<T: 'static, K: CaseKey, D: 'static, N: 'static>(
        &mut self,
        site: &StepSite,
        cases: &[(K, Branch<OpenPipeline<D, N, M>, M>)],
        default: &Branch<OpenPipeline<D, N, M>, M>,
        func: &SwitchFn<T, K, D, M>,
        next: Next<N, M>,
    ) -> Result<Next<T, M>, PipelineError> {
        let mut compiled = Vec::with_capacity(cases.len());
        for (key, branch) in cases {
            let branch = self.resolve(branch, site)?;
            compiled.push((key.clone(), self.compile_open(&branch, Arc::clone(&next))?));
        }
        let cases = Cases::new(compiled);
        let default = self.resolve(default, site)?;
        let default = self.compile_open(&default, next)?;
        let effective = self.effective(site, func)?;
        let bound = next_fn::<T, M, _>(move |input, token| {
            effective(input, token, cases.clone(), Arc::clone(&default))
        });
        Ok(self.finish(site, StepShape::Switch, bound))
    }

    pub(crate) fn link_fork<T: 'static, A: 'static, B: 'static>(
        &mut self,
        site: &StepSite,
        left: &Branch<Pipeline<A, M>, M>,
        right: &Branch<Pipeline<B, M>, M>,
        func: &ForkFn<T, A, B, M>,
    ) -> Result<Next<T, M>, PipelineError> {
        let left = self.resolve(left, site)?;
        let left = self.compile(&left)?;
        let right = self.resolve(right, site)?;
        let right = self.compile(&right)?;
        let effective = self.effective(site, func)?;
        let bound = next_fn::<T, M, _>(move |input, token| {
            effective(input, token, Arc::clone(&left), Arc::clone(&right))
        });
        Ok(self.finish(site, StepShape::Fork, bound))
    }

    pub(crate) fn link_multi_fork<T: 'static, K: CaseKey, D: 'static>(
        &mut self,
        site: &StepSite,
        branches: &[(K, Branch<Pipeline<D, M>, M>)],
        default: &Branch<Pipeline<D, M>, M>,
        func: &MultiForkFn<T, K, D, M>,
    ) -> Result<Next<T, M>, PipelineError> {
        let mut compiled = Vec::with_capacity(branches.len());
        for (key, branch) in branches {
            let branch = self.resolve(branch, site)?;
            compiled.push((key.clone(), self.compile(&branch)?));
        }
        let branches = Cases::new(compiled);
        let default = self.resolve(default, site)?;
        let default = self.compile(&default)?;
        let effective = self.effective(site, func)?;
        let bound = next_fn::<T, M, _>(move |input, token| {
            effective(input, token, branches.clone(), Arc::clone(&default))
        });
        Ok(self.finish(site, StepShape::MultiFork, bound))
    }
}

/// Wraps a closure as the first link of a chain.
pub(crate) fn chain_link<I, O, M, F>(f: F) -> ChainLink<I, O, M>
where
    M: Mode,
    F: for<'c> Fn(&mut Compiler<'c, M>, Next<O, M>) -> Result<Next<I, M>, PipelineError>
        + Send
        + Sync
        + 'static,
{
    Arc::new(f)
}

/// Wraps a closure as a terminal link.
pub(crate) fn terminal_link<I, M, F>(f: F) -> TerminalLink<I, M>
where
    M: Mode,
    F: for<'c> Fn(&mut Compiler<'c, M>) -> Result<Next<I, M>, PipelineError>
        + Send
        + Sync
        + 'static,
{
    Arc::new(f)
}

/// Extends `prev` with a step that feeds `U` downstream.
///
/// The step is bound first, then handed to `prev` as its continuation.
pub(crate) fn then_link<I, O, U, M, F>(prev: ChainLink<I, O, M>, step: F) -> ChainLink<I, U, M>
where
    I: 'static,
    O: 'static,
    U: 'static,
    M: Mode,
    F: for<'c> Fn(&mut Compiler<'c, M>, Next<U, M>) -> Result<Next<O, M>, PipelineError>
        + Send
        + Sync
        + 'static,
{
    chain_link(move |compiler, next| {
        let bound = step(compiler, next)?;
        prev(compiler, bound)
    })
}

/// Closes `prev` with a terminal step.
pub(crate) fn close_link<I, O, M, F>(prev: ChainLink<I, O, M>, terminal: F) -> TerminalLink<I, M>
where
    I: 'static,
    O: 'static,
    M: Mode,
    F: for<'c> Fn(&mut Compiler<'c, M>) -> Result<Next<O, M>, PipelineError>
        + Send
        + Sync
        + 'static,
{
    terminal_link(move |compiler| {
        let bound = terminal(compiler)?;
        prev(compiler, bound)
    })
}
