//! Type-state pipeline builder.
//!
//! [`PipelineBuilder`] starts a pipeline for input `I`. Each chained step
//! must accept the previous step's output, which the builder tracks in its
//! type parameters, so a mismatch does not compile. Configuration problems
//! that types cannot catch (bad or repeated names, repeated case keys) are
//! recorded as the chain grows and reported by the call that closes it.

use super::compiler::{chain_link, close_link, terminal_link, then_link, Compiler, StepSite};
use super::graph::{ChainLink, OpenPipeline, Pipeline, PipelineInfo, PipelineKind, TerminalLink};
use crate::errors::PipelineError;
use crate::mode::{Mode, Next};
use crate::space::Space;
use crate::steps::{
    CaseKey, Fork, Handler, If, IfElse, Linear, MultiFork, StepInfo, Switch,
};
use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// Returns an error if `name` is empty or whitespace-only.
pub(crate) fn validate_name(what: &'static str, name: &str) -> Result<(), PipelineError> {
    if name.trim().is_empty() {
        return Err(PipelineError::InvalidName {
            what,
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Steps recorded so far and the first configuration error seen.
struct StepLedger {
    pipeline: String,
    steps: Vec<StepInfo>,
    error: Option<PipelineError>,
}

impl StepLedger {
    fn new(pipeline: String) -> Self {
        let error = validate_name("pipeline", &pipeline).err();
        Self {
            pipeline,
            steps: Vec::new(),
            error,
        }
    }

    fn record(&mut self, info: StepInfo) -> StepSite {
        let site = StepSite::new(&self.pipeline, &info.name);
        if let Err(err) = validate_name("step", &info.name) {
            self.fail(err);
        } else if self.steps.iter().any(|step| step.name == info.name) {
            self.fail(PipelineError::DuplicateStep {
                pipeline: self.pipeline.clone(),
                step: info.name.clone(),
            });
        }
        self.steps.push(info);
        site
    }

    fn check_keys<K: CaseKey>(&mut self, step: &str, duplicate: Option<&K>) {
        if let Some(key) = duplicate {
            self.fail(PipelineError::DuplicateCaseKey {
                pipeline: self.pipeline.clone(),
                step: step.to_string(),
                key: format!("{key:?}"),
            });
        }
    }

    fn fail(&mut self, err: PipelineError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    fn close<M: Mode>(
        self,
        space: &Space<M>,
        kind: PipelineKind,
        input_type: &'static str,
        output_type: Option<&'static str>,
    ) -> Result<Arc<PipelineInfo>, PipelineError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        Ok(Arc::new(PipelineInfo {
            name: self.pipeline,
            kind,
            mode: M::NAME,
            input_type,
            output_type,
            steps: self.steps,
            space: space.id(),
        }))
    }
}

/// Starts a pipeline for input `I` in space `'s`.
///
/// Created by [`Space::create_pipeline`].
#[must_use = "a pipeline is only registered once the builder is closed"]
pub struct PipelineBuilder<'s, I, M: Mode> {
    space: &'s Space<M>,
    ledger: StepLedger,
    _input: PhantomData<fn(I)>,
}

impl<'s, I: 'static, M: Mode> PipelineBuilder<'s, I, M> {
    pub(crate) fn new(space: &'s Space<M>, name: String) -> Self {
        Self {
            space,
            ledger: StepLedger::new(name),
            _input: PhantomData,
        }
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.ledger.pipeline
    }

    /// Starts the chain with a linear step.
    pub fn start_with<U: 'static>(mut self, step: Linear<I, U, M>) -> ChainBuilder<'s, I, U, M> {
        let site = self.ledger.record(step.describe());
        let Linear { func, .. } = step;
        ChainBuilder {
            space: self.space,
            ledger: self.ledger,
            link: chain_link(move |compiler, next| compiler.link_linear(&site, &func, next)),
        }
    }

    /// Builds a single-step pipeline around a handler and registers it.
    pub fn handle_with(mut self, step: Handler<I, M>) -> Result<Pipeline<I, M>, PipelineError> {
        let site = self.ledger.record(step.describe());
        let Handler { func, .. } = step;
        let link = terminal_link(move |compiler| compiler.link_handler(&site, &func));
        register(self.space, self.ledger, link)
    }
}

/// A chain from `I` whose last step hands an `O` downstream.
#[must_use = "a pipeline is only registered once the builder is closed"]
pub struct ChainBuilder<'s, I, O, M: Mode> {
    space: &'s Space<M>,
    ledger: StepLedger,
    link: ChainLink<I, O, M>,
}

impl<'s, I: 'static, O: 'static, M: Mode> ChainBuilder<'s, I, O, M> {
    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.ledger.pipeline
    }

    /// Returns the number of steps added so far.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.ledger.steps.len()
    }

    /// Appends a linear step.
    pub fn then<U: 'static>(mut self, step: Linear<O, U, M>) -> ChainBuilder<'s, I, U, M> {
        let site = self.ledger.record(step.describe());
        let Linear { func, .. } = step;
        self.extend(move |compiler, next| {
            compiler.link_linear(&site, &func, next)
        })
    }

    /// Appends an If step; both of its paths continue at `N`.
    pub fn then_if<D: 'static, N: 'static>(
        mut self,
        step: If<O, D, N, M>,
    ) -> ChainBuilder<'s, I, N, M> {
        let site = self.ledger.record(step.describe());
        let If { divert, func, .. } = step;
        self.extend(move |compiler, next| {
            compiler.link_if(&site, &divert, &func, next)
        })
    }

    /// Appends an IfElse step; both branches rejoin at `N`.
    pub fn then_if_else<A: 'static, B: 'static, N: 'static>(
        mut self,
        step: IfElse<O, A, B, N, M>,
    ) -> ChainBuilder<'s, I, N, M> {
        let site = self.ledger.record(step.describe());
        let IfElse {
            on_true,
            on_false,
            func,
            ..
        } = step;
        self.extend(move |compiler, next| {
            compiler.link_if_else(&site, &on_true, &on_false, &func, next)
        })
    }

    /// Appends a Switch step; every case rejoins at `N`.
    pub fn then_switch<K: CaseKey, D: 'static, N: 'static>(
        mut self,
        step: Switch<O, K, D, N, M>,
    ) -> ChainBuilder<'s, I, N, M> {
        self.ledger.check_keys(&step.name, step.duplicate_key());
        let site = self.ledger.record(step.describe());
        let Switch {
            cases,
            default,
            func,
            ..
        } = step;
        self.extend(move |compiler, next| {
            compiler.link_switch(&site, &cases, &default, &func, next)
        })
    }

    /// Closes the chain with a handler and registers the pipeline.
    pub fn handle_with(mut self, step: Handler<O, M>) -> Result<Pipeline<I, M>, PipelineError> {
        let site = self.ledger.record(step.describe());
        let Handler { func, .. } = step;
        let link = close_link(self.link, move |compiler| compiler.link_handler(&site, &func));
        register(self.space, self.ledger, link)
    }

    /// Closes the chain with a Fork step and registers the pipeline.
    pub fn then_fork<A: 'static, B: 'static>(
        mut self,
        step: Fork<O, A, B, M>,
    ) -> Result<Pipeline<I, M>, PipelineError> {
        let site = self.ledger.record(step.describe());
        let Fork {
            left, right, func, ..
        } = step;
        let link = close_link(self.link, move |compiler| {
            compiler.link_fork(&site, &left, &right, &func)
        });
        register(self.space, self.ledger, link)
    }

    /// Closes the chain with a MultiFork step and registers the pipeline.
    pub fn then_multi_fork<K: CaseKey, D: 'static>(
        mut self,
        step: MultiFork<O, K, D, M>,
    ) -> Result<Pipeline<I, M>, PipelineError> {
        self.ledger.check_keys(&step.name, step.duplicate_key());
        let site = self.ledger.record(step.describe());
        let MultiFork {
            branches,
            default,
            func,
            ..
        } = step;
        let link = close_link(self.link, move |compiler| {
            compiler.link_multi_fork(&site, &branches, &default, &func)
        });
        register(self.space, self.ledger, link)
    }

    /// Closes the chain without a terminal and registers it as an open
    /// pipeline.
    pub fn build_open_pipeline(self) -> Result<OpenPipeline<I, O, M>, PipelineError> {
        let info = self.ledger.close(
            self.space,
            PipelineKind::Open,
            type_name::<I>(),
            Some(type_name::<O>()),
        )?;
        let pipeline = OpenPipeline {
            info,
            link: self.link,
        };
        self.space.register_open(pipeline.clone())?;
        debug!(
            pipeline = pipeline.name(),
            steps = pipeline.step_count(),
            "Registered open pipeline"
        );
        Ok(pipeline)
    }

    fn extend<U: 'static, F>(self, step: F) -> ChainBuilder<'s, I, U, M>
    where
        F: for<'c> Fn(&mut Compiler<'c, M>, Next<U, M>) -> Result<Next<O, M>, PipelineError>
            + Send
            + Sync
            + 'static,
    {
        ChainBuilder {
            space: self.space,
            ledger: self.ledger,
            link: then_link(self.link, step),
        }
    }
}

fn register<I: 'static, M: Mode>(
    space: &Space<M>,
    ledger: StepLedger,
    link: TerminalLink<I, M>,
) -> Result<Pipeline<I, M>, PipelineError> {
    let info = ledger.close(space, PipelineKind::Terminal, type_name::<I>(), None)?;
    let pipeline = Pipeline { info, link };
    space.register_pipeline(pipeline.clone())?;
    debug!(
        pipeline = pipeline.name(),
        steps = pipeline.step_count(),
        "Registered pipeline"
    );
    Ok(pipeline)
}

impl<I, M: Mode> fmt::Debug for PipelineBuilder<'_, I, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("name", &self.ledger.pipeline)
            .finish_non_exhaustive()
    }
}

impl<I, O, M: Mode> fmt::Debug for ChainBuilder<'_, I, O, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainBuilder")
            .field("name", &self.ledger.pipeline)
            .field("steps", &self.ledger.steps.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::Blocking;
    use crate::steps::{Branch, Cases, StepShape};
    use pretty_assertions::assert_eq;

    type M = Blocking<i32>;

    fn inc(name: &str) -> Linear<i32, i32, M> {
        Linear::new(name, |x: i32, (), next: Next<i32, M>| next(x + 1, ()))
    }

    fn out() -> Handler<i32, M> {
        Handler::new("out", |x: i32, ()| x)
    }

    #[test]
    fn test_build_registers_pipeline() {
        let space: Space<M> = Space::new();
        let builder = space.create_pipeline::<i32>("main").start_with(inc("a")).then(inc("b"));
        assert_eq!(builder.step_count(), 2);
        assert_eq!(builder.name(), "main");

        let pipeline = builder.handle_with(out()).unwrap();
        assert_eq!(pipeline.info().step_names(), vec!["a", "b", "out"]);
        assert_eq!(pipeline.info().kind, PipelineKind::Terminal);
        assert!(space.contains("main"));
    }

    #[test]
    fn test_handler_only_pipeline() {
        let space: Space<M> = Space::new();
        let pipeline = space.create_pipeline::<i32>("echo").handle_with(out()).unwrap();
        assert_eq!(pipeline.step_count(), 1);
        assert_eq!(space.compile(&pipeline, None).unwrap().call(9), 9);
    }

    #[test]
    fn test_type_changing_chain() {
        let space: Space<Blocking<String>> = Space::new();
        let pipeline = space
            .create_pipeline::<String>("lengths")
            .start_with(Linear::new(
                "len",
                |s: String, (), next: Next<usize, Blocking<String>>| next(s.len(), ()),
            ))
            .handle_with(Handler::new("show", |n: usize, ()| format!("len={n}")))
            .unwrap();

        let compiled = space.compile(&pipeline, None).unwrap();
        assert_eq!(compiled.call("abcd".to_string()), "len=4");
    }

    #[test]
    fn test_duplicate_step_name_reported_at_close() {
        let space: Space<M> = Space::new();
        let err = space
            .create_pipeline::<i32>("main")
            .start_with(inc("a"))
            .then(inc("a"))
            .handle_with(out())
            .unwrap_err();

        assert_eq!(
            err,
            PipelineError::DuplicateStep {
                pipeline: "main".to_string(),
                step: "a".to_string()
            }
        );
        assert!(!space.contains("main"));
    }

    #[test]
    fn test_invalid_names() {
        let space: Space<M> = Space::new();
        let err = space.create_pipeline::<i32>("  ").handle_with(out()).unwrap_err();
        assert_eq!(err.code(), "FLOW-001-INVALID_NAME");

        let err = space
            .create_pipeline::<i32>("main")
            .start_with(inc(""))
            .handle_with(out())
            .unwrap_err();
        assert_eq!(
            err,
            PipelineError::InvalidName {
                what: "step",
                name: String::new()
            }
        );
    }

    #[test]
    fn test_first_error_wins() {
        let space: Space<M> = Space::new();
        let err = space
            .create_pipeline::<i32>("main")
            .start_with(inc(""))
            .then(inc("b"))
            .then(inc("b"))
            .handle_with(out())
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidName { what: "step", .. }));
    }

    #[test]
    fn test_duplicate_pipeline_name() {
        let space: Space<M> = Space::new();
        space.create_pipeline::<i32>("main").handle_with(out()).unwrap();
        let err = space.create_pipeline::<i32>("main").handle_with(out()).unwrap_err();
        assert_eq!(
            err,
            PipelineError::DuplicatePipeline {
                name: "main".to_string()
            }
        );
    }

    #[test]
    fn test_open_and_terminal_names_share_namespace() {
        let space: Space<M> = Space::new();
        space
            .create_pipeline::<i32>("shared")
            .start_with(inc("a"))
            .build_open_pipeline()
            .unwrap();
        let err = space.create_pipeline::<i32>("shared").handle_with(out()).unwrap_err();
        assert!(matches!(err, PipelineError::DuplicatePipeline { .. }));
    }

    #[test]
    fn test_duplicate_switch_key() {
        let space: Space<M> = Space::new();
        let switch: Switch<i32, i32, i32, i32, M> = Switch::new(
            "route",
            Branch::named("other"),
            |x: i32, (), cases: Cases<i32, i32, M>, default: Next<i32, M>| {
                cases.select(&x, &default)(x, ())
            },
        )
        .case(1, Branch::named("one"))
        .case(1, Branch::named("uno"));

        let err = space
            .create_pipeline::<i32>("main")
            .start_with(inc("a"))
            .then_switch(switch)
            .handle_with(out())
            .unwrap_err();
        assert_eq!(
            err,
            PipelineError::DuplicateCaseKey {
                pipeline: "main".to_string(),
                step: "route".to_string(),
                key: "1".to_string()
            }
        );
    }

    #[test]
    fn test_open_pipeline_info() {
        let space: Space<M> = Space::new();
        let open = space
            .create_pipeline::<i32>("tail")
            .start_with(inc("a"))
            .build_open_pipeline()
            .unwrap();

        assert_eq!(open.info().kind, PipelineKind::Open);
        assert_eq!(open.info().output_type, Some("i32"));
        assert_eq!(open.info().steps[0].shape, StepShape::Linear);
        assert!(open.info().terminal().is_none());
    }
}
