//! Pipeline registry.
//!
//! A [`Space`] holds every pipeline built for one execution mode, keyed by
//! name. Branch references are resolved against it by name when a pipeline
//! is compiled, and steps are looked up in it before mutators are attached.
//!
//! The first `compile` or `prepare` freezes the space. From then on only
//! inline branches materialised by a compilation run may register.

use crate::errors::PipelineError;
use crate::mode::Mode;
use crate::mutation::{Mutators, StepHandle};
use crate::pipeline::{
    signature, validate_name, CompileOptions, CompiledPipeline, Compiler, OpenPipeline, Pipeline,
    PipelineBuilder, PipelineInfo, PipelineKind,
};
use crate::steps::{
    CaseKey, ForkFn, HandlerFn, IfElseFn, IfFn, LinearFn, MultiForkFn, StepShape, SwitchFn,
};
use parking_lot::RwLock;
use std::any::{type_name, Any};
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

static NEXT_SPACE_ID: AtomicU64 = AtomicU64::new(1);

struct Entry {
    info: Arc<PipelineInfo>,
    pipeline: Arc<dyn Any + Send + Sync>,
}

#[derive(Default)]
struct Registry {
    pipelines: BTreeMap<String, Entry>,
    open_pipelines: BTreeMap<String, Entry>,
}

impl Registry {
    fn info(&self, name: &str) -> Option<Arc<PipelineInfo>> {
        self.pipelines
            .get(name)
            .or_else(|| self.open_pipelines.get(name))
            .map(|entry| Arc::clone(&entry.info))
    }

    fn not_found(&self, name: &str, expected: PipelineKind) -> PipelineError {
        match self.info(name) {
            Some(info) => PipelineError::WrongPipelineKind {
                name: name.to_string(),
                expected,
                actual: info.kind,
            },
            None => PipelineError::MissingPipeline {
                name: name.to_string(),
                referenced_by: None,
            },
        }
    }

    fn insert(&mut self, entry: Entry) -> Result<(), PipelineError> {
        let name = entry.info.name.clone();
        validate_name("pipeline", &name)?;
        if self.pipelines.contains_key(&name) || self.open_pipelines.contains_key(&name) {
            return Err(PipelineError::DuplicatePipeline { name });
        }
        match entry.info.kind {
            PipelineKind::Terminal => self.pipelines.insert(name, entry),
            PipelineKind::Open => self.open_pipelines.insert(name, entry),
        };
        Ok(())
    }
}

/// Registry of the pipelines of one execution mode.
///
/// Pipeline names are unique across terminal and open pipelines, so a
/// `(pipeline, step)` pair addresses exactly one step.
pub struct Space<M: Mode> {
    id: u64,
    registry: RwLock<Registry>,
    options: CompileOptions,
    frozen: AtomicBool,
    inline_builds: AtomicUsize,
    _mode: PhantomData<fn() -> M>,
}

/// Marks an inline branch build in progress; registration stays open
/// until it is dropped.
struct InlineBuild<'a>(&'a AtomicUsize);

impl<'a> InlineBuild<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InlineBuild<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl<M: Mode> Space<M> {
    /// Creates an empty space with default compile options.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(CompileOptions::default())
    }

    /// Creates an empty space that compiles with `options`.
    #[must_use]
    pub fn with_options(options: CompileOptions) -> Self {
        Self {
            id: NEXT_SPACE_ID.fetch_add(1, Ordering::Relaxed),
            registry: RwLock::new(Registry::default()),
            options,
            frozen: AtomicBool::new(false),
            inline_builds: AtomicUsize::new(0),
            _mode: PhantomData,
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Returns true once a compilation has started in this space.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::SeqCst)
    }

    /// Returns the compile options used by [`Space::compile`].
    #[must_use]
    pub fn options(&self) -> CompileOptions {
        self.options
    }

    /// Starts building a pipeline for input `I`.
    ///
    /// Closing the builder fails with [`PipelineError::SpaceFrozen`] once
    /// the space is frozen, unless it runs inside an inline branch factory.
    pub fn create_pipeline<I: 'static>(
        &self,
        name: impl Into<String>,
    ) -> PipelineBuilder<'_, I, M> {
        PipelineBuilder::new(self, name.into())
    }

    /// Returns the terminal pipeline registered under `name`.
    pub fn get_pipeline<I: 'static>(&self, name: &str) -> Result<Pipeline<I, M>, PipelineError> {
        let registry = self.registry.read();
        let Some(entry) = registry.pipelines.get(name) else {
            return Err(registry.not_found(name, PipelineKind::Terminal));
        };
        entry
            .pipeline
            .downcast_ref::<Pipeline<I, M>>()
            .cloned()
            .ok_or_else(|| PipelineError::PipelineTypeMismatch {
                name: name.to_string(),
                expected: signature(PipelineKind::Terminal, type_name::<I>(), None),
                actual: entry.info.signature(),
            })
    }

    /// Returns the open pipeline registered under `name`.
    pub fn get_open_pipeline<I: 'static, O: 'static>(
        &self,
        name: &str,
    ) -> Result<OpenPipeline<I, O, M>, PipelineError> {
        let registry = self.registry.read();
        let Some(entry) = registry.open_pipelines.get(name) else {
            return Err(registry.not_found(name, PipelineKind::Open));
        };
        entry
            .pipeline
            .downcast_ref::<OpenPipeline<I, O, M>>()
            .cloned()
            .ok_or_else(|| PipelineError::PipelineTypeMismatch {
                name: name.to_string(),
                expected: signature(PipelineKind::Open, type_name::<I>(), Some(type_name::<O>())),
                actual: entry.info.signature(),
            })
    }

    /// Returns true if a pipeline of either kind is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.registry.read().info(name).is_some()
    }

    /// Returns the number of registered pipelines of both kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        let registry = self.registry.read();
        registry.pipelines.len() + registry.open_pipelines.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns terminal pipeline names in sorted order.
    #[must_use]
    pub fn pipeline_names(&self) -> Vec<String> {
        self.registry.read().pipelines.keys().cloned().collect()
    }

    /// Returns open pipeline names in sorted order.
    #[must_use]
    pub fn open_pipeline_names(&self) -> Vec<String> {
        self.registry.read().open_pipelines.keys().cloned().collect()
    }

    /// Returns the description of the pipeline named `name`.
    #[must_use]
    pub fn describe(&self, name: &str) -> Option<Arc<PipelineInfo>> {
        self.registry.read().info(name)
    }

    /// Returns every pipeline description, terminal pipelines first.
    #[must_use]
    pub fn describe_all(&self) -> Vec<Arc<PipelineInfo>> {
        let registry = self.registry.read();
        registry
            .pipelines
            .values()
            .chain(registry.open_pipelines.values())
            .map(|entry| Arc::clone(&entry.info))
            .collect()
    }

    /// Looks up a Handler step taking `T`.
    pub fn get_required_handler_step<T: 'static>(
        &self,
        pipeline: &str,
        step: &str,
    ) -> Result<StepHandle<HandlerFn<T, M>>, PipelineError> {
        self.required_step(pipeline, step, StepShape::Handler)
    }

    /// Looks up a Linear step from `T` to `U`.
    pub fn get_required_linear_step<T: 'static, U: 'static>(
        &self,
        pipeline: &str,
        step: &str,
    ) -> Result<StepHandle<LinearFn<T, U, M>>, PipelineError> {
        self.required_step(pipeline, step, StepShape::Linear)
    }

    /// Looks up an If step taking `T`, diverting with `D` and continuing with `N`.
    pub fn get_required_if_step<T: 'static, D: 'static, N: 'static>(
        &self,
        pipeline: &str,
        step: &str,
    ) -> Result<StepHandle<IfFn<T, D, N, M>>, PipelineError> {
        self.required_step(pipeline, step, StepShape::If)
    }

    /// Looks up an IfElse step taking `T` with branch inputs `A` and `B`.
    pub fn get_required_if_else_step<T: 'static, A: 'static, B: 'static>(
        &self,
        pipeline: &str,
        step: &str,
    ) -> Result<StepHandle<IfElseFn<T, A, B, M>>, PipelineError> {
        self.required_step(pipeline, step, StepShape::IfElse)
    }

    /// Looks up a Switch step taking `T`, keyed by `K`, with branch input `D`.
    pub fn get_required_switch_step<T: 'static, K: CaseKey, D: 'static>(
        &self,
        pipeline: &str,
        step: &str,
    ) -> Result<StepHandle<SwitchFn<T, K, D, M>>, PipelineError> {
        self.required_step(pipeline, step, StepShape::Switch)
    }

    /// Looks up a Fork step taking `T` with branch inputs `A` and `B`.
    pub fn get_required_fork_step<T: 'static, A: 'static, B: 'static>(
        &self,
        pipeline: &str,
        step: &str,
    ) -> Result<StepHandle<ForkFn<T, A, B, M>>, PipelineError> {
        self.required_step(pipeline, step, StepShape::Fork)
    }

    /// Looks up a MultiFork step taking `T`, keyed by `K`, with branch input `D`.
    pub fn get_required_multi_fork_step<T: 'static, K: CaseKey, D: 'static>(
        &self,
        pipeline: &str,
        step: &str,
    ) -> Result<StepHandle<MultiForkFn<T, K, D, M>>, PipelineError> {
        self.required_step(pipeline, step, StepShape::MultiFork)
    }

    fn required_step<F: 'static>(
        &self,
        pipeline: &str,
        step: &str,
        shape: StepShape,
    ) -> Result<StepHandle<F>, PipelineError> {
        let info = self
            .describe(pipeline)
            .ok_or_else(|| PipelineError::MissingPipeline {
                name: pipeline.to_string(),
                referenced_by: None,
            })?;
        let found = info.step(step).ok_or_else(|| PipelineError::MissingStep {
            pipeline: pipeline.to_string(),
            step: step.to_string(),
            available: info.step_names(),
        })?;
        if found.shape != shape {
            return Err(PipelineError::WrongStepShape {
                pipeline: pipeline.to_string(),
                step: step.to_string(),
                expected: shape,
                actual: found.shape,
            });
        }
        if !found.has_signature::<F>() {
            return Err(PipelineError::StepSignatureMismatch {
                pipeline: pipeline.to_string(),
                step: step.to_string(),
                expected: type_name::<F>().to_string(),
                actual: found.signature.to_string(),
            });
        }
        Ok(StepHandle::new(pipeline, step, shape))
    }

    /// Compiles `pipeline`, applying `mutators` when given.
    pub fn compile<I: 'static>(
        &self,
        pipeline: &Pipeline<I, M>,
        mutators: Option<&Mutators>,
    ) -> Result<CompiledPipeline<I, M>, PipelineError> {
        self.compile_with(pipeline, mutators, self.options)
    }

    /// Compiles `pipeline` with explicit options.
    pub fn compile_with<I: 'static>(
        &self,
        pipeline: &Pipeline<I, M>,
        mutators: Option<&Mutators>,
        options: CompileOptions,
    ) -> Result<CompiledPipeline<I, M>, PipelineError> {
        if pipeline.info.space != self.id {
            return Err(PipelineError::ForeignPipeline {
                name: pipeline.name().to_string(),
            });
        }
        if !self.frozen.swap(true, Ordering::SeqCst) {
            debug!(mode = M::NAME, pipelines = self.len(), "Space frozen");
        }
        Compiler::new(self, mutators, options).compile_pipeline(pipeline)
    }

    /// Looks up the terminal pipeline `name` and compiles it.
    pub fn compile_named<I: 'static>(
        &self,
        name: &str,
        mutators: Option<&Mutators>,
    ) -> Result<CompiledPipeline<I, M>, PipelineError> {
        let pipeline = self.get_pipeline::<I>(name)?;
        self.compile(&pipeline, mutators)
    }

    /// Resolves every branch reachable from `pipeline`.
    ///
    /// Inline branches are built and registered by this call, so their
    /// steps can be looked up before mutators are attached. Named branches
    /// that are missing fail here as they would at compile time.
    pub fn prepare<I: 'static>(&self, pipeline: &Pipeline<I, M>) -> Result<(), PipelineError> {
        self.compile(pipeline, None).map(drop)
    }

    /// Runs an inline branch factory with registration left open.
    pub(crate) fn build_inline<R>(&self, factory: impl FnOnce() -> R) -> R {
        let _open = InlineBuild::enter(&self.inline_builds);
        factory()
    }

    pub(crate) fn register_pipeline<I: 'static>(
        &self,
        pipeline: Pipeline<I, M>,
    ) -> Result<(), PipelineError> {
        self.register(Entry {
            info: Arc::clone(&pipeline.info),
            pipeline: Arc::new(pipeline),
        })
    }

    pub(crate) fn register_open<I: 'static, O: 'static>(
        &self,
        pipeline: OpenPipeline<I, O, M>,
    ) -> Result<(), PipelineError> {
        self.register(Entry {
            info: Arc::clone(&pipeline.info),
            pipeline: Arc::new(pipeline),
        })
    }

    fn register(&self, entry: Entry) -> Result<(), PipelineError> {
        if self.is_frozen() && self.inline_builds.load(Ordering::SeqCst) == 0 {
            return Err(PipelineError::SpaceFrozen {
                name: entry.info.name.clone(),
            });
        }
        self.registry.write().insert(entry)
    }
}

impl<M: Mode> Default for Space<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Mode> fmt::Debug for Space<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.read();
        f.debug_struct("Space")
            .field("mode", &M::NAME)
            .field("pipelines", &registry.pipelines.keys().collect::<Vec<_>>())
            .field("open_pipelines", &registry.open_pipelines.keys().collect::<Vec<_>>())
            .field("options", &self.options)
            .field("frozen", &self.is_frozen())
            .finish()
    }
}
