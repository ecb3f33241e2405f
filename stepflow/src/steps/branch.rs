//! Branch references from steps to sub-pipelines.

use super::{BranchInfo, BranchRole, BranchSource};
use crate::errors::PipelineError;
use crate::mode::Mode;
use crate::pipeline::PipelineKind;
use crate::space::Space;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A pipeline type that can be the target of a branch.
///
/// Implemented by [`Pipeline`](crate::pipeline::Pipeline) (Fork and
/// MultiFork branches) and [`OpenPipeline`](crate::pipeline::OpenPipeline)
/// (If, IfElse and Switch branches).
pub trait BranchTarget<M: Mode>: Clone + Send + Sync + 'static {
    /// The kind of pipeline this target is.
    const KIND: PipelineKind;

    /// Looks the pipeline up by name.
    fn lookup(space: &Space<M>, name: &str) -> Result<Self, PipelineError>;

    /// Returns the pipeline name.
    fn pipeline_name(&self) -> &str;
}

type Factory<P, M> = Arc<dyn Fn(&Space<M>) -> Result<P, PipelineError> + Send + Sync>;

enum Source<P, M: Mode> {
    Named(String),
    Inline {
        factory: Factory<P, M>,
        built: Arc<Mutex<Option<P>>>,
    },
}

/// A reference from a branching step to the pipeline it diverts into.
///
/// Named references are looked up when the step is compiled, so the
/// target must be registered by then. Inline references call their
/// factory the first time they are resolved and keep the result, so a
/// pipeline compiled twice reuses the same branch.
pub struct Branch<P, M: Mode> {
    source: Source<P, M>,
}

impl<P: BranchTarget<M>, M: Mode> Branch<P, M> {
    /// References a pipeline registered under `name`.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            source: Source::Named(name.into()),
        }
    }

    /// Builds the branch pipeline with `factory` on first resolution.
    pub fn inline<F>(factory: F) -> Self
    where
        F: Fn(&Space<M>) -> Result<P, PipelineError> + Send + Sync + 'static,
    {
        Self {
            source: Source::Inline {
                factory: Arc::new(factory),
                built: Arc::new(Mutex::new(None)),
            },
        }
    }

    /// Returns the referenced name for named branches.
    #[must_use]
    pub fn target_name(&self) -> Option<&str> {
        match &self.source {
            Source::Named(name) => Some(name),
            Source::Inline { .. } => None,
        }
    }

    pub(crate) fn info(&self, role: BranchRole, key: Option<String>) -> BranchInfo {
        let source = match &self.source {
            Source::Named(name) => BranchSource::Named {
                pipeline: name.clone(),
            },
            Source::Inline { .. } => BranchSource::Inline,
        };
        BranchInfo { role, key, source }
    }

    /// Resolves the target pipeline; `referrer` names the step for errors.
    pub(crate) fn resolve(&self, space: &Space<M>, referrer: &str) -> Result<P, PipelineError> {
        match &self.source {
            Source::Named(name) => P::lookup(space, name).map_err(|err| match err {
                PipelineError::MissingPipeline { name, .. } => PipelineError::MissingPipeline {
                    name,
                    referenced_by: Some(referrer.to_string()),
                },
                other => other,
            }),
            Source::Inline { factory, built } => {
                let mut built = built.lock();
                if let Some(pipeline) = built.as_ref() {
                    return Ok(pipeline.clone());
                }

                let pipeline = space.build_inline(|| factory(space))?;
                debug!(
                    pipeline = pipeline.pipeline_name(),
                    kind = %P::KIND,
                    referenced_by = referrer,
                    "Built inline branch"
                );
                *built = Some(pipeline.clone());
                Ok(pipeline)
            }
        }
    }
}

impl<P, M: Mode> Clone for Branch<P, M> {
    fn clone(&self) -> Self {
        let source = match &self.source {
            Source::Named(name) => Source::Named(name.clone()),
            Source::Inline { factory, built } => Source::Inline {
                factory: Arc::clone(factory),
                built: Arc::clone(built),
            },
        };
        Self { source }
    }
}

impl<P, M: Mode> fmt::Debug for Branch<P, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Source::Named(name) => f.debug_tuple("Branch::Named").field(name).finish(),
            Source::Inline { built, .. } => f
                .debug_struct("Branch::Inline")
                .field("built", &built.try_lock().map(|b| b.is_some()))
                .finish(),
        }
    }
}
