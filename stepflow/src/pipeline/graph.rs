//! Built pipeline graphs.
//!
//! A [`Pipeline`] ends in a terminal step; an [`OpenPipeline`] does not and
//! is spliced into a parent chain by If, IfElse and Switch steps. Both are
//! immutable once built and cheap to clone. They hold a description of
//! their steps and a link that the compiler calls to bind those steps.

use super::compiler::Compiler;
use crate::errors::PipelineError;
use crate::mode::{Mode, Next};
use crate::space::Space;
use crate::steps::{BranchTarget, StepInfo};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Compiles a terminal pipeline into its entry continuation.
pub(crate) type TerminalLink<I, M> =
    Arc<dyn for<'c> Fn(&mut Compiler<'c, M>) -> Result<Next<I, M>, PipelineError> + Send + Sync>;

/// Compiles an open chain given the continuation its last step feeds.
pub(crate) type ChainLink<I, O, M> = Arc<
    dyn for<'c> Fn(&mut Compiler<'c, M>, Next<O, M>) -> Result<Next<I, M>, PipelineError>
        + Send
        + Sync,
>;

/// Whether a pipeline ends in a terminal step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineKind {
    /// Ends in a Handler, Fork or MultiFork step.
    Terminal,
    /// Ends without a terminal; its downstream is bound when spliced.
    Open,
}

impl PipelineKind {
    /// Returns the snake_case name of the kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Terminal => "terminal",
            Self::Open => "open",
        }
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Description of a built pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineInfo {
    /// The pipeline name, unique within its space.
    pub name: String,
    /// Terminal or open.
    pub kind: PipelineKind,
    /// Name of the execution mode.
    pub mode: &'static str,
    /// Rust type name of the pipeline input.
    pub input_type: &'static str,
    /// Rust type name of the downstream input, for open pipelines.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_type: Option<&'static str>,
    /// Steps in chain order; for terminal pipelines the last one is the terminal.
    pub steps: Vec<StepInfo>,
    /// Identity of the owning space.
    #[serde(skip)]
    pub(crate) space: u64,
}

impl PipelineInfo {
    /// Returns the step named `name`.
    #[must_use]
    pub fn step(&self, name: &str) -> Option<&StepInfo> {
        self.steps.iter().find(|step| step.name == name)
    }

    /// Returns step names in chain order.
    #[must_use]
    pub fn step_names(&self) -> Vec<String> {
        self.steps.iter().map(|step| step.name.clone()).collect()
    }

    /// Returns the terminal step of a terminal pipeline.
    #[must_use]
    pub fn terminal(&self) -> Option<&StepInfo> {
        match self.kind {
            PipelineKind::Terminal => self.steps.last(),
            PipelineKind::Open => None,
        }
    }

    /// Returns a readable signature such as `Pipeline<i32>`.
    #[must_use]
    pub fn signature(&self) -> String {
        signature(self.kind, self.input_type, self.output_type)
    }

    /// Converts to a JSON value.
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

pub(crate) fn signature(kind: PipelineKind, input: &str, output: Option<&str>) -> String {
    match (kind, output) {
        (PipelineKind::Open, Some(output)) => format!("OpenPipeline<{input}, {output}>"),
        _ => format!("Pipeline<{input}>"),
    }
}

/// A named pipeline that ends in a terminal step.
pub struct Pipeline<I, M: Mode> {
    pub(crate) info: Arc<PipelineInfo>,
    pub(crate) link: TerminalLink<I, M>,
}

impl<I, M: Mode> Pipeline<I, M> {
    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// Returns the pipeline description.
    #[must_use]
    pub fn info(&self) -> &PipelineInfo {
        &self.info
    }

    /// Returns the number of steps, terminal included.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.info.steps.len()
    }
}

/// A named chain without a terminal, spliced into If, IfElse and Switch
/// steps. Its last step hands an `O` to whatever the parent binds.
pub struct OpenPipeline<I, O, M: Mode> {
    pub(crate) info: Arc<PipelineInfo>,
    pub(crate) link: ChainLink<I, O, M>,
}

impl<I, O, M: Mode> OpenPipeline<I, O, M> {
    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// Returns the pipeline description.
    #[must_use]
    pub fn info(&self) -> &PipelineInfo {
        &self.info
    }

    /// Returns the number of steps.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.info.steps.len()
    }
}

impl<I, M: Mode> Clone for Pipeline<I, M> {
    fn clone(&self) -> Self {
        Self {
            info: Arc::clone(&self.info),
            link: Arc::clone(&self.link),
        }
    }
}

impl<I, O, M: Mode> Clone for OpenPipeline<I, O, M> {
    fn clone(&self) -> Self {
        Self {
            info: Arc::clone(&self.info),
            link: Arc::clone(&self.link),
        }
    }
}

impl<I, M: Mode> fmt::Debug for Pipeline<I, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.info.name)
            .field("steps", &self.info.step_names())
            .finish_non_exhaustive()
    }
}

impl<I, O, M: Mode> fmt::Debug for OpenPipeline<I, O, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenPipeline")
            .field("name", &self.info.name)
            .field("steps", &self.info.step_names())
            .finish_non_exhaustive()
    }
}

impl<I: 'static, M: Mode> BranchTarget<M> for Pipeline<I, M> {
    const KIND: PipelineKind = PipelineKind::Terminal;

    fn lookup(space: &Space<M>, name: &str) -> Result<Self, PipelineError> {
        space.get_pipeline::<I>(name)
    }

    fn pipeline_name(&self) -> &str {
        self.name()
    }
}

impl<I: 'static, O: 'static, M: Mode> BranchTarget<M> for OpenPipeline<I, O, M> {
    const KIND: PipelineKind = PipelineKind::Open;

    fn lookup(space: &Space<M>, name: &str) -> Result<Self, PipelineError> {
        space.get_open_pipeline::<I, O>(name)
    }

    fn pipeline_name(&self) -> &str {
        self.name()
    }
}
