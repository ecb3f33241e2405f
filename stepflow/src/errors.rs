//! Error types for the stepflow framework.
//!
//! Every error in this module is a configuration error: it is raised while a
//! pipeline is being built, looked up, mutated or compiled, never while a
//! compiled pipeline runs. Failures of user step bodies travel inside the
//! pipeline's own outcome type and are not translated here.

use crate::pipeline::PipelineKind;
use crate::steps::StepShape;
use thiserror::Error;

/// The main error type for stepflow operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// A pipeline or step name is empty or whitespace-only.
    #[error("Invalid {what} name '{name}': names cannot be empty or whitespace-only")]
    InvalidName {
        /// What was being named ("pipeline" or "step").
        what: &'static str,
        /// The rejected name.
        name: String,
    },

    /// A pipeline with this name is already registered in the space.
    #[error("Pipeline '{name}' is already registered in this space")]
    DuplicatePipeline {
        /// The conflicting pipeline name.
        name: String,
    },

    /// Two steps of one pipeline share a name.
    #[error("Pipeline '{pipeline}' already has a step named '{step}'")]
    DuplicateStep {
        /// The owning pipeline.
        pipeline: String,
        /// The conflicting step name.
        step: String,
    },

    /// A keyed branch step declares the same case key twice.
    #[error("Step '{step}' in pipeline '{pipeline}' declares case {key} more than once")]
    DuplicateCaseKey {
        /// The owning pipeline.
        pipeline: String,
        /// The keyed step.
        step: String,
        /// Debug rendering of the repeated key.
        key: String,
    },

    /// A pipeline was referenced by name but is not registered.
    #[error(
        "Pipeline '{name}' is not registered in this space{}",
        referrer_suffix(.referenced_by.as_deref())
    )]
    MissingPipeline {
        /// The missing pipeline name.
        name: String,
        /// `pipeline/step` that referenced it, when known.
        referenced_by: Option<String>,
    },

    /// A pipeline exists but is terminal where open was expected, or vice versa.
    #[error("Pipeline '{name}' is {actual}, expected {expected}")]
    WrongPipelineKind {
        /// The pipeline name.
        name: String,
        /// The kind the caller asked for.
        expected: PipelineKind,
        /// The kind that is registered.
        actual: PipelineKind,
    },

    /// A pipeline exists but its input or output type differs from the request.
    #[error("Pipeline '{name}' has signature {actual}, expected {expected}")]
    PipelineTypeMismatch {
        /// The pipeline name.
        name: String,
        /// The requested signature.
        expected: String,
        /// The registered signature.
        actual: String,
    },

    /// A step lookup named a step the pipeline does not have.
    #[error(
        "Pipeline '{pipeline}' has no step named '{step}' (available: {})",
        .available.join(", ")
    )]
    MissingStep {
        /// The pipeline searched.
        pipeline: String,
        /// The requested step.
        step: String,
        /// Steps the pipeline does have, in order.
        available: Vec<String>,
    },

    /// A step lookup found the step but it has another shape.
    #[error("Step '{step}' in pipeline '{pipeline}' is a {actual} step, expected {expected}")]
    WrongStepShape {
        /// The owning pipeline.
        pipeline: String,
        /// The step name.
        step: String,
        /// The requested shape.
        expected: StepShape,
        /// The registered shape.
        actual: StepShape,
    },

    /// A step lookup found the right shape but different types.
    #[error(
        "Step '{step}' in pipeline '{pipeline}' has function type {actual}, \
         expected {expected}"
    )]
    StepSignatureMismatch {
        /// The owning pipeline.
        pipeline: String,
        /// The step name.
        step: String,
        /// The requested function type.
        expected: String,
        /// The registered function type.
        actual: String,
    },

    /// A mutator with this name is already attached to the step.
    #[error("Mutator '{mutator}' is already attached to step '{step}' in pipeline '{pipeline}'")]
    DuplicateMutator {
        /// The owning pipeline.
        pipeline: String,
        /// The mutated step.
        step: String,
        /// The conflicting mutator name.
        mutator: String,
    },

    /// Mutators stored for a step were registered for another function shape.
    #[error("Mutators for step '{step}' in pipeline '{pipeline}' do not wrap {expected}")]
    MutatorShapeMismatch {
        /// The owning pipeline.
        pipeline: String,
        /// The mutated step.
        step: String,
        /// The function type the step actually has.
        expected: String,
    },

    /// A pipeline was registered after the space started compiling.
    #[error("Pipeline '{name}' cannot be registered: the space is frozen once compilation starts")]
    SpaceFrozen {
        /// The rejected pipeline name.
        name: String,
    },

    /// A pipeline was compiled by a space other than the one that built it.
    #[error("Pipeline '{name}' was built in another space")]
    ForeignPipeline {
        /// The pipeline name.
        name: String,
    },

    /// Pipelines reference each other in a loop.
    #[error("Pipeline reference cycle detected: {}", .path.join(" -> "))]
    CycleDetected {
        /// Pipeline names forming the cycle; first and last are equal.
        path: Vec<String>,
    },
}

fn referrer_suffix(referenced_by: Option<&str>) -> String {
    referenced_by
        .map(|r| format!(" (referenced by {r})"))
        .unwrap_or_default()
}

impl PipelineError {
    /// Returns a stable error code for diagnostics.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidName { .. } => "FLOW-001-INVALID_NAME",
            Self::DuplicatePipeline { .. } => "FLOW-002-DUPLICATE_PIPELINE",
            Self::DuplicateStep { .. } => "FLOW-003-DUPLICATE_STEP",
            Self::DuplicateCaseKey { .. } => "FLOW-004-DUPLICATE_CASE",
            Self::MissingPipeline { .. } => "FLOW-005-MISSING_PIPELINE",
            Self::WrongPipelineKind { .. } => "FLOW-006-PIPELINE_KIND",
            Self::PipelineTypeMismatch { .. } => "FLOW-007-PIPELINE_TYPE",
            Self::MissingStep { .. } => "FLOW-008-MISSING_STEP",
            Self::WrongStepShape { .. } => "FLOW-009-STEP_SHAPE",
            Self::StepSignatureMismatch { .. } => "FLOW-010-STEP_SIGNATURE",
            Self::DuplicateMutator { .. } => "FLOW-011-DUPLICATE_MUTATOR",
            Self::MutatorShapeMismatch { .. } => "FLOW-012-MUTATOR_SHAPE",
            Self::CycleDetected { .. } => "FLOW-013-CYCLE",
            Self::SpaceFrozen { .. } => "FLOW-014-SPACE_FROZEN",
            Self::ForeignPipeline { .. } => "FLOW-015-FOREIGN_PIPELINE",
        }
    }

    /// Returns a hint for fixing the error, when one applies.
    #[must_use]
    pub fn fix_hint(&self) -> Option<&'static str> {
        match self {
            Self::DuplicatePipeline { .. } => Some(
                "Pipeline names are shared by terminal and open pipelines; pick a unique name.",
            ),
            Self::MissingPipeline { .. } => Some(
                "Create the referenced pipeline before compiling, or build the branch inline.",
            ),
            Self::WrongPipelineKind { .. } => Some(
                "If/IfElse/Switch branches must be open pipelines; \
                 Fork/MultiFork branches must end in a terminal.",
            ),
            Self::DuplicateMutator { .. } => {
                Some("Use AddingMode::Replace to swap an existing mutator.")
            }
            Self::CycleDetected { .. } => {
                Some("Break the loop of branch references; compiled pipelines cannot recurse.")
            }
            Self::SpaceFrozen { .. } => {
                Some("Register every pipeline before the first compile or prepare call.")
            }
            Self::ForeignPipeline { .. } => {
                Some("Compile a pipeline with the space it was created in.")
            }
            _ => None,
        }
    }

    /// Returns true for errors raised because something could not be found.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::MissingPipeline { .. } | Self::MissingStep { .. })
    }
}

/// Error returned by [`CancellationToken::check`](crate::cancellation::CancellationToken::check).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Operation cancelled: {reason}")]
pub struct Cancelled {
    /// The first cancellation reason recorded on the token.
    pub reason: String,
}

impl Cancelled {
    /// Creates a new cancellation error.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}
