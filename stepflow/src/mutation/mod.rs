//! Step interception.
//!
//! Mutators wrap a step's function after the pipeline is defined, without
//! touching the step's code. They are collected in a [`Mutators`] value,
//! keyed by pipeline and step, and applied when a pipeline is compiled.
//! Compiling with different `Mutators` gives differently behaving
//! functions from the same pipeline.

mod handle;
mod mutator;
mod registry;

pub use handle::StepHandle;
pub use mutator::{AddingMode, Mutator};
pub use registry::StepMutatorRegistry;

use crate::errors::PipelineError;
use std::any::{type_name, Any};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Mutators for any number of steps, handed to the compiler.
#[derive(Default)]
pub struct Mutators {
    steps: BTreeMap<(String, String), Box<dyn Any + Send + Sync>>,
}

impl Mutators {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches `mutator` to the step behind `handle`.
    pub fn add<F>(
        &mut self,
        handle: &StepHandle<F>,
        mutator: Mutator<F>,
        mode: AddingMode,
    ) -> Result<&mut Self, PipelineError>
    where
        F: Send + Sync + 'static,
    {
        let name = mutator.name.clone();
        let registry = self
            .steps
            .entry(key(handle.pipeline(), handle.step()))
            .or_insert_with(|| {
                Box::new(StepMutatorRegistry::<F>::new(handle.pipeline(), handle.step()))
            })
            .downcast_mut::<StepMutatorRegistry<F>>()
            .ok_or_else(|| shape_mismatch::<F>(handle.pipeline(), handle.step()))?;
        registry.add(mutator, mode)?;

        debug!(
            pipeline = handle.pipeline(),
            step = handle.step(),
            mutator = %name,
            mode = ?mode,
            "Attached mutator"
        );
        Ok(self)
    }

    /// Returns the mutators attached to the step behind `handle`.
    #[must_use]
    pub fn step<F: 'static>(&self, handle: &StepHandle<F>) -> Option<&StepMutatorRegistry<F>> {
        self.steps
            .get(&key(handle.pipeline(), handle.step()))
            .and_then(|registry| registry.downcast_ref())
    }

    /// Removes the mutator `name` from the step behind `handle`.
    pub fn remove<F: 'static>(&mut self, handle: &StepHandle<F>, name: &str) -> Option<Mutator<F>> {
        self.steps
            .get_mut(&key(handle.pipeline(), handle.step()))
            .and_then(|registry| registry.downcast_mut::<StepMutatorRegistry<F>>())
            .and_then(|registry| registry.remove(name))
    }

    /// Removes every mutator from the step behind `handle`.
    pub fn clear_step<F>(&mut self, handle: &StepHandle<F>) -> bool {
        self.steps
            .remove(&key(handle.pipeline(), handle.step()))
            .is_some()
    }

    /// Returns the number of steps with mutators attached.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if no step has mutators attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Wraps `core` with the mutators of `pipeline`/`step`, if any.
    pub(crate) fn apply<F: 'static>(
        &self,
        pipeline: &str,
        step: &str,
        core: F,
    ) -> Result<F, PipelineError> {
        match self.steps.get(&key(pipeline, step)) {
            None => Ok(core),
            Some(registry) => registry
                .downcast_ref::<StepMutatorRegistry<F>>()
                .map(|registry| registry.apply(core))
                .ok_or_else(|| shape_mismatch::<F>(pipeline, step)),
        }
    }
}

fn key(pipeline: &str, step: &str) -> (String, String) {
    (pipeline.to_string(), step.to_string())
}

fn shape_mismatch<F>(pipeline: &str, step: &str) -> PipelineError {
    PipelineError::MutatorShapeMismatch {
        pipeline: pipeline.to_string(),
        step: step.to_string(),
        expected: type_name::<F>().to_string(),
    }
}

impl fmt::Debug for Mutators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.steps.keys().map(|(pipeline, step)| format!("{pipeline}/{step}")))
            .finish()
    }
}
