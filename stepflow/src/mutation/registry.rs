//! Per-step mutator lists.

use super::{AddingMode, Mutator};
use crate::errors::PipelineError;

/// The ordered mutators attached to one step.
///
/// Mutators `[m1, ..., mn]` apply as `mn.wrap(... m1.wrap(core))`, so the
/// last mutator in the list is the outermost.
pub struct StepMutatorRegistry<F> {
    pipeline: String,
    step: String,
    entries: Vec<Mutator<F>>,
}

impl<F: 'static> StepMutatorRegistry<F> {
    /// Creates an empty list for `pipeline`/`step`.
    pub fn new(pipeline: impl Into<String>, step: impl Into<String>) -> Self {
        Self {
            pipeline: pipeline.into(),
            step: step.into(),
            entries: Vec::new(),
        }
    }

    /// Adds a mutator according to `mode`.
    pub fn add(&mut self, mutator: Mutator<F>, mode: AddingMode) -> Result<(), PipelineError> {
        let existing = self.position(&mutator.name);
        match (mode, existing) {
            (AddingMode::Replace, Some(index)) => self.entries[index] = mutator,
            (_, Some(_)) => {
                return Err(PipelineError::DuplicateMutator {
                    pipeline: self.pipeline.clone(),
                    step: self.step.clone(),
                    mutator: mutator.name,
                })
            }
            (AddingMode::Append | AddingMode::Replace, None) => self.entries.push(mutator),
            (AddingMode::Prepend, None) => self.entries.insert(0, mutator),
            (AddingMode::Ordered, None) => {
                let index = self
                    .entries
                    .iter()
                    .position(|entry| entry.order > mutator.order)
                    .unwrap_or(self.entries.len());
                self.entries.insert(index, mutator);
            }
        }
        Ok(())
    }

    /// Removes the mutator named `name`, returning it.
    pub fn remove(&mut self, name: &str) -> Option<Mutator<F>> {
        let index = self.position(name)?;
        Some(self.entries.remove(index))
    }

    /// Wraps `core` with every mutator in list order.
    pub fn apply(&self, core: F) -> F {
        self.entries.iter().fold(core, |f, mutator| mutator.wrap(f))
    }

    /// Returns mutator names in application order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(Mutator::name).collect()
    }

    /// Returns the owning pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &str {
        &self.pipeline
    }

    /// Returns the mutated step.
    #[must_use]
    pub fn step(&self) -> &str {
        &self.step
    }

    /// Returns the number of mutators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no mutators are attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.name == name)
    }
}

impl<F> std::fmt::Debug for StepMutatorRegistry<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepMutatorRegistry")
            .field("pipeline", &self.pipeline)
            .field("step", &self.step)
            .field("entries", &self.entries)
            .finish()
    }
}
