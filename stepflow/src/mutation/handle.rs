//! Typed step addresses.

use crate::steps::StepShape;
use std::fmt;
use std::marker::PhantomData;

/// A verified reference to one step whose function has type `F`.
///
/// Only [`Space`](crate::space::Space) lookups create handles, after
/// checking that the step exists with that shape and signature, so a
/// mutator attached through a handle always matches its step.
pub struct StepHandle<F> {
    pipeline: String,
    step: String,
    shape: StepShape,
    _fn: PhantomData<fn() -> F>,
}

impl<F> StepHandle<F> {
    pub(crate) fn new(pipeline: &str, step: &str, shape: StepShape) -> Self {
        Self {
            pipeline: pipeline.to_string(),
            step: step.to_string(),
            shape,
            _fn: PhantomData,
        }
    }

    /// Returns the owning pipeline name.
    #[must_use]
    pub fn pipeline(&self) -> &str {
        &self.pipeline
    }

    /// Returns the step name.
    #[must_use]
    pub fn step(&self) -> &str {
        &self.step
    }

    /// Returns the step shape.
    #[must_use]
    pub fn shape(&self) -> StepShape {
        self.shape
    }
}

impl<F> Clone for StepHandle<F> {
    fn clone(&self) -> Self {
        Self {
            pipeline: self.pipeline.clone(),
            step: self.step.clone(),
            shape: self.shape,
            _fn: PhantomData,
        }
    }
}

impl<F> fmt::Debug for StepHandle<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepHandle")
            .field("pipeline", &self.pipeline)
            .field("step", &self.step)
            .field("shape", &self.shape)
            .finish()
    }
}

impl<F> fmt::Display for StepHandle<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.pipeline, self.step)
    }
}
