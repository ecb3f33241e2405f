//! # Stepflow
//!
//! Named, type-checked branching pipelines built from small steps,
//! compiled into single functions, with per-step interception.
//!
//! Stepflow provides:
//!
//! - **Seven step shapes**: Handler, Linear, If, IfElse, Switch, Fork and MultiFork
//! - **Type-state building**: each step must accept the previous step's output
//! - **Named spaces**: pipelines reference each other by name and are resolved at compile time
//! - **Mutators**: wrap or replace any step's function without touching its code
//! - **Execution modes**: blocking or suspending, with or without cancellation
//!
//! ## Quick Start
//!
//! ```rust
//! use stepflow::prelude::*;
//!
//! type M = Blocking<i32>;
//!
//! let space: Space<M> = Space::new();
//! let pipeline = space
//!     .create_pipeline::<i32>("add_three")
//!     .start_with(Linear::new("add", |x: i32, (), next: Next<i32, M>| next(x + 3, ())))
//!     .handle_with(Handler::new("done", |x: i32, ()| x))?;
//!
//! let handle = space.get_required_linear_step::<i32, i32>("add_three", "add")?;
//! let mut mutators = Mutators::new();
//! mutators.add(
//!     &handle,
//!     Mutator::new("scale", |core: LinearFn<i32, i32, M>| {
//!         linear_fn::<i32, i32, M, _>(move |x, token, next| core(x * 2, token, next))
//!     }),
//!     AddingMode::Append,
//! )?;
//!
//! assert_eq!(space.compile(&pipeline, None)?.call(2), 5);
//! assert_eq!(space.compile(&pipeline, Some(&mutators))?.call(2), 7);
//! # Ok::<(), PipelineError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod errors;
pub mod mode;
pub mod mutation;
pub mod observability;
pub mod pipeline;
pub mod space;
pub mod steps;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::errors::{Cancelled, PipelineError};
    pub use crate::mode::{
        next_fn, Blocking, BlockingCancellable, Mode, Next, Suspending, SuspendingCancellable,
    };
    pub use crate::mutation::{AddingMode, Mutator, Mutators, StepHandle, StepMutatorRegistry};
    pub use crate::pipeline::{
        ChainBuilder, CompileOptions, CompiledPipeline, OpenPipeline, Pipeline, PipelineBuilder,
        PipelineInfo, PipelineKind,
    };
    pub use crate::space::Space;
    pub use crate::steps::{
        binary_fn, handler_fn, keyed_fn, linear_fn, BinaryFn, Branch, Cases, Fork, ForkFn,
        Handler, HandlerFn, If, IfElse, IfElseFn, IfFn, KeyedFn, Linear, LinearFn, MultiFork,
        MultiForkFn, StepInfo, StepShape, Switch, SwitchFn,
    };
}
