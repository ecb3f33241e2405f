//! Pipeline building and compilation.
//!
//! This module provides:
//! - Pipeline and open pipeline graphs
//! - The type-state builder
//! - The compiler and compiled pipelines

mod builder;
mod compiler;
mod graph;


pub use builder::{ChainBuilder, PipelineBuilder};
pub use compiler::{CompileOptions, CompiledPipeline};
pub use graph::{OpenPipeline, Pipeline, PipelineInfo, PipelineKind};

pub(crate) use builder::validate_name;
pub(crate) use compiler::{Compiler, StepSite};
pub(crate) use graph::signature;
