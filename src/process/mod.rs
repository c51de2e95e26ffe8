//! Pipeline-side process model
//!
//! - `pipeline` - ordered steps sharing one side-effect store
//! - `step` - the step vocabulary, including the vertex program bridge
//! - `strategy` - rewrite passes applied once before execution
//! - `lambda` - named functions that survive transport to workers
//! - `side_effects` - the shared, named result store
//! - `traverser` - units of flow and their requirements

pub mod lambda;
pub mod pipeline;
pub mod side_effects;
pub mod step;
pub mod strategy;
pub mod traverser;

pub use lambda::{Lambda, LambdaRegistry};
pub use pipeline::{Pipeline, PipelineDefinition, PipelineError};
pub use side_effects::SideEffects;
pub use step::{Step, StepDefinition, StepError};
pub use strategy::{PipelineStrategy, Strategies, StrategyCategory, StrategyError};
pub use traverser::{Traverser, TraverserRequirement};
