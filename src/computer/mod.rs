//! Graph computer: jobs, vertex programs and the aggregation contract
//!
//! A `ComputerJob` is the transportable description of a pipeline run: a
//! `Configuration` holding the pipeline definition plus one configuration per
//! aggregation. A `GraphComputer` executes it and resolves to a
//! `ComputerResult`. `LocalGraphComputer` is the in-process engine; it
//! rebuilds every program from the serialized configuration on each worker,
//! exactly as a remote worker would.

pub mod configuration;
pub mod job;
pub mod local;
pub mod mapreduce;
pub mod program;

pub use configuration::{Configuration, ConfigurationError};
pub use job::{ComputerJob, MapReduceSpec};
pub use local::LocalGraphComputer;
pub use program::PipelineVertexProgram;

use crate::process::pipeline::PipelineError;
use crate::process::side_effects::SideEffects;
use crate::structure::Vertex;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ComputerError {
    #[error("No step labelled '{step_label}' can provide the aggregation: {reason}")]
    BindingLookupFailure { step_label: String, reason: String },

    #[error("Invalid job configuration: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Invalid pipeline: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Unknown map-reduce kind '{kind}'")]
    UnknownMapReduce { kind: String },

    #[error("Step {step} cannot run inside a vertex program")]
    NotDistributable { step: String },

    #[error("Vertex {vertex} has an invalid local side effect '{key}': {reason}")]
    InvalidLocalSideEffect {
        vertex: String,
        key: String,
        reason: String,
    },

    #[error("Worker {worker} failed: {reason}")]
    WorkerFailed { worker: usize, reason: String },

    #[error("Failed to start compute runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("Job serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Side effects a vertex program leaves on one vertex
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalSideEffects {
    entries: BTreeMap<String, Value>,
}

impl LocalSideEffects {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    pub fn get_or_insert_with(&mut self, key: &str, default: impl FnOnce() -> Value) -> &mut Value {
        self.entries.entry(key.to_string()).or_insert_with(default)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A vertex together with the state the vertex program computed for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputedVertex {
    pub vertex: Vertex,
    pub local: LocalSideEffects,
}

impl ComputedVertex {
    pub fn new(vertex: Vertex) -> Self {
        Self {
            vertex,
            local: LocalSideEffects::default(),
        }
    }
}

/// Outcome of a finished job
#[derive(Debug, Clone)]
pub struct ComputerResult {
    pub job_id: String,
    /// Computed state of every vertex
    pub vertices: Vec<ComputedVertex>,
    /// Side effects at the end of the job, aggregation results included
    pub side_effects: SideEffects,
    pub runtime: Duration,
}

/// An engine able to run a `ComputerJob`
pub trait GraphComputer: Send + Sync + fmt::Debug {
    /// Start `job`; the returned future resolves once every stage finished
    fn submit(&self, job: ComputerJob) -> BoxFuture<'static, Result<ComputerResult, ComputerError>>;
}
