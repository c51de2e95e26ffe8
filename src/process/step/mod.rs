//! Step vocabulary
//!
//! Steps are the units a `Pipeline` is built from. Inside a vertex program a
//! step runs once per vertex through `execute_on_vertex`; steps that aggregate
//! across vertices expose a `MapReduce` through `map_reducer`.
//!
//! Every distributable step can describe itself as a `StepDefinition`, the
//! serializable form that travels with a job. Lambdas appear there by name
//! only and are resolved again on the receiving side.

pub mod group_by;
pub mod has;
pub mod inject;
pub mod vertex_program;


pub use group_by::GroupByStep;
pub use has::HasStep;
pub use inject::InjectStep;
pub use vertex_program::{BridgeState, VertexProgramStep};

use super::lambda::LambdaRegistry;
use super::pipeline::PipelineError;
use super::strategy::StrategyError;
use super::traverser::Requirements;
use crate::computer::mapreduce::MapReduce;
use crate::computer::{ComputerError, LocalSideEffects};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;
use std::fmt;
use thiserror::Error;

/// Errors raised by steps while a pipeline runs
#[derive(Debug, Error)]
pub enum StepError {
    #[error("Vertex program job failed: {source}")]
    JobSubmissionFailure {
        #[source]
        source: ComputerError,
    },

    /// End of a step's output. A control signal, not a failure.
    #[error("No more results")]
    IterationExhausted,

    #[error("Enclosing pipeline has no graph to compute over")]
    MissingGraph,

    #[error(transparent)]
    Strategy(#[from] StrategyError),
}

impl StepError {
    pub fn is_exhausted(&self) -> bool {
        matches!(self, StepError::IterationExhausted)
    }
}

/// A single stage of a pipeline
pub trait Step: Send + Sync + fmt::Debug {
    /// Step type name, e.g. `GroupByStep`
    fn name(&self) -> &'static str;

    /// User-visible label, unique within its pipeline
    fn label(&self) -> Option<&str>;

    /// Traverser capabilities this step relies on
    fn requirements(&self) -> Requirements {
        Requirements::new()
    }

    /// Whether this step can run inside a distributed vertex program
    fn is_distributable(&self) -> bool {
        true
    }

    /// Serializable form of this step
    fn definition(&self) -> Result<StepDefinition, PipelineError>;

    /// Run against one vertex. `Ok(false)` drops the vertex from later steps.
    fn execute_on_vertex(
        &self,
        _vertex: &Value,
        _local: &mut LocalSideEffects,
    ) -> Result<bool, ComputerError> {
        Ok(true)
    }

    /// Aggregation this step contributes to the job, if any
    fn map_reducer(&self) -> Option<Box<dyn MapReduce>> {
        None
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// `name@label`, or just `name` for unlabeled steps
pub fn step_string(step: &dyn Step) -> String {
    match step.label() {
        Some(label) => format!("{}@{}", step.name(), label),
        None => step.name().to_string(),
    }
}

/// Steps without behaviour of their own; useful as a labeled anchor
#[derive(Debug, Clone, Default)]
pub struct IdentityStep {
    label: Option<String>,
}

impl IdentityStep {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

impl Step for IdentityStep {
    fn name(&self) -> &'static str {
        "IdentityStep"
    }

    fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    fn definition(&self) -> Result<StepDefinition, PipelineError> {
        Ok(StepDefinition::Identity {
            label: self.label.clone(),
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Transportable description of a step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepDefinition {
    Identity {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },
    Has {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
        property: String,
        value: Value,
    },
    Inject {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
        values: Vec<Value>,
    },
    GroupBy {
        label: String,
        side_effect_key: String,
        key_fn: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value_fn: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reduce_fn: Option<String>,
    },
}

impl StepDefinition {
    /// Rebuild the live step, resolving lambda names against `lambdas`
    pub fn materialize(&self, lambdas: &LambdaRegistry) -> Result<Box<dyn Step>, PipelineError> {
        let step: Box<dyn Step> = match self {
            StepDefinition::Identity { label } => Box::new(IdentityStep {
                label: label.clone(),
            }),
            StepDefinition::Has {
                label,
                property,
                value,
            } => {
                let step = HasStep::new(property.clone(), value.clone());
                Box::new(match label {
                    Some(label) => step.with_label(label.clone()),
                    None => step,
                })
            }
            StepDefinition::Inject { label, values } => {
                let step = InjectStep::new(values.clone());
                Box::new(match label {
                    Some(label) => step.with_label(label.clone()),
                    None => step,
                })
            }
            StepDefinition::GroupBy {
                label,
                side_effect_key,
                key_fn,
                value_fn,
                reduce_fn,
            } => {
                let mut step = GroupByStep::new(label.clone(), resolve(lambdas, key_fn)?)
                    .with_side_effect_key(side_effect_key.clone());
                if let Some(name) = value_fn {
                    step = step.with_value_fn(resolve(lambdas, name)?);
                }
                if let Some(name) = reduce_fn {
                    step = step.with_reduce_fn(resolve(lambdas, name)?);
                }
                Box::new(step)
            }
        };
        Ok(step)
    }
}

fn resolve(lambdas: &LambdaRegistry, name: &str) -> Result<super::Lambda, PipelineError> {
    lambdas
        .resolve(name)
        .ok_or_else(|| PipelineError::UnknownLambda(name.to_string()))
}
