//! Pipelines: ordered steps over one shared side-effect store

use super::lambda::LambdaRegistry;
use super::side_effects::SideEffects;
use super::step::{step_string, Step, StepDefinition};
use super::strategy::{Strategies, StrategyError};
use super::traverser::{Requirements, TraverserRequirement};
use crate::computer::mapreduce::MapReduce;
use crate::structure::Graph;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Step label '{0}' is already used in this pipeline")]
    DuplicateLabel(String),

    #[error("Pipeline is locked; strategies have already been applied")]
    Locked,

    #[error("Step {step} cannot be transported to a worker")]
    NotTransportable { step: String },

    #[error("Unknown lambda '{0}'")]
    UnknownLambda(String),

    #[error("Pipeline requires unsupported traverser capabilities: {}", format_requirements(.0))]
    UnsupportedRequirements(Vec<TraverserRequirement>),
}

fn format_requirements(requirements: &[TraverserRequirement]) -> String {
    requirements
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Serializable form of a pipeline, carried inside a job's configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineDefinition {
    pub steps: Vec<StepDefinition>,
}

#[derive(Debug, Default)]
pub struct Pipeline {
    steps: Vec<Box<dyn Step>>,
    side_effects: SideEffects,
    strategies: Strategies,
    graph: Option<Arc<Graph>>,
    locked: bool,
}

impl Pipeline {
    /// Empty pipeline with its own side-effect store
    pub fn new() -> Self {
        Self::default()
    }

    /// Read from `graph` when executed
    pub fn with_graph(mut self, graph: Arc<Graph>) -> Self {
        self.graph = Some(graph);
        self
    }

    pub fn with_strategies(mut self, strategies: Strategies) -> Self {
        self.strategies = strategies;
        self
    }

    /// Builder-style `add_step`
    pub fn then(mut self, step: impl Step + 'static) -> Result<Self, PipelineError> {
        self.add_step(step)?;
        Ok(self)
    }

    pub fn add_step(&mut self, step: impl Step + 'static) -> Result<(), PipelineError> {
        self.push_step(Box::new(step))
    }

    /// Append a boxed step, enforcing label uniqueness
    pub fn push_step(&mut self, step: Box<dyn Step>) -> Result<(), PipelineError> {
        if self.locked {
            return Err(PipelineError::Locked);
        }
        if let Some(label) = step.label() {
            if self.step_by_label(label).is_some() {
                return Err(PipelineError::DuplicateLabel(label.to_string()));
            }
        }
        self.steps.push(step);
        Ok(())
    }

    /// Remove and return every step
    pub fn take_steps(&mut self) -> Result<Vec<Box<dyn Step>>, PipelineError> {
        if self.locked {
            return Err(PipelineError::Locked);
        }
        Ok(std::mem::take(&mut self.steps))
    }

    pub fn steps(&self) -> &[Box<dyn Step>] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step_by_label(&self, label: &str) -> Option<&dyn Step> {
        self.steps
            .iter()
            .find(|step| step.label() == Some(label))
            .map(|step| step.as_ref())
    }

    /// First step of concrete type `T`
    pub fn step<T: Step + 'static>(&self) -> Option<&T> {
        self.steps
            .iter()
            .find_map(|step| step.as_any().downcast_ref::<T>())
    }

    pub fn step_mut<T: Step + 'static>(&mut self) -> Option<&mut T> {
        self.steps
            .iter_mut()
            .find_map(|step| step.as_any_mut().downcast_mut::<T>())
    }

    pub fn side_effects(&self) -> &SideEffects {
        &self.side_effects
    }

    /// Use `side_effects` as this pipeline's store from now on
    pub fn set_side_effects(&mut self, side_effects: SideEffects) {
        self.side_effects = side_effects;
    }

    pub fn strategies(&self) -> &Strategies {
        &self.strategies
    }

    pub fn set_strategies(&mut self, strategies: Strategies) {
        self.strategies = strategies;
    }

    pub fn graph(&self) -> Option<&Arc<Graph>> {
        self.graph.as_ref()
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Run every strategy once, then lock the pipeline against further edits.
    /// Calling again on a locked pipeline does nothing.
    pub fn apply_strategies(&mut self) -> Result<(), StrategyError> {
        if self.locked {
            return Ok(());
        }

        let strategies = self.strategies.clone();
        debug!(
            "Applying strategies [{}] to {}",
            strategies.ids().join(", "),
            self
        );
        strategies.apply(self)?;
        self.locked = true;
        Ok(())
    }

    /// Union of every step's traverser requirements
    pub fn requirements(&self) -> Requirements {
        self.steps
            .iter()
            .flat_map(|step| step.requirements())
            .collect()
    }

    /// Fail when a step needs something `supported` does not provide
    pub fn verify_requirements(&self, supported: &Requirements) -> Result<(), PipelineError> {
        let missing: Vec<TraverserRequirement> = self
            .requirements()
            .difference(supported)
            .copied()
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::UnsupportedRequirements(missing))
        }
    }

    /// Aggregations contributed by the steps, in step order
    pub fn map_reducers(&self) -> Vec<Box<dyn MapReduce>> {
        self.steps
            .iter()
            .filter_map(|step| step.map_reducer())
            .collect()
    }

    pub fn definition(&self) -> Result<PipelineDefinition, PipelineError> {
        let steps = self
            .steps
            .iter()
            .map(|step| step.definition())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PipelineDefinition { steps })
    }

    /// Rebuild a pipeline from its definition.
    ///
    /// The result has a fresh side-effect store and no strategies; labels are
    /// validated again.
    pub fn from_definition(
        definition: &PipelineDefinition,
        lambdas: &LambdaRegistry,
    ) -> Result<Self, PipelineError> {
        let mut labels = HashSet::new();
        let mut pipeline = Pipeline::new();

        for step_definition in &definition.steps {
            let step = step_definition.materialize(lambdas)?;
            if let Some(label) = step.label() {
                if !labels.insert(label.to_string()) {
                    return Err(PipelineError::DuplicateLabel(label.to_string()));
                }
            }
            pipeline.steps.push(step);
        }

        Ok(pipeline)
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let steps: Vec<String> = self
            .steps
            .iter()
            .map(|step| step_string(step.as_ref()))
            .collect();
        write!(f, "[{}]", steps.join(", "))
    }
}
