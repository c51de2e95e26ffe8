//! Bridge from a pipeline to a graph computer
//!
//! A `VertexProgramStep` owns the sub-pipeline that must run as a vertex
//! program. Constructing it joins the sub-pipeline to the enclosing one: the
//! side-effect stores become one instance, and the strategies of the
//! enclosing pipeline are carried over, minus the rewrite that created the
//! bridge and plus a verification pass.
//!
//! The step produces exactly one result. The first `pull` submits the whole
//! sub-pipeline as a single job, blocks until it finishes and returns the
//! job's result; every later `pull` reports exhaustion.

use super::{step_string, Step, StepDefinition, StepError};
use crate::computer::{ComputerError, ComputerJob, ComputerResult, GraphComputer, LocalSideEffects};
use crate::process::pipeline::{Pipeline, PipelineError};
use crate::process::side_effects::SideEffects;
use crate::process::strategy::{
    ComputerVerificationStrategy, Strategies, StrategyError, VertexProgramStrategy,
};
use crate::process::traverser::{Requirements, Traverser};
use crate::structure::Graph;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Where the bridge is in its single-shot lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    /// Job not yet submitted
    Pending,
    /// Job submitted; no further output
    Done,
}

pub struct VertexProgramStep {
    label: Option<String>,
    inner: Pipeline,
    computer: Arc<dyn GraphComputer>,
    graph: Arc<Graph>,
    side_effects: SideEffects,
    state: BridgeState,
}

/// Strategies for a pipeline that runs inside a vertex program
pub fn computer_strategies(outer: &Strategies) -> Strategies {
    outer
        .without(VertexProgramStrategy::ID)
        .with(Arc::new(ComputerVerificationStrategy))
}

impl VertexProgramStep {
    /// Bridge `inner` to `computer`, reading from `outer`'s graph.
    ///
    /// Fails when `outer` has no graph, when `inner` already had its
    /// strategies applied, or when `inner` holds a step that cannot run on a
    /// graph computer.
    pub fn new(
        outer: &Pipeline,
        mut inner: Pipeline,
        computer: Arc<dyn GraphComputer>,
    ) -> Result<Self, StepError> {
        let graph = outer.graph().cloned().ok_or(StepError::MissingGraph)?;
        // a locked pipeline would skip the verification pass below
        if inner.is_locked() {
            return Err(StrategyError::Pipeline(PipelineError::Locked).into());
        }

        let side_effects = outer.side_effects().clone();
        inner.side_effects().merge_into(&side_effects);
        inner.set_side_effects(side_effects.clone());

        inner.set_strategies(computer_strategies(outer.strategies()));
        inner.apply_strategies()?;
        debug!("Bridged {} to {:?}", inner, computer);

        Ok(Self {
            label: None,
            inner,
            computer,
            graph,
            side_effects,
            state: BridgeState::Pending,
        })
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn inner(&self) -> &Pipeline {
        &self.inner
    }

    pub fn state(&self) -> BridgeState {
        self.state
    }

    /// Shared store of the enclosing and the bridged pipeline
    pub fn side_effects(&self) -> &SideEffects {
        &self.side_effects
    }

    /// Run the job on the first call; report exhaustion on every later one.
    ///
    /// Blocks the caller until the graph computer finished.
    pub fn pull(&mut self) -> Result<Traverser<ComputerResult>, StepError> {
        if self.state == BridgeState::Done {
            return Err(StepError::IterationExhausted);
        }
        self.state = BridgeState::Done;

        let result = self.submit().map_err(|source| {
            error!("Vertex program for {} failed: {}", self.inner, source);
            StepError::JobSubmissionFailure { source }
        })?;

        self.side_effects.publish(&result.side_effects);
        info!(
            "Vertex program job {} finished in {:?}; published [{}]",
            result.job_id,
            result.runtime,
            result.side_effects.keys().join(", ")
        );

        Ok(Traverser::new(result, step_string(self), 1))
    }

    fn submit(&self) -> Result<ComputerResult, ComputerError> {
        let job = ComputerJob::build(&self.inner, Arc::clone(&self.graph))?;
        info!(
            "Submitting job {} with {} aggregation(s)",
            job.id,
            job.map_reduces.len()
        );
        futures::executor::block_on(self.computer.submit(job))
    }
}

impl Iterator for VertexProgramStep {
    type Item = Result<Traverser<ComputerResult>, StepError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.pull() {
            Err(StepError::IterationExhausted) => None,
            other => Some(other),
        }
    }
}

impl Step for VertexProgramStep {
    fn name(&self) -> &'static str {
        "VertexProgramStep"
    }

    fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    fn requirements(&self) -> Requirements {
        self.inner.requirements()
    }

    fn is_distributable(&self) -> bool {
        false
    }

    fn definition(&self) -> Result<StepDefinition, PipelineError> {
        Err(PipelineError::NotTransportable {
            step: step_string(self),
        })
    }

    fn execute_on_vertex(
        &self,
        _vertex: &Value,
        _local: &mut LocalSideEffects,
    ) -> Result<bool, ComputerError> {
        Err(ComputerError::NotDistributable {
            step: step_string(self),
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl fmt::Display for VertexProgramStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.inner)
    }
}

impl fmt::Debug for VertexProgramStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VertexProgramStep")
            .field("label", &self.label)
            .field("inner", &self.inner.to_string())
            .field("state", &self.state)
            .finish()
    }
}
