use super::{PipelineStrategy, StrategyCategory, StrategyError};
use crate::computer::GraphComputer;
use crate::process::pipeline::Pipeline;
use crate::process::step::VertexProgramStep;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Moves a graph-bound pipeline's steps into a `VertexProgramStep`, so the
/// whole pipeline runs as one job on `computer`.
///
/// This strategy must not reach the wrapped sub-pipeline; the bridge removes
/// it from the set it derives for the inner pipeline.
#[derive(Clone)]
pub struct VertexProgramStrategy {
    computer: Arc<dyn GraphComputer>,
}

impl VertexProgramStrategy {
    pub const ID: &'static str = "VertexProgramStrategy";

    pub fn new(computer: Arc<dyn GraphComputer>) -> Self {
        Self { computer }
    }
}

impl fmt::Debug for VertexProgramStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(Self::ID)
    }
}

impl PipelineStrategy for VertexProgramStrategy {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn category(&self) -> StrategyCategory {
        StrategyCategory::Finalization
    }

    fn apply(&self, pipeline: &mut Pipeline) -> Result<(), StrategyError> {
        if pipeline.graph().is_none() || pipeline.is_empty() {
            return Ok(());
        }
        if pipeline.steps()[0]
            .as_any()
            .downcast_ref::<VertexProgramStep>()
            .is_some()
        {
            return Ok(());
        }

        let mut inner = Pipeline::new();
        for step in pipeline.take_steps()? {
            inner.push_step(step)?;
        }
        debug!("Wrapping {} in a vertex program step", inner);

        let step = VertexProgramStep::new(pipeline, inner, Arc::clone(&self.computer))
            .map_err(|e| StrategyError::Wrap(Box::new(e)))?;
        pipeline.add_step(step)?;
        Ok(())
    }
}
