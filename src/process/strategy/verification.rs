use super::{PipelineStrategy, StrategyCategory, StrategyError};
use crate::process::pipeline::Pipeline;
use crate::process::step::step_string;

/// Rejects pipelines holding steps that cannot run inside a vertex program
#[derive(Debug, Clone, Copy, Default)]
pub struct ComputerVerificationStrategy;

impl ComputerVerificationStrategy {
    pub const ID: &'static str = "ComputerVerificationStrategy";
}

impl PipelineStrategy for ComputerVerificationStrategy {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn category(&self) -> StrategyCategory {
        StrategyCategory::Verification
    }

    fn apply(&self, pipeline: &mut Pipeline) -> Result<(), StrategyError> {
        match pipeline.steps().iter().find(|step| !step.is_distributable()) {
            Some(step) => Err(StrategyError::Verification {
                step: step_string(step.as_ref()),
                reason: "step cannot be executed by a graph computer".to_string(),
            }),
            None => Ok(()),
        }
    }
}
