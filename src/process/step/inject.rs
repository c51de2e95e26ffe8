use super::{Step, StepDefinition};
use crate::computer::{ComputerError, LocalSideEffects};
use crate::process::pipeline::PipelineError;
use crate::process::traverser::{Requirements, TraverserRequirement};
use serde_json::Value;
use std::any::Any;

/// Injects constant values into a pipeline.
///
/// The values do not originate from any vertex, so the step cannot be
/// partitioned across workers and is rejected inside vertex programs.
#[derive(Debug, Clone)]
pub struct InjectStep {
    label: Option<String>,
    values: Vec<Value>,
}

impl InjectStep {
    pub fn new(values: Vec<Value>) -> Self {
        Self {
            label: None,
            values,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

impl Step for InjectStep {
    fn name(&self) -> &'static str {
        "InjectStep"
    }

    fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    fn requirements(&self) -> Requirements {
        [TraverserRequirement::Object, TraverserRequirement::Bulk]
            .into_iter()
            .collect()
    }

    fn is_distributable(&self) -> bool {
        false
    }

    fn definition(&self) -> Result<StepDefinition, PipelineError> {
        Ok(StepDefinition::Inject {
            label: self.label.clone(),
            values: self.values.clone(),
        })
    }

    fn execute_on_vertex(
        &self,
        _vertex: &Value,
        _local: &mut LocalSideEffects,
    ) -> Result<bool, ComputerError> {
        Err(ComputerError::NotDistributable {
            step: self.name().to_string(),
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
