use super::{Step, StepDefinition};
use crate::computer::{ComputerError, LocalSideEffects};
use crate::process::pipeline::PipelineError;
use crate::process::traverser::{Requirements, TraverserRequirement};
use serde_json::Value;
use std::any::Any;

/// Keeps vertices whose `property` equals `value`
#[derive(Debug, Clone)]
pub struct HasStep {
    label: Option<String>,
    property: String,
    value: Value,
}

impl HasStep {
    pub fn new(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            label: None,
            property: property.into(),
            value: value.into(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

impl Step for HasStep {
    fn name(&self) -> &'static str {
        "HasStep"
    }

    fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    fn requirements(&self) -> Requirements {
        [TraverserRequirement::Object].into_iter().collect()
    }

    fn definition(&self) -> Result<StepDefinition, PipelineError> {
        Ok(StepDefinition::Has {
            label: self.label.clone(),
            property: self.property.clone(),
            value: self.value.clone(),
        })
    }

    fn execute_on_vertex(
        &self,
        vertex: &Value,
        _local: &mut LocalSideEffects,
    ) -> Result<bool, ComputerError> {
        Ok(vertex["properties"].get(&self.property) == Some(&self.value))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
