//! Group-by side-effect step
//!
//! Inside a vertex program every vertex files `value_fn(vertex)` under
//! `key_fn(vertex)` in its local contribution for `side_effect_key`. The
//! global grouping is produced afterwards by `GroupByMapReduce`, which finds
//! this step again by label to recover `reduce_fn`.

use super::{Step, StepDefinition};
use crate::computer::mapreduce::{GroupByMapReduce, MapReduce};
use crate::computer::{ComputerError, LocalSideEffects};
use crate::process::lambda::Lambda;
use crate::process::pipeline::PipelineError;
use crate::process::traverser::{Requirements, TraverserRequirement};
use serde_json::{Map, Value};
use std::any::Any;

#[derive(Debug, Clone)]
pub struct GroupByStep {
    label: String,
    side_effect_key: String,
    key_fn: Lambda,
    value_fn: Option<Lambda>,
    reduce_fn: Option<Lambda>,
}

impl GroupByStep {
    /// Group by `key_fn`, publishing under `label` unless a side-effect key is set
    pub fn new(label: impl Into<String>, key_fn: Lambda) -> Self {
        let label = label.into();
        Self {
            side_effect_key: label.clone(),
            label,
            key_fn,
            value_fn: None,
            reduce_fn: None,
        }
    }

    pub fn with_side_effect_key(mut self, key: impl Into<String>) -> Self {
        self.side_effect_key = key.into();
        self
    }

    pub fn with_value_fn(mut self, value_fn: Lambda) -> Self {
        self.value_fn = Some(value_fn);
        self
    }

    pub fn with_reduce_fn(mut self, reduce_fn: Lambda) -> Self {
        self.reduce_fn = Some(reduce_fn);
        self
    }

    pub fn side_effect_key(&self) -> &str {
        &self.side_effect_key
    }

    pub fn step_label(&self) -> &str {
        &self.label
    }

    pub fn reduce_fn(&self) -> Option<&Lambda> {
        self.reduce_fn.as_ref()
    }
}

/// Group keys are strings; non-string keys use their JSON rendering.
///
/// The aggregation result is a JSON object, so a key and its string
/// rendering land in the same group: `1` and `"1"` are both `"1"`, and
/// `null` joins the group `"null"`.
pub fn group_key(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl Step for GroupByStep {
    fn name(&self) -> &'static str {
        "GroupByStep"
    }

    fn label(&self) -> Option<&str> {
        Some(&self.label)
    }

    fn requirements(&self) -> Requirements {
        [
            TraverserRequirement::Object,
            TraverserRequirement::SideEffects,
            TraverserRequirement::Labeled,
        ]
        .into_iter()
        .collect()
    }

    fn definition(&self) -> Result<StepDefinition, PipelineError> {
        Ok(StepDefinition::GroupBy {
            label: self.label.clone(),
            side_effect_key: self.side_effect_key.clone(),
            key_fn: self.key_fn.name().to_string(),
            value_fn: self.value_fn.as_ref().map(|f| f.name().to_string()),
            reduce_fn: self.reduce_fn.as_ref().map(|f| f.name().to_string()),
        })
    }

    fn execute_on_vertex(
        &self,
        vertex: &Value,
        local: &mut LocalSideEffects,
    ) -> Result<bool, ComputerError> {
        let key = group_key(&self.key_fn.apply(vertex));
        let value = match &self.value_fn {
            Some(value_fn) => value_fn.apply(vertex),
            None => vertex.clone(),
        };

        let invalid = |reason: &str| ComputerError::InvalidLocalSideEffect {
            vertex: vertex["id"].to_string(),
            key: self.side_effect_key.clone(),
            reason: reason.to_string(),
        };

        let groups = local
            .get_or_insert_with(&self.side_effect_key, || Value::Object(Map::new()))
            .as_object_mut()
            .ok_or_else(|| invalid("contribution is not an object"))?;

        match groups.entry(key).or_insert_with(|| Value::Array(Vec::new())) {
            Value::Array(items) => items.push(value),
            _ => return Err(invalid("group entry is not an array")),
        }

        Ok(true)
    }

    fn map_reducer(&self) -> Option<Box<dyn MapReduce>> {
        Some(Box::new(GroupByMapReduce::from_step(self)))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
