//! Global grouping for `GroupByStep`
//!
//! Only the side-effect key and the step label are stored in the job
//! configuration. The reduce function is never serialized: a worker rebuilds
//! the transported pipeline, finds the step carrying `step_label` and takes
//! that step's reduce function.
//!
//! The combine stage is skipped because a reduce function is not guaranteed
//! to give the same answer when applied to partial groups.

use super::{KeyValue, MapEmitter, MapReduce, ReduceEmitter, Stage};
use crate::computer::configuration::Configuration;
use crate::computer::program::PipelineVertexProgram;
use crate::computer::{ComputedVertex, ComputerError};
use crate::process::lambda::{Lambda, LambdaRegistry};
use crate::process::step::GroupByStep;
use serde_json::{Map, Value};
use tracing::trace;

pub const SIDE_EFFECT_KEY: &str = "pregel.groupBy.sideEffectKey";
pub const STEP_LABEL: &str = "pregel.groupBy.stepLabel";

#[derive(Debug, Clone)]
pub struct GroupByMapReduce {
    side_effect_key: String,
    step_label: String,
    reduce_fn: Option<Lambda>,
}

impl GroupByMapReduce {
    pub const KIND: &'static str = "group_by";

    pub fn from_step(step: &GroupByStep) -> Self {
        Self {
            side_effect_key: step.side_effect_key().to_string(),
            step_label: step.step_label().to_string(),
            reduce_fn: step.reduce_fn().cloned(),
        }
    }

    /// Rebuild from a job configuration, rebinding the reduce function from
    /// the step labelled `stepLabel` in the transported pipeline.
    pub fn load_state(
        configuration: &Configuration,
        lambdas: &LambdaRegistry,
    ) -> Result<Self, ComputerError> {
        let side_effect_key = configuration.get_string(SIDE_EFFECT_KEY)?.to_string();
        let step_label = configuration.get_string(STEP_LABEL)?.to_string();

        let pipeline = PipelineVertexProgram::load_pipeline(configuration, lambdas)?;
        let step = pipeline.step_by_label(&step_label).ok_or_else(|| {
            ComputerError::BindingLookupFailure {
                step_label: step_label.clone(),
                reason: "no step in the transported pipeline carries this label".to_string(),
            }
        })?;
        let group_by = step
            .as_any()
            .downcast_ref::<GroupByStep>()
            .ok_or_else(|| ComputerError::BindingLookupFailure {
                step_label: step_label.clone(),
                reason: format!("step is a {}, not a GroupByStep", step.name()),
            })?;

        Ok(Self {
            side_effect_key,
            reduce_fn: group_by.reduce_fn().cloned(),
            step_label,
        })
    }

    /// `MapReduceLoader` entry point
    pub fn load(
        configuration: &Configuration,
        lambdas: &LambdaRegistry,
    ) -> Result<Box<dyn MapReduce>, ComputerError> {
        Ok(Box::new(Self::load_state(configuration, lambdas)?))
    }

    pub fn step_label(&self) -> &str {
        &self.step_label
    }

    pub fn reduce_fn(&self) -> Option<&Lambda> {
        self.reduce_fn.as_ref()
    }
}

impl MapReduce for GroupByMapReduce {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn store_state(&self, configuration: &mut Configuration) {
        configuration.set_property(SIDE_EFFECT_KEY, self.side_effect_key.as_str());
        configuration.set_property(STEP_LABEL, self.step_label.as_str());
    }

    fn is_stage_applicable(&self, stage: Stage) -> bool {
        stage != Stage::Combine
    }

    fn map(
        &self,
        vertex: &ComputedVertex,
        emitter: &mut dyn MapEmitter,
    ) -> Result<(), ComputerError> {
        let invalid = |reason: &str| ComputerError::InvalidLocalSideEffect {
            vertex: vertex.vertex.id.to_string(),
            key: self.side_effect_key.clone(),
            reason: reason.to_string(),
        };

        let groups = match vertex.local.get(&self.side_effect_key) {
            None => return Ok(()),
            Some(Value::Object(groups)) => groups,
            Some(_) => return Err(invalid("contribution is not an object")),
        };

        for (key, values) in groups {
            if !values.is_array() {
                return Err(invalid("group entry is not an array"));
            }
            emitter.emit(key.clone(), values.clone());
        }
        Ok(())
    }

    fn reduce(
        &self,
        key: &str,
        values: &mut dyn Iterator<Item = Value>,
        emitter: &mut dyn ReduceEmitter,
    ) -> Result<(), ComputerError> {
        let mut combined = Vec::new();
        for value in values {
            match value {
                Value::Array(items) => combined.extend(items),
                other => combined.push(other),
            }
        }
        trace!("Reducing {} values for key '{}'", combined.len(), key);

        let combined = Value::Array(combined);
        let reduced = match &self.reduce_fn {
            Some(reduce_fn) => reduce_fn.apply(&combined),
            None => combined,
        };
        emitter.emit(key.to_string(), reduced);
        Ok(())
    }

    fn finalize(&self, pairs: Vec<KeyValue>) -> Value {
        Value::Object(pairs.into_iter().collect::<Map<String, Value>>())
    }

    fn side_effect_key(&self) -> &str {
        &self.side_effect_key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::computer::LocalSideEffects;
    use crate::process::pipeline::Pipeline;
    use crate::process::step::IdentityStep;
    use crate::structure::Vertex;
    use serde_json::json;

    fn vertex_with(id: u64, contribution: Value) -> ComputedVertex {
        let mut local = LocalSideEffects::default();
        local.set("groups", contribution);
        ComputedVertex {
            vertex: Vertex::new(id, "v"),
            local,
        }
    }

    fn binding(reduce_fn: Option<&str>) -> GroupByMapReduce {
        let lambdas = LambdaRegistry::with_builtins();
        GroupByMapReduce {
            side_effect_key: "groups".to_string(),
            step_label: "g1".to_string(),
            reduce_fn: reduce_fn.and_then(|name| lambdas.resolve(name)),
        }
    }

    fn run(mr: &GroupByMapReduce, vertices: &[ComputedVertex]) -> Value {
        let mut mapped: Vec<KeyValue> = Vec::new();
        for vertex in vertices {
            mr.map(vertex, &mut mapped).unwrap();
        }

        let mut shuffled: std::collections::BTreeMap<String, Vec<Value>> = Default::default();
        for (key, value) in mapped {
            shuffled.entry(key).or_default().push(value);
        }

        let mut reduced: Vec<KeyValue> = Vec::new();
        for (key, values) in shuffled {
            mr.reduce(&key, &mut values.into_iter(), &mut reduced).unwrap();
        }
        mr.finalize(reduced)
    }

    fn store(mr: &GroupByMapReduce, pipeline: &Pipeline) -> Configuration {
        let mut configuration = Configuration::new();
        PipelineVertexProgram::store_state(pipeline, &mut configuration).unwrap();
        mr.store_state(&mut configuration);
        configuration
    }

    #[test]
    fn test_concatenates_without_reduce_fn() {
        let vertices = [
            vertex_with(1, json!({"k1": [1, 2]})),
            vertex_with(2, json!({"k1": [3]})),
        ];

        let result = run(&binding(None), &vertices);

        let mut values: Vec<i64> = result["k1"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_i64().unwrap())
            .collect();
        values.sort();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn test_applies_reduce_fn() {
        let vertices = [
            vertex_with(1, json!({"k1": [1, 2]})),
            vertex_with(2, json!({"k1": [3]})),
        ];

        assert_eq!(run(&binding(Some("sum")), &vertices), json!({"k1": 6}));
    }

    #[test]
    fn test_missing_contribution_is_empty() {
        let empty = ComputedVertex::new(Vertex::new(9, "v"));
        let mut mapped: Vec<KeyValue> = Vec::new();

        binding(None).map(&empty, &mut mapped).unwrap();

        assert!(mapped.is_empty());
    }

    #[test]
    fn test_key_set_is_union_of_mapped_keys() {
        let vertices = [
            vertex_with(1, json!({"a": [1]})),
            vertex_with(2, json!({"b": [2], "c": [3]})),
            ComputedVertex::new(Vertex::new(3, "v")),
        ];

        let result = run(&binding(Some("count")), &vertices);
        let mut keys: Vec<&String> = result.as_object().unwrap().keys().collect();
        keys.sort();
        assert_eq!(keys, vec!["a", "b", "c"]);
        assert_eq!(result["b"], json!(1));
    }

    #[test]
    fn test_malformed_contribution_is_rejected() {
        let vertex = vertex_with(1, json!([1, 2]));
        let mut mapped: Vec<KeyValue> = Vec::new();

        let err = binding(None).map(&vertex, &mut mapped).unwrap_err();
        assert!(matches!(err, ComputerError::InvalidLocalSideEffect { .. }));
    }

    #[test]
    fn test_skips_only_combine() {
        let mr = binding(None);
        assert!(mr.is_stage_applicable(Stage::Map));
        assert!(!mr.is_stage_applicable(Stage::Combine));
        assert!(mr.is_stage_applicable(Stage::Reduce));
    }

    #[test]
    fn test_store_state_writes_two_strings() {
        let mut configuration = Configuration::new();
        binding(Some("sum")).store_state(&mut configuration);

        assert_eq!(configuration.len(), 2);
        assert_eq!(configuration.get_string(SIDE_EFFECT_KEY), Ok("groups"));
        assert_eq!(configuration.get_string(STEP_LABEL), Ok("g1"));
    }

    #[test]
    fn test_load_state_rebinds_reduce_fn_from_step() {
        let mut lambdas = LambdaRegistry::with_builtins();
        let sum = Lambda::new("sum", |v| {
            json!(v.as_array().map(|a| a.iter().filter_map(Value::as_i64).sum::<i64>()))
        });
        lambdas.register(sum.clone());

        let step = GroupByStep::new("g1", lambdas.resolve("label").unwrap())
            .with_side_effect_key("groups")
            .with_reduce_fn(sum.clone());
        let pipeline = Pipeline::new().then(step).unwrap();
        let configuration = store(&GroupByMapReduce::from_step(pipeline.step().unwrap()), &pipeline);

        let loaded = GroupByMapReduce::load_state(&configuration, &lambdas).unwrap();

        assert_eq!(loaded.side_effect_key(), "groups");
        assert_eq!(loaded.step_label(), "g1");
        assert!(loaded.reduce_fn().unwrap().same_function(&sum));
    }

    #[test]
    fn test_load_state_missing_label_fails() {
        let lambdas = LambdaRegistry::with_builtins();
        let pipeline = Pipeline::new()
            .then(GroupByStep::new("g1", lambdas.resolve("label").unwrap()))
            .unwrap();
        let mut configuration = store(&binding(None), &pipeline);
        configuration.set_property(STEP_LABEL, "missing");

        let err = GroupByMapReduce::load_state(&configuration, &lambdas).unwrap_err();
        assert!(
            matches!(err, ComputerError::BindingLookupFailure { ref step_label, .. } if step_label == "missing")
        );
    }

    #[test]
    fn test_load_state_wrong_step_kind_fails() {
        let lambdas = LambdaRegistry::with_builtins();
        let pipeline = Pipeline::new()
            .then(IdentityStep::new().with_label("g1"))
            .unwrap();
        let configuration = store(&binding(None), &pipeline);

        let err = GroupByMapReduce::load_state(&configuration, &lambdas).unwrap_err();
        assert!(matches!(err, ComputerError::BindingLookupFailure { .. }));
        assert!(err.to_string().contains("IdentityStep"));
    }

    #[test]
    fn test_load_state_requires_both_fields() {
        let lambdas = LambdaRegistry::with_builtins();
        let mut configuration = Configuration::new();
        configuration.set_property(SIDE_EFFECT_KEY, "groups");

        let err = GroupByMapReduce::load_state(&configuration, &lambdas).unwrap_err();
        assert!(matches!(err, ComputerError::Configuration(_)));
    }
}
