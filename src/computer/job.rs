//! Transportable job descriptor

use super::configuration::Configuration;
use super::program::{PipelineVertexProgram, SIDE_EFFECTS};
use super::ComputerError;
use crate::process::pipeline::Pipeline;
use crate::structure::Graph;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

/// One aggregation of a job: its registry kind and its own configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapReduceSpec {
    pub kind: String,
    pub configuration: Configuration,
}

/// Everything a graph computer needs to run a pipeline over a graph
#[derive(Debug, Clone)]
pub struct ComputerJob {
    pub id: String,
    /// Vertex program configuration: pipeline definition and side-effect snapshot
    pub configuration: Configuration,
    /// Each aggregation's configuration also carries the pipeline definition,
    /// since workers rebind functions from it
    pub map_reduces: Vec<MapReduceSpec>,
    pub graph: Arc<Graph>,
}

impl ComputerJob {
    /// Describe a run of `pipeline` over `graph`
    pub fn build(pipeline: &Pipeline, graph: Arc<Graph>) -> Result<Self, ComputerError> {
        let mut configuration = Configuration::new();
        PipelineVertexProgram::store_state(pipeline, &mut configuration)?;

        let snapshot: BTreeMap<String, Value> = pipeline.side_effects().snapshot();
        configuration.set_property(SIDE_EFFECTS, serde_json::to_value(snapshot)?);

        let map_reduces = pipeline
            .map_reducers()
            .into_iter()
            .map(|map_reduce| {
                let mut spec_configuration = configuration.clone();
                map_reduce.store_state(&mut spec_configuration);
                MapReduceSpec {
                    kind: map_reduce.kind().to_string(),
                    configuration: spec_configuration,
                }
            })
            .collect();

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            configuration,
            map_reduces,
            graph,
        })
    }

    /// Side effects as they were when the job was built
    pub fn initial_side_effects(&self) -> Result<BTreeMap<String, Value>, ComputerError> {
        match self.configuration.get(SIDE_EFFECTS) {
            Some(value) => Ok(serde_json::from_value(value.clone())?),
            None => Ok(BTreeMap::new()),
        }
    }
}
