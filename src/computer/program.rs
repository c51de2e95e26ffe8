//! Vertex program that executes a pipeline on every vertex

use super::configuration::Configuration;
use super::mapreduce::MapReduce;
use super::{ComputedVertex, ComputerError};
use crate::process::lambda::LambdaRegistry;
use crate::process::pipeline::{Pipeline, PipelineDefinition};
use crate::structure::Vertex;

/// Configuration key of the transported pipeline definition
pub const PIPELINE: &str = "pregel.vertexProgram.pipeline";
/// Configuration key of the side-effect snapshot taken at submission
pub const SIDE_EFFECTS: &str = "pregel.vertexProgram.sideEffects";

/// Worker-side program: the transported pipeline, rebuilt
#[derive(Debug)]
pub struct PipelineVertexProgram {
    pipeline: Pipeline,
}

impl PipelineVertexProgram {
    /// Write `pipeline`'s definition into `configuration`.
    /// Fails when a step cannot be transported.
    pub fn store_state(
        pipeline: &Pipeline,
        configuration: &mut Configuration,
    ) -> Result<(), ComputerError> {
        let definition = serde_json::to_value(pipeline.definition()?)?;
        configuration.set_property(PIPELINE, definition);
        Ok(())
    }

    /// Rebuild the program on a worker
    pub fn load_state(
        configuration: &Configuration,
        lambdas: &LambdaRegistry,
    ) -> Result<Self, ComputerError> {
        let definition = Self::load_definition(configuration)?;
        let pipeline = Pipeline::from_definition(&definition, lambdas)?;
        Ok(Self { pipeline })
    }

    /// Materialize only the transported pipeline
    pub fn load_pipeline(
        configuration: &Configuration,
        lambdas: &LambdaRegistry,
    ) -> Result<Pipeline, ComputerError> {
        Ok(Self::load_state(configuration, lambdas)?.pipeline)
    }

    fn load_definition(configuration: &Configuration) -> Result<PipelineDefinition, ComputerError> {
        let value = configuration.require(PIPELINE)?;
        Ok(serde_json::from_value(value.clone())?)
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Run the pipeline's steps against one vertex
    pub fn execute(&self, vertex: &Vertex) -> Result<ComputedVertex, ComputerError> {
        let mut computed = ComputedVertex::new(vertex.clone());
        let value = vertex.to_value();

        for step in self.pipeline.steps() {
            if !step.execute_on_vertex(&value, &mut computed.local)? {
                break;
            }
        }
        Ok(computed)
    }

    /// Aggregations of the loaded pipeline
    pub fn map_reducers(&self) -> Vec<Box<dyn MapReduce>> {
        self.pipeline.map_reducers()
    }
}
