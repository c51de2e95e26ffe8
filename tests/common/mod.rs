//! Common test utilities and helpers

#![allow(dead_code)]

use pregel_bridge::app::EngineConfig;
use pregel_bridge::computer::{ComputerResult, GraphComputer, LocalGraphComputer};
use pregel_bridge::process::step::{GroupByStep, VertexProgramStep};
use pregel_bridge::process::{LambdaRegistry, Pipeline, Step, StepError, Strategies};
use pregel_bridge::process::strategy::VertexProgramStrategy;
use pregel_bridge::structure::{Graph, Vertex};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// The six-vertex "modern" toy graph
pub fn modern_vertices() -> Vec<Vertex> {
    vec![
        Vertex::new(1, "person")
            .with_property("name", "marko")
            .with_property("age", 29),
        Vertex::new(2, "person")
            .with_property("name", "vadas")
            .with_property("age", 27),
        Vertex::new(3, "software")
            .with_property("name", "lop")
            .with_property("lang", "java"),
        Vertex::new(4, "person")
            .with_property("name", "josh")
            .with_property("age", 32),
        Vertex::new(5, "software")
            .with_property("name", "ripple")
            .with_property("lang", "java"),
        Vertex::new(6, "person")
            .with_property("name", "peter")
            .with_property("age", 35),
    ]
}

pub fn modern_graph() -> Arc<Graph> {
    Arc::new(Graph::from_vertices(modern_vertices()).expect("modern graph has unique ids"))
}

/// Writes files into a temporary directory that lives as long as the fixture
pub struct Fixture {
    pub dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp dir"),
        }
    }

    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, contents).expect("write fixture file");
        path
    }

    /// The modern graph as a JSON graph document
    pub fn modern_graph_file(&self) -> PathBuf {
        let document = serde_json::json!({ "vertices": modern_vertices() });
        self.write("modern.json", &document.to_string())
    }
}

pub fn local_computer(workers: usize, lambdas: LambdaRegistry) -> Arc<dyn GraphComputer> {
    let config = EngineConfig::default().with_workers(workers);
    Arc::new(LocalGraphComputer::new(config, lambdas).expect("start local computer"))
}

/// Outer pipeline over `graph` that bridges itself to `computer`
pub fn bridged(graph: Arc<Graph>, computer: Arc<dyn GraphComputer>) -> Pipeline {
    Pipeline::new()
        .with_graph(graph)
        .with_strategies(Strategies::new().with(Arc::new(VertexProgramStrategy::new(computer))))
}

/// Apply strategies and pull the bridge once
pub fn run(pipeline: &mut Pipeline) -> Result<ComputerResult, StepError> {
    pipeline.apply_strategies()?;
    let bridge = pipeline
        .step_mut::<VertexProgramStep>()
        .expect("pipeline was bridged");
    assert_eq!(bridge.name(), "VertexProgramStep");
    Ok(bridge.pull()?.into_inner())
}

pub fn group_by_label(lambdas: &LambdaRegistry, label: &str) -> GroupByStep {
    GroupByStep::new(label, lambdas.resolve("label").expect("built-in lambda"))
}
