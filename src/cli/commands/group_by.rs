//! `group-by` command: one group-by aggregation over a JSON graph
//!
//! The pipeline is built against the graph with a `VertexProgramStrategy`,
//! so applying strategies wraps it into a single vertex program job on the
//! local graph computer.

use crate::app::config::EngineConfig;
use crate::cli::args::GroupByArgs;
use crate::computer::{GraphComputer, LocalGraphComputer};
use crate::error::{Error, Result};
use crate::process::lambda::{Lambda, LambdaRegistry};
use crate::process::pipeline::{Pipeline, PipelineError};
use crate::process::step::{GroupByStep, HasStep, VertexProgramStep};
use crate::process::strategy::{Strategies, VertexProgramStrategy};
use crate::process::traverser::all_requirements;
use crate::structure::Graph;
use anyhow::Context;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// Execute the group-by command, printing the aggregation as JSON
pub fn run_group_by(args: GroupByArgs) -> anyhow::Result<()> {
    let result = group_by(&args)?;
    let rendered =
        serde_json::to_string_pretty(&result).context("Failed to render aggregation result")?;
    println!("{rendered}");
    Ok(())
}

/// Run the aggregation and return what it published
pub fn group_by(args: &GroupByArgs) -> Result<Value> {
    let engine = engine_config(args)?;
    let graph = Arc::new(Graph::load(&args.graph)?);
    debug!(
        "Loaded {} vertices from {}",
        graph.vertex_count(),
        args.graph.display()
    );

    let lambdas = LambdaRegistry::with_builtins();
    let mut step = GroupByStep::new(args.label.clone(), resolve(&lambdas, &args.key)?);
    if let Some(key) = &args.side_effect_key {
        step = step.with_side_effect_key(key.clone());
    }
    if let Some(name) = &args.value {
        step = step.with_value_fn(resolve(&lambdas, name)?);
    }
    if let Some(name) = &args.reduce {
        step = step.with_reduce_fn(resolve(&lambdas, name)?);
    }
    let side_effect_key = step.side_effect_key().to_string();

    let computer: Arc<dyn GraphComputer> = Arc::new(LocalGraphComputer::new(engine, lambdas)?);
    let mut pipeline = Pipeline::new()
        .with_graph(graph)
        .with_strategies(Strategies::new().with(Arc::new(VertexProgramStrategy::new(computer))));
    for (property, value) in &args.has {
        pipeline.add_step(HasStep::new(property.clone(), value.clone()))?;
    }
    pipeline.add_step(step)?;

    pipeline.apply_strategies()?;
    pipeline.verify_requirements(&all_requirements())?;

    let bridge = pipeline
        .step_mut::<VertexProgramStep>()
        .ok_or_else(|| Error::InvalidArgument("pipeline was not bridged to a graph computer".to_string()))?;
    let traverser = bridge.pull()?;
    info!(
        "Aggregated {} vertices into '{}'",
        traverser.get().vertices.len(),
        side_effect_key
    );

    Ok(pipeline
        .side_effects()
        .get(&side_effect_key)
        .unwrap_or(Value::Null))
}

fn engine_config(args: &GroupByArgs) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(workers) = args.workers {
        config = config.with_workers(workers);
        config.validate()?;
    }
    Ok(config)
}

fn resolve(lambdas: &LambdaRegistry, name: &str) -> Result<Lambda> {
    lambdas
        .resolve(name)
        .ok_or_else(|| PipelineError::UnknownLambda(name.to_string()).into())
}
