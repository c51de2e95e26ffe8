//! In-process graph computer
//!
//! Jobs run on a dedicated tokio runtime. `workers` is both the number of
//! contiguous vertex partitions and the bound on blocking threads, so no
//! more than `workers` partition tasks (map or reduce) run at once. Every
//! worker task deserializes the job
//! configuration and rebuilds the vertex program and each aggregation from
//! it, so nothing but the configuration is shared between the submitting
//! side and the workers.
//!
//! ```text
//! vertex program (per partition)
//!   └─ for each aggregation:
//!        map [+ combine] (per partition) → shuffle by key
//!          → reduce (per key partition) → finalize → publish
//! ```

use super::configuration::Configuration;
use super::job::{ComputerJob, MapReduceSpec};
use super::mapreduce::{KeyValue, MapReduce, MapReduceRegistry, Stage};
use super::program::PipelineVertexProgram;
use super::{ComputedVertex, ComputerError, ComputerResult, GraphComputer};
use crate::app::config::EngineConfig;
use crate::process::lambda::LambdaRegistry;
use crate::process::side_effects::SideEffects;
use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use serde_json::Value;
use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

#[derive(Debug)]
pub struct LocalGraphComputer {
    config: EngineConfig,
    context: WorkerContext,
    runtime: Runtime,
}

/// What every worker task gets: the code-side registries, never live objects
#[derive(Debug, Clone)]
struct WorkerContext {
    lambdas: Arc<LambdaRegistry>,
    map_reducers: Arc<MapReduceRegistry>,
    workers: usize,
    reduce_partitions: usize,
}

impl WorkerContext {
    fn load_map_reduce(
        &self,
        kind: &str,
        transported: &str,
    ) -> Result<Box<dyn MapReduce>, ComputerError> {
        let configuration: Configuration = serde_json::from_str(transported)?;
        self.map_reducers
            .load(kind, &configuration, &self.lambdas)
    }
}

impl LocalGraphComputer {
    pub fn new(config: EngineConfig, lambdas: LambdaRegistry) -> Result<Self, ComputerError> {
        let workers = config.workers.max(1);
        let runtime = tokio::runtime::Builder::new_multi_thread()
            // async side only awaits the partition tasks
            .worker_threads(1)
            .max_blocking_threads(workers)
            .thread_name("pregel-worker")
            .enable_all()
            .build()
            .map_err(ComputerError::Runtime)?;

        let context = WorkerContext {
            lambdas: Arc::new(lambdas),
            map_reducers: Arc::new(MapReduceRegistry::default()),
            workers,
            reduce_partitions: config.reduce_partitions().max(1),
        };

        Ok(Self {
            config,
            context,
            runtime,
        })
    }

    /// Replace the aggregation loaders workers know about
    pub fn with_map_reducers(mut self, registry: MapReduceRegistry) -> Self {
        self.context.map_reducers = Arc::new(registry);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl GraphComputer for LocalGraphComputer {
    fn submit(&self, job: ComputerJob) -> BoxFuture<'static, Result<ComputerResult, ComputerError>> {
        let job_id = job.id.clone();
        let handle = self.runtime.spawn(run_job(job, self.context.clone()));

        async move {
            let result = handle
                .await
                .map_err(|e| ComputerError::WorkerFailed {
                    worker: 0,
                    reason: e.to_string(),
                })
                .and_then(|result| result);

            if let Err(e) = &result {
                error!("Job {} failed: {}", job_id, e);
            }
            result
        }
        .boxed()
    }
}

async fn run_job(job: ComputerJob, context: WorkerContext) -> Result<ComputerResult, ComputerError> {
    let started = Instant::now();
    info!(
        "Starting job {} over {} vertices with {} workers",
        job.id,
        job.graph.vertex_count(),
        context.workers
    );

    let transported = Arc::new(serde_json::to_string(&job.configuration)?);
    let handles: Vec<_> = partition_ranges(job.graph.vertex_count(), context.workers)
        .into_iter()
        .map(|range| {
            let graph = Arc::clone(&job.graph);
            let transported = Arc::clone(&transported);
            let lambdas = Arc::clone(&context.lambdas);

            tokio::task::spawn_blocking(move || -> Result<Vec<ComputedVertex>, ComputerError> {
                let configuration: Configuration = serde_json::from_str(&transported)?;
                let program = PipelineVertexProgram::load_state(&configuration, &lambdas)?;
                graph.vertices()[range]
                    .iter()
                    .map(|vertex| program.execute(vertex))
                    .collect()
            })
        })
        .collect();
    let partitions = Arc::new(join_workers(handles).await?);
    debug!("Job {} finished the vertex program", job.id);

    let side_effects = SideEffects::from_entries(job.initial_side_effects()?);
    for spec in &job.map_reduces {
        let (key, value) = run_map_reduce(spec, Arc::clone(&partitions), &context).await?;
        debug!("Job {} publishing side effect '{}'", job.id, key);
        side_effects.set(key, value);
    }

    let vertices = Arc::try_unwrap(partitions)
        .unwrap_or_else(|shared| shared.as_ref().clone())
        .into_iter()
        .flatten()
        .collect();

    let runtime = started.elapsed();
    info!("Job {} completed in {:?}", job.id, runtime);

    Ok(ComputerResult {
        job_id: job.id,
        vertices,
        side_effects,
        runtime,
    })
}

async fn run_map_reduce(
    spec: &MapReduceSpec,
    partitions: Arc<Vec<Vec<ComputedVertex>>>,
    context: &WorkerContext,
) -> Result<(String, Value), ComputerError> {
    let transported = Arc::new(serde_json::to_string(&spec.configuration)?);
    let master = context.load_map_reduce(&spec.kind, &transported)?;
    debug!(
        "Running {} aggregation into '{}'",
        spec.kind,
        master.side_effect_key()
    );

    let handles: Vec<_> = (0..partitions.len())
        .map(|worker| {
            let partitions = Arc::clone(&partitions);
            let transported = Arc::clone(&transported);
            let context = context.clone();
            let kind = spec.kind.clone();

            tokio::task::spawn_blocking(move || {
                let map_reduce = context.load_map_reduce(&kind, &transported)?;
                map_partition(map_reduce.as_ref(), &partitions[worker])
            })
        })
        .collect();

    let mut shuffled: BTreeMap<String, Vec<Value>> = BTreeMap::new();
    for (key, value) in join_workers(handles).await?.into_iter().flatten() {
        shuffled.entry(key).or_default().push(value);
    }

    let pairs: Vec<KeyValue> = if master.is_stage_applicable(Stage::Reduce) {
        let groups: Vec<(String, Vec<Value>)> = shuffled.into_iter().collect();
        let handles: Vec<_> = split_evenly(groups, context.reduce_partitions)
            .into_iter()
            .map(|chunk| {
                let transported = Arc::clone(&transported);
                let context = context.clone();
                let kind = spec.kind.clone();

                tokio::task::spawn_blocking(move || {
                    let map_reduce = context.load_map_reduce(&kind, &transported)?;
                    reduce_partition(map_reduce.as_ref(), chunk)
                })
            })
            .collect();
        join_workers(handles).await?.into_iter().flatten().collect()
    } else {
        shuffled
            .into_iter()
            .flat_map(|(key, values)| values.into_iter().map(move |value| (key.clone(), value)))
            .collect()
    };

    Ok((master.side_effect_key().to_string(), master.finalize(pairs)))
}

fn map_partition(
    map_reduce: &dyn MapReduce,
    vertices: &[ComputedVertex],
) -> Result<Vec<KeyValue>, ComputerError> {
    let mut emitted: Vec<KeyValue> = Vec::new();
    if map_reduce.is_stage_applicable(Stage::Map) {
        for vertex in vertices {
            map_reduce.map(vertex, &mut emitted)?;
        }
    }

    if !map_reduce.is_stage_applicable(Stage::Combine) {
        return Ok(emitted);
    }

    let mut combined: Vec<KeyValue> = Vec::new();
    for (key, values) in group_by_key(emitted) {
        map_reduce.combine(&key, &mut values.into_iter(), &mut combined)?;
    }
    Ok(combined)
}

fn reduce_partition(
    map_reduce: &dyn MapReduce,
    groups: Vec<(String, Vec<Value>)>,
) -> Result<Vec<KeyValue>, ComputerError> {
    let mut reduced: Vec<KeyValue> = Vec::new();
    for (key, values) in groups {
        map_reduce.reduce(&key, &mut values.into_iter(), &mut reduced)?;
    }
    Ok(reduced)
}

fn group_by_key(pairs: Vec<KeyValue>) -> BTreeMap<String, Vec<Value>> {
    let mut groups: BTreeMap<String, Vec<Value>> = BTreeMap::new();
    for (key, value) in pairs {
        groups.entry(key).or_default().push(value);
    }
    groups
}

/// Wait for every worker; the first failure fails the whole stage
async fn join_workers<T>(
    handles: Vec<JoinHandle<Result<T, ComputerError>>>,
) -> Result<Vec<T>, ComputerError> {
    let mut outputs = Vec::with_capacity(handles.len());
    for (worker, joined) in join_all(handles).await.into_iter().enumerate() {
        let output = joined.map_err(|e| ComputerError::WorkerFailed {
            worker,
            reason: e.to_string(),
        })??;
        outputs.push(output);
    }
    Ok(outputs)
}

/// Split `0..len` into at most `parts` contiguous, non-empty ranges whose
/// lengths differ by at most one
pub fn partition_ranges(len: usize, parts: usize) -> Vec<Range<usize>> {
    let parts = parts.max(1).min(len);
    if parts == 0 {
        return Vec::new();
    }

    let base = len / parts;
    let remainder = len % parts;
    let mut start = 0;
    (0..parts)
        .map(|i| {
            let size = base + usize::from(i < remainder);
            let range = start..start + size;
            start += size;
            range
        })
        .collect()
}

fn split_evenly<T>(items: Vec<T>, parts: usize) -> Vec<Vec<T>> {
    let ranges = partition_ranges(items.len(), parts);
    let mut items = items.into_iter();
    ranges
        .into_iter()
        .map(|range| items.by_ref().take(range.len()).collect())
        .collect()
}
