//! Staged aggregation contract
//!
//! After the vertex program finished, every registered `MapReduce` collapses
//! per-vertex local side effects into one global value:
//!
//! ```text
//! map (per partition) → [combine (per partition)] → shuffle by key
//!     → reduce (per key) → finalize → published under side_effect_key
//! ```
//!
//! Implementations never cross a process boundary as live objects. The
//! submitting side calls `store_state`; each worker gets a fresh instance from
//! `MapReduceRegistry::load`, which reads that state back and rebinds any
//! functions from the transported pipeline.

pub mod group_by;

pub use group_by::GroupByMapReduce;

use super::configuration::Configuration;
use super::{ComputedVertex, ComputerError};
use crate::process::lambda::LambdaRegistry;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Phases of an aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Map,
    /// Optional local pre-aggregation of map output
    Combine,
    Reduce,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Map => write!(f, "map"),
            Stage::Combine => write!(f, "combine"),
            Stage::Reduce => write!(f, "reduce"),
        }
    }
}

pub type KeyValue = (String, Value);

/// Receives map and combine output
pub trait MapEmitter {
    fn emit(&mut self, key: String, value: Value);
}

/// Receives reduce output
pub trait ReduceEmitter {
    fn emit(&mut self, key: String, value: Value);
}

impl MapEmitter for Vec<KeyValue> {
    fn emit(&mut self, key: String, value: Value) {
        self.push((key, value));
    }
}

impl ReduceEmitter for Vec<KeyValue> {
    fn emit(&mut self, key: String, value: Value) {
        self.push((key, value));
    }
}

/// An aggregation run by the graph computer after the vertex program
pub trait MapReduce: Send + Sync + fmt::Debug {
    /// Registry key used to load this aggregation on workers
    fn kind(&self) -> &'static str;

    /// Write what a worker needs to rebuild this instance
    fn store_state(&self, configuration: &mut Configuration);

    fn is_stage_applicable(&self, stage: Stage) -> bool;

    fn map(&self, vertex: &ComputedVertex, emitter: &mut dyn MapEmitter)
        -> Result<(), ComputerError>;

    /// Local pre-aggregation; only called when `Stage::Combine` applies
    fn combine(
        &self,
        key: &str,
        values: &mut dyn Iterator<Item = Value>,
        emitter: &mut dyn MapEmitter,
    ) -> Result<(), ComputerError> {
        let mut reduced = Vec::new();
        self.reduce(key, values, &mut reduced)?;
        for (key, value) in reduced {
            emitter.emit(key, value);
        }
        Ok(())
    }

    fn reduce(
        &self,
        key: &str,
        values: &mut dyn Iterator<Item = Value>,
        emitter: &mut dyn ReduceEmitter,
    ) -> Result<(), ComputerError>;

    /// Build the global result from the final key/value pairs
    fn finalize(&self, pairs: Vec<KeyValue>) -> Value;

    /// Where the result is published in the shared side-effect store
    fn side_effect_key(&self) -> &str;
}

/// Rebuilds an aggregation from transported state
pub type MapReduceLoader =
    fn(&Configuration, &LambdaRegistry) -> Result<Box<dyn MapReduce>, ComputerError>;

/// Loaders for every aggregation kind a worker understands
#[derive(Clone)]
pub struct MapReduceRegistry {
    loaders: HashMap<&'static str, MapReduceLoader>,
}

impl MapReduceRegistry {
    /// Registry without any loaders
    pub fn empty() -> Self {
        Self {
            loaders: HashMap::new(),
        }
    }

    pub fn register(&mut self, kind: &'static str, loader: MapReduceLoader) {
        self.loaders.insert(kind, loader);
    }

    pub fn load(
        &self,
        kind: &str,
        configuration: &Configuration,
        lambdas: &LambdaRegistry,
    ) -> Result<Box<dyn MapReduce>, ComputerError> {
        let loader = self
            .loaders
            .get(kind)
            .ok_or_else(|| ComputerError::UnknownMapReduce {
                kind: kind.to_string(),
            })?;
        loader(configuration, lambdas)
    }
}

impl Default for MapReduceRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(GroupByMapReduce::KIND, GroupByMapReduce::load);
        registry
    }
}

impl fmt::Debug for MapReduceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.loaders.keys().collect();
        kinds.sort();
        f.debug_struct("MapReduceRegistry")
            .field("kinds", &kinds)
            .finish()
    }
}
