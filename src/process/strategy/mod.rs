//! Pipeline rewrite strategies
//!
//! A `Strategies` value is immutable: `with` and `without` return a new set.
//! Derived sets are computed once and then applied, never edited while a
//! pipeline is being rewritten.

pub mod verification;
pub mod vertex_program;

pub use verification::ComputerVerificationStrategy;
pub use vertex_program::VertexProgramStrategy;

use super::pipeline::{Pipeline, PipelineError};
use super::step::StepError;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("Step {step} failed verification: {reason}")]
    Verification { step: String, reason: String },

    #[error("Failed to wrap pipeline in a vertex program step: {0}")]
    Wrap(#[source] Box<StepError>),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Order in which strategy categories run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StrategyCategory {
    Decoration,
    Optimization,
    Finalization,
    Verification,
}

impl fmt::Display for StrategyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyCategory::Decoration => write!(f, "decoration"),
            StrategyCategory::Optimization => write!(f, "optimization"),
            StrategyCategory::Finalization => write!(f, "finalization"),
            StrategyCategory::Verification => write!(f, "verification"),
        }
    }
}

/// A rewrite pass over a pipeline
pub trait PipelineStrategy: Send + Sync + fmt::Debug {
    /// Unique id; a set holds at most one strategy per id
    fn id(&self) -> &'static str;

    fn category(&self) -> StrategyCategory;

    fn apply(&self, pipeline: &mut Pipeline) -> Result<(), StrategyError>;
}

/// Ordered, immutable set of strategies
#[derive(Debug, Clone, Default)]
pub struct Strategies {
    strategies: Vec<Arc<dyn PipelineStrategy>>,
}

impl Strategies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set; a later strategy replaces an earlier one with the same id
    pub fn of(strategies: impl IntoIterator<Item = Arc<dyn PipelineStrategy>>) -> Self {
        strategies
            .into_iter()
            .fold(Self::new(), |set, strategy| set.with(strategy))
    }

    /// New set with `strategy` added (or replacing the one with its id)
    pub fn with(&self, strategy: Arc<dyn PipelineStrategy>) -> Self {
        let mut strategies: Vec<_> = self
            .strategies
            .iter()
            .filter(|existing| existing.id() != strategy.id())
            .cloned()
            .collect();
        strategies.push(strategy);
        // stable: insertion order is kept within a category
        strategies.sort_by_key(|s| s.category());
        Self { strategies }
    }

    /// New set without the strategy identified by `id`
    pub fn without(&self, id: &str) -> Self {
        Self {
            strategies: self
                .strategies
                .iter()
                .filter(|strategy| strategy.id() != id)
                .cloned()
                .collect(),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.strategies.iter().any(|strategy| strategy.id() == id)
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|strategy| strategy.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Run every strategy against `pipeline` in category order
    pub fn apply(&self, pipeline: &mut Pipeline) -> Result<(), StrategyError> {
        for strategy in &self.strategies {
            strategy.apply(pipeline)?;
        }
        Ok(())
    }
}
