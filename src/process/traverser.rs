//! Units of flow through a pipeline

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Capabilities a step needs from the traverser representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TraverserRequirement {
    /// Traverser carries a value
    Object,
    /// Traverser carries a multiplicity
    Bulk,
    /// Steps read or write the shared side-effect store
    SideEffects,
    /// Steps refer to other steps by label
    Labeled,
}

impl fmt::Display for TraverserRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraverserRequirement::Object => write!(f, "object"),
            TraverserRequirement::Bulk => write!(f, "bulk"),
            TraverserRequirement::SideEffects => write!(f, "side-effects"),
            TraverserRequirement::Labeled => write!(f, "labeled"),
        }
    }
}

pub type Requirements = BTreeSet<TraverserRequirement>;

/// Every requirement this crate's traversers can satisfy
pub fn all_requirements() -> Requirements {
    [
        TraverserRequirement::Object,
        TraverserRequirement::Bulk,
        TraverserRequirement::SideEffects,
        TraverserRequirement::Labeled,
    ]
    .into_iter()
    .collect()
}

/// A value paired with a multiplicity
#[derive(Debug, Clone, PartialEq)]
pub struct Traverser<T> {
    value: T,
    bulk: u64,
    step_id: String,
}

impl<T> Traverser<T> {
    pub fn new(value: T, step_id: impl Into<String>, bulk: u64) -> Self {
        Self {
            value,
            bulk,
            step_id: step_id.into(),
        }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn into_inner(self) -> T {
        self.value
    }

    pub fn bulk(&self) -> u64 {
        self.bulk
    }

    /// Id of the step that generated this traverser
    pub fn step_id(&self) -> &str {
        &self.step_id
    }
}
