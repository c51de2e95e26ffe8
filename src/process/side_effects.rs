//! Shared side-effect store
//!
//! A `SideEffects` value is a handle: clones observe the same entries. An
//! enclosing pipeline and the sub-pipeline handed to the compute engine end up
//! holding the same handle after a one-time merge, so a value published by a
//! finished job is visible from both.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

#[derive(Clone, Default)]
pub struct SideEffects {
    entries: Arc<RwLock<BTreeMap<String, Value>>>,
}

impl SideEffects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a new, independent store
    pub fn from_entries(entries: BTreeMap<String, Value>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(entries)),
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Point-in-time copy of every entry
    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether both handles refer to the same store
    pub fn same_instance(&self, other: &SideEffects) -> bool {
        Arc::ptr_eq(&self.entries, &other.entries)
    }

    /// Union this store's entries into `target`.
    ///
    /// Entries already in `target` are kept; a conflicting entry from `self`
    /// is dropped with a warning.
    pub fn merge_into(&self, target: &SideEffects) {
        if self.same_instance(target) {
            return;
        }

        let source = self.snapshot();
        let mut entries = target
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        for (key, value) in source {
            match entries.get(&key) {
                Some(existing) if *existing != value => {
                    warn!("Side effect '{}' already present, keeping existing value", key);
                }
                Some(_) => {}
                None => {
                    debug!("Merged side effect '{}'", key);
                    entries.insert(key, value);
                }
            }
        }
    }

    /// Overwrite entries in this store with every entry of `published`
    pub fn publish(&self, published: &SideEffects) {
        if self.same_instance(published) {
            return;
        }

        let source = published.snapshot();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.extend(source);
    }
}

impl fmt::Debug for SideEffects {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SideEffects")
            .field("keys", &self.keys())
            .finish()
    }
}
