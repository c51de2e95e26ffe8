//! Key/value configuration carried with a job to every worker

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigurationError {
    #[error("Required configuration property '{key}' is missing")]
    Missing { key: String },

    #[error("Configuration property '{key}' must be a {expected}, found {found}")]
    WrongType {
        key: String,
        expected: &'static str,
        found: String,
    },
}

/// Flat property map passed by value with a job
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    properties: BTreeMap<String, Value>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Required value of any type
    pub fn require(&self, key: &str) -> Result<&Value, ConfigurationError> {
        self.get(key).ok_or_else(|| ConfigurationError::Missing {
            key: key.to_string(),
        })
    }

    /// Required string value
    pub fn get_string(&self, key: &str) -> Result<&str, ConfigurationError> {
        let value = self.require(key)?;
        value.as_str().ok_or_else(|| ConfigurationError::WrongType {
            key: key.to_string(),
            expected: "string",
            found: type_name(value).to_string(),
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
