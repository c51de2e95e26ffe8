use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

/// Identifier of a vertex. Numeric and string ids are both accepted on load.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VertexId {
    Number(u64),
    Name(String),
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VertexId::Number(n) => write!(f, "{}", n),
            VertexId::Name(s) => write!(f, "{}", s),
        }
    }
}

impl From<u64> for VertexId {
    fn from(id: u64) -> Self {
        VertexId::Number(id)
    }
}

impl From<&str> for VertexId {
    fn from(id: &str) -> Self {
        VertexId::Name(id.to_string())
    }
}

/// A vertex and its properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub id: VertexId,
    #[serde(default = "default_label")]
    pub label: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

fn default_label() -> String {
    "vertex".to_string()
}

impl Vertex {
    pub fn new(id: impl Into<VertexId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            properties: Map::new(),
        }
    }

    /// Builder-style property setter
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// JSON rendering handed to lambdas: `{"id", "label", "properties"}`
    pub fn to_value(&self) -> Value {
        json!({
            "id": self.id,
            "label": self.label,
            "properties": self.properties,
        })
    }
}
