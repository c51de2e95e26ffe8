//! In-memory graph and its JSON loader

use super::vertex::{Vertex, VertexId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Failed to read graph from {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed graph document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Duplicate vertex id {0}")]
    DuplicateVertex(VertexId),
}

/// Vertices the engine computes over
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    vertices: Vec<Vertex>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph, rejecting duplicate vertex ids
    pub fn from_vertices(vertices: Vec<Vertex>) -> Result<Self, GraphError> {
        let mut seen = HashSet::with_capacity(vertices.len());
        for vertex in &vertices {
            if !seen.insert(&vertex.id) {
                return Err(GraphError::DuplicateVertex(vertex.id.clone()));
            }
        }
        Ok(Self { vertices })
    }

    /// Parse `{"vertices": [...]}`
    pub fn from_json_str(document: &str) -> Result<Self, GraphError> {
        let graph: Graph = serde_json::from_str(document)?;
        Self::from_vertices(graph.vertices)
    }

    pub fn load(path: &Path) -> Result<Self, GraphError> {
        let document = std::fs::read_to_string(path).map_err(|source| GraphError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&document)
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }
}
