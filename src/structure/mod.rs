//! Property graph structure consumed by the compute engine
//!
//! Only what the engine needs is modelled here: vertices with an id, a label
//! and a JSON property map. Edges and physical partitioning belong to the
//! storage layer and are not represented.

pub mod graph;
pub mod vertex;

pub use graph::{Graph, GraphError};
pub use vertex::{Vertex, VertexId};
