//! # pregel-bridge
//!
//! Runs a lazily-evaluated query pipeline as a single vertex-centric job on
//! a graph computer, then folds per-vertex results into global side effects.
//!
//! ## Usage
//!
//! ```bash
//! pregel-bridge group-by --graph graph.json --key label --reduce count
//! ```
//!
//! ## Modules
//!
//! - `structure` - Vertices and the in-memory graph the engine reads
//! - `process` - Pipelines, steps, strategies, lambdas and the shared side-effect store
//! - `computer` - Jobs, the vertex program, the map/combine/reduce contract and the local engine
//! - `app` - Configuration, logging and fatal error reporting for the binary
//! - `cli` - Command-line arguments and command handlers
pub mod app;
pub mod cli;
pub mod computer;
pub mod error;
pub mod process;
pub mod structure;

pub use error::{Error, Result};
