//! CLI command handlers
//!
//! - Argument parsing structures
//! - Command implementations
//! - Input validation

pub mod args;
pub mod commands;
pub mod router;
pub mod validation;

pub use args::{Cli, Commands, GroupByArgs};
pub use router::execute_command;
