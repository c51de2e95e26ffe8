//! Command implementation modules
//!
//! Each command is implemented as a separate module.

pub mod group_by;

pub use group_by::{group_by, run_group_by};
