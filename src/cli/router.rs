//! Command routing and execution

use crate::cli::args::Commands;
use crate::cli::commands::run_group_by;
use anyhow::Result;

/// Execute a CLI command based on the parsed arguments
pub fn execute_command(command: Commands) -> Result<()> {
    match command {
        Commands::GroupBy(args) => run_group_by(args),
    }
}
