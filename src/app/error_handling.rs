//! Error handling utilities

use crate::error::Error;
use tracing::error;

/// Report a fatal error and exit.
///
/// Errors raised by the library map to their own exit code; the cause chain
/// is printed in verbose mode.
pub fn handle_fatal_error(error: anyhow::Error, verbose: u8) -> ! {
    error!("Fatal error: {}", error);
    eprintln!("Error: {error}");

    if verbose >= 1 {
        eprintln!("\nError chain:");
        for (i, cause) in error.chain().enumerate() {
            eprintln!("  {}: {}", i, cause);
        }
    }

    let exit_code = error
        .downcast_ref::<Error>()
        .map(Error::exit_code)
        .unwrap_or(1);
    std::process::exit(exit_code)
}
