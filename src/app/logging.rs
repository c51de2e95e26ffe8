//! Logging configuration and initialization

use crate::app::config::AppConfig;
use tracing::{debug, trace};
use tracing_subscriber::EnvFilter;

/// Initialize tracing for the command-line tool.
///
/// `RUST_LOG` takes precedence over the verbosity flag when set.
pub fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(config.verbose >= 2)
        .with_thread_names(config.verbose >= 2)
        .init();

    debug!("pregel-bridge started with verbosity level: {}", config.verbose);
    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());
}
