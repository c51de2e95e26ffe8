use clap::Parser;
use pregel_bridge::app::{handle_fatal_error, init_logging, AppConfig};
use pregel_bridge::cli::{execute_command, Cli};

fn main() {
    let cli = Cli::parse();
    let config = AppConfig::new(cli.verbose);
    init_logging(&config);

    // The local engine owns its own runtime; main stays synchronous so the
    // bridge can block on job completion.
    if let Err(e) = execute_command(cli.command) {
        handle_fatal_error(e, config.verbose);
    }
}
