//! Parley CLI entry point

use clap::Parser;
use tracing::{error, info};

use parley_cli::{
    cli::Cli,
    commands::CommandDispatcher,
    config::AppConfig,
    error::Result,
};

fn main() {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    setup_logging(cli.verbose);

    if let Err(e) = run(cli) {
        error!("{}", e);
        std::process::exit(e.exit_code());
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = load_configuration(&cli)?;
    CommandDispatcher::execute(cli.command, config)?;
    info!("Parley exited successfully");
    Ok(())
}

/// Setup logging based on verbosity level
///
/// Logs go to stderr so the chat view on stdout stays readable.
fn setup_logging(verbose: bool) {
    let log_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

/// Load configuration from every layer, with flags on top
fn load_configuration(cli: &Cli) -> Result<AppConfig> {
    if let Some(config_path) = &cli.config {
        info!("Loading configuration from: {}", config_path.display());
    }
    AppConfig::load(cli.config.as_deref(), &cli.overrides())
}
