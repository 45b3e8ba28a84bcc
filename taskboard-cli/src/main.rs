use clap::Parser;
use std::process::ExitCode;
use taskboard_config::ConfigProvider;

mod cli;
mod commands;
mod logging;

use cli::Cli;

const EXIT_ERROR: u8 = 1;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match ConfigProvider::new().load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: failed to load configuration: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };
    if let Some(root) = &cli.root {
        config.store.root = root.clone();
    }

    logging::configure_logging(cli.verbose, cli.debug, cli.quiet, &config.logging);
    tracing::debug!(root = %config.store.root.display(), "starting taskboard");

    match commands::run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!("command failed: {:?}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}
