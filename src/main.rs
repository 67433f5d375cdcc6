use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use tokio::runtime::Builder;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use unifi_filter_sync::cli::Cli;
use unifi_filter_sync::core::FilterSync;
use unifi_filter_sync::filters::ControllerClient;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // stdout is reserved for domain output
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("✗ Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    // One request at a time, so a single-threaded runtime is enough
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create Tokio runtime")?;

    let config = cli.controller_config();
    debug!("Using {:?}", config);

    let client = ControllerClient::new(config)?;
    let mut sync = FilterSync::new(client);
    let mut stdout = std::io::stdout();
    runtime.block_on(sync.run(&cli.command, &mut stdout))?;
    Ok(())
}
