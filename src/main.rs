use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use config::ServerConfig;
use launcher::Launcher;
use log::error;
use server::Shutdown;

mod browser;
mod cli;
mod config;
mod error;
mod handler;
mod launcher;
mod port;
mod request;
mod response;
mod server;
mod status;

fn run(cli: Cli) -> Result<()> {
    let config = ServerConfig::try_from(&cli)?;

    let shutdown = Shutdown::default();
    let on_interrupt = shutdown.clone();
    ctrlc::set_handler(move || on_interrupt.request())
        .context("Failed to install the Ctrl+C handler")?;

    Launcher::new(config, shutdown).run()?;
    Ok(())
}

/// Interrupt-driven shutdown exits 0; any fault is reported and exits 1.
fn exit_code(result: &Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Error starting server: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    pretty_env_logger::formatted_builder()
        .parse_filters(&std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()))
        .init();

    exit_code(&run(cli))
}
