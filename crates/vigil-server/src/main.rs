//! Main entry point for the Vigil status service.
//!
//! Loads configuration and logging, starts the service, then runs until
//! Ctrl+C or SIGTERM.

use std::sync::Arc;

use clap::Parser;
use tracing::info;
use vigil_common::SystemClock;
use vigil_server::config::{Cli, Configuration};
use vigil_server::service::VigilService;
use vigil_server::startup::{self, GracefulShutdown};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let configuration = Configuration::load(&cli)?;
    let _logging_guard = startup::init_logging(&configuration.logging_config())?;

    let service = VigilService::start(&configuration, Arc::new(SystemClock::new()))?;
    info!("Vigil started");

    startup::shutdown_requested().await;

    service.shutdown(&GracefulShutdown::default()).await;
    info!("Shutdown complete");
    Ok(())
}
