//! Service orchestrator binary.
//!
//! Loads a TOML configuration, installs logging and metrics, and runs the configured
//! features until SIGINT/SIGTERM.

use std::path::PathBuf;

use clap::Parser;

use service_orchestrator::config::{load_config, ServiceConfig};
use service_orchestrator::observability::{init_logging, metrics};
use service_orchestrator::Orchestrator;

#[derive(Parser)]
#[command(name = "service-orchestrator", version)]
#[command(about = "Runs a service's startup phases, listeners and graceful shutdown")]
struct Cli {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServiceConfig::default(),
    };

    let log_handle = init_logging(&config.logging)?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = ?cli.config,
        "service-orchestrator starting"
    );

    if config.metrics.enabled {
        match config.metrics.address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(e) => tracing::error!(
                metrics_address = %config.metrics.address,
                error = %e,
                "failed to parse metrics address"
            ),
        }
    }

    Orchestrator::from_config(&config)
        .with_log_handle(log_handle)
        .run_until_signal()
        .await?;

    tracing::info!("shutdown complete");
    Ok(())
}
