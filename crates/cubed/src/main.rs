//! cubed - local operational shell for a Cube object store.
//!
//! Wires a `CubeStore` behind a CLI/config/logging harness (spec §0
//! "cubed"). Carries no network transport or gossip; every subcommand
//! operates purely against the local backend.

mod commands;
mod config;

use clap::Parser;
use config::{Config, LogFormat};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    let env_filter = EnvFilter::from_default_env().add_directive("cubed=info".parse().unwrap());
    match config.log_format {
        LogFormat::Pretty => tracing_subscriber::registry().with(fmt::layer()).with(env_filter).init(),
        LogFormat::Json => tracing_subscriber::registry().with(fmt::layer().json()).with(env_filter).init(),
    }

    if let Err(e) = config.validate() {
        error!("invalid configuration: {e:#}");
        return ExitCode::FAILURE;
    }

    info!("cubed v{} starting", env!("CARGO_PKG_VERSION"));

    let store = match cube_store::CubeStore::open(config.store_config()) {
        Ok(store) => store,
        Err(e) => {
            error!("failed to open cube store: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = store.ready().await {
        error!("store failed to become ready: {e}");
        return ExitCode::FAILURE;
    }

    let result = commands::run(config.command, store.clone()).await;

    if let Err(e) = store.shutdown().await {
        error!("error during shutdown: {e}");
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("command failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}
