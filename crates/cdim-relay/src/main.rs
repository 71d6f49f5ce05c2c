//! cdim-relay binary: start logging, load config, serve until Ctrl-C.

use std::path::PathBuf;
use std::process::ExitCode;

use cdim_config::{config_to_json, load_config, validation, LogLevel};
use cdim_relay::RelayServer;
use clap::Parser;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{reload, EnvFilter, Registry};

#[derive(Parser)]
#[command(name = "cdim-relay", version, about = "WebSocket relay for paired chat")]
struct Args {
    /// Config file path. Defaults to the OS config directory.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Interface to bind.
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on.
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Log level override (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<LogLevel>,
}

type FilterHandle = reload::Handle<EnvFilter, Registry>;

fn level_filter(level: LogLevel) -> EnvFilter {
    let level = level.as_filter();
    EnvFilter::new(format!("cdim_relay={level},cdim_config={level}"))
}

/// Install the subscriber. Returns a reload handle unless `RUST_LOG` pins
/// the filter.
fn init_tracing(level: LogLevel) -> Option<FilterHandle> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            None
        }
        Err(_) => {
            let (filter, handle) = reload::Layer::new(level_filter(level));
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
            Some(handle)
        }
    }
}

async fn run(args: Args, filter: Option<FilterHandle>) -> cdim_common::Result<()> {
    let mut config = load_config(args.config.as_deref())?;

    match args.log_level {
        Some(level) => config.logging.level = level,
        None => {
            if let Some(handle) = &filter {
                if let Err(e) = handle.reload(level_filter(config.logging.level)) {
                    tracing::warn!(error = %e, "Failed to apply configured log level");
                }
            }
        }
    }
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    validation::validate(&config)?;
    tracing::debug!(config = %config_to_json(&config), "Effective config");

    let server = RelayServer::bind(&config).await?;
    tracing::info!("cdim-relay listening on {}", server.local_addr()?);

    tokio::select! {
        result = server.run() => result?,
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("Shutting down");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let filter = init_tracing(args.log_level.unwrap_or_default());

    match run(args, filter).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "cdim-relay stopped");
            ExitCode::FAILURE
        }
    }
}
