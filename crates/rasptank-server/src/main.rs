//! Rasptank server - WebSocket remote control for the Rasptank robot.

use anyhow::Result;
use clap::Parser;
use rasptank_core::{Rgb, Robot};
use rasptank_server::{config, logging, routes, state};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use config::Config;
use logging::{LogConfig, LogFormat};
use state::AppState;

/// Rasptank server - drive the robot over a WebSocket.
#[derive(Parser, Debug)]
#[command(name = "rasptank-server")]
#[command(about = "WebSocket control server for the Rasptank robot")]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override port from config
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable verbose logging (INFO level for every target)
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging (command dispatch and servo decisions)
    #[arg(short, long)]
    debug: bool,

    /// Enable trace logging (every servo step)
    #[arg(long)]
    trace: bool,

    /// Quiet mode (WARN and ERROR only)
    #[arg(short, long)]
    quiet: bool,

    /// Set log level for specific targets (e.g., "servo=trace" or "router=debug").
    /// Can be specified multiple times. Targets are prefixed with "rasptank::" automatically.
    #[arg(long = "log", value_name = "TARGET=LEVEL")]
    log_overrides: Vec<String>,

    /// Log output format
    #[arg(long = "log-format", value_name = "FORMAT", default_value = "text")]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = LogConfig::from_cli(
        cli.verbose,
        cli.debug,
        cli.trace,
        cli.quiet,
        cli.log_overrides,
        cli.log_format,
    );
    logging::init(&log_config);

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(port) = cli.port {
        config.port = port;
    }
    tracing::info!(target: "rasptank::startup", "Loaded configuration (port: {})", config.port);

    let state = Arc::new(AppState::new(config.clone())?);
    let robot = state.robot.clone();
    robot.set_status_color(Rgb::ORANGE)?;

    let app = routes::app(state);
    let served = serve(&config, &robot, app).await;

    if let Err(e) = &served {
        tracing::error!(target: "rasptank::startup", "Server failed: {}", e);
        if let Err(e) = robot.set_status_color(Rgb::RED) {
            tracing::warn!(target: "rasptank::led", "Failed to show error colour: {}", e);
        }
    }

    shutdown_robot(&robot, &config);
    // leave the error colour showing after a failed start
    if served.is_ok() {
        if let Err(e) = robot.with_leds(|leds| leds.close()) {
            tracing::warn!(target: "rasptank::led", "Failed to turn LEDs off: {}", e);
        }
    }
    served
}

async fn serve(config: &Config, robot: &Robot, app: axum::Router) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    robot.set_status_color(Rgb::GREEN)?;
    tracing::info!(target: "rasptank::startup", "Waiting for connections on ws://{}/", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(target: "rasptank::startup", "Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!(target: "rasptank::startup", "Shutdown requested");
}

fn shutdown_robot(robot: &Robot, config: &Config) {
    for (role, outcome) in robot.shutdown(config.shutdown_timeout()) {
        match outcome {
            Ok(outcome) => {
                tracing::info!(target: "rasptank::servo", "{} worker: {:?}", role.name(), outcome)
            }
            Err(e) => tracing::warn!(target: "rasptank::servo", "{} worker: {}", role.name(), e),
        }
    }
}
