//! Session Relay Server
//!
//! WebSocket relay that groups clients into sessions and fans control events
//! out to every member.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use figment::providers::Serialized;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use session_relay::config::RelayConfig;
use session_relay::server::{AppState, create_router, run_sweeper};

/// Session Relay Server
#[derive(Parser, Debug)]
#[command(name = "session-relay")]
#[command(about = "Real-time session relay over WebSocket", long_about = None)]
struct Args {
    /// Path to a TOML config file (defaults to ./relay.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server host address
    #[arg(long)]
    host: Option<String>,

    /// Server port
    #[arg(long)]
    port: Option<u16>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(args.log_format);

    let config = load_config(&args)?;

    info!("Starting session relay v{}", env!("CARGO_PKG_VERSION"));
    info!(
        reconnect_policy = ?config.reconnect_policy,
        reject_empty_session_id = config.reject_empty_session_id,
        cors_origin = ?config.cors_origin,
        "Loaded configuration"
    );

    let addr = config.bind_addr()?;
    let state = AppState::new(config);

    // Start idle expiry if configured
    match state.config().session_idle_ttl() {
        Some(ttl) => {
            tokio::spawn(run_sweeper(state.clone(), ttl, state.config().sweep_interval()));
        }
        None => info!("Idle session expiry disabled"),
    }

    let app = create_router(state);

    let listener = TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);
    info!("WebSocket endpoint: ws://{}/ws?sessionId=<id>", addr);

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("session_relay=info,tower_http=debug"));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
    }
}

/// Defaults, config file and environment, then command line flags on top
fn load_config(args: &Args) -> Result<RelayConfig> {
    let mut figment = RelayConfig::figment(args.config.as_deref())?;

    if let Some(host) = &args.host {
        figment = figment.merge(Serialized::default("host", host));
    }
    if let Some(port) = args.port {
        figment = figment.merge(Serialized::default("port", port));
    }

    Ok(RelayConfig::from_figment(figment)?)
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down...");
        },
    }
}
