//! Synesthesia server - Main entry point
//!
//! Accepts producers on `/control`, editors on `/composer` and subscribers on `/broadcast`,
//! and keeps all three in agreement about what is playing and which cue file goes with it.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use synesthesia_server::config::{CliOverrides, ServerConfig, StorageConfig};
use synesthesia_server::state::Orchestrator;
use synesthesia_server::storage::{CueStore, FileCueStore, MemoryCueStore};
use synesthesia_server::{build_router, AppState};

/// Command-line arguments for synesthesia-server
#[derive(Parser, Debug)]
#[command(name = "synesthesia-server")]
#[command(about = "Playback state reconciliation server for light show cue files")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "SYNESTHESIA_PORT")]
    port: Option<u16>,

    /// Folder where saved cue files are kept
    #[arg(short, long, env = "SYNESTHESIA_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Keep saved cue files in memory only
    #[arg(long)]
    in_memory: bool,

    /// Unsaved revisions kept per track
    #[arg(long)]
    max_revisions: Option<usize>,
}

impl From<Args> for CliOverrides {
    fn from(args: Args) -> Self {
        Self {
            port: args.port,
            data_dir: args.data_dir,
            config_file: args.config,
            in_memory: args.in_memory,
            max_revisions: args.max_revisions,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();
    let config = ServerConfig::load(&args.into()).context("Failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_directive().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Synesthesia server on port {}", config.port);

    let (store, storage_location): (Arc<dyn CueStore>, String) = match &config.storage {
        StorageConfig::Files { data_dir } => {
            let files = FileCueStore::new(data_dir);
            let location = files.dir().display().to_string();
            info!("Cue files: {}", location);
            let store: Arc<dyn CueStore> = Arc::new(files);
            (store, location)
        }
        StorageConfig::Memory => {
            info!("Cue files kept in memory only");
            let store: Arc<dyn CueStore> = Arc::new(MemoryCueStore::new());
            (store, "memory".to_string())
        }
    };
    info!("Keeping up to {} revisions per track", config.max_revisions);

    // Start the reconciliation loop
    let (orchestrator, reconciliation) = Orchestrator::new(store, config.max_revisions).spawn();

    let app = build_router(AppState::new(orchestrator, storage_location));

    // Create socket address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    reconciliation.abort();

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
