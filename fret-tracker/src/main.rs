//! Fretwork tracker (fret-tracker) - Main entry point
//!
//! Opens (or creates) the progress database, bootstraps the reviewer
//! account and serves the HTTP/SSE API the chat adapter talks to.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use fret_common::config::{resolve_root_folder, TomlConfig, ROOT_FOLDER_ENV};
use fret_common::db::init_database;
use fret_common::events::EventBus;
use fret_tracker::model::LearnerId;
use fret_tracker::notify::EventNotifier;
use fret_tracker::store::SqliteStore;
use fret_tracker::{build_router, AppState, Tracker};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Events buffered per SSE subscriber before it is reported as lagging
const EVENT_BUS_CAPACITY: usize = 256;

/// Command-line arguments for fret-tracker
#[derive(Parser, Debug)]
#[command(name = "fret-tracker")]
#[command(about = "Curriculum progress and review service for Fretwork")]
#[command(version)]
struct Args {
    /// Bootstrap TOML file (defaults to the platform config dir)
    #[arg(short, long, env = "FRETWORK_CONFIG")]
    config: Option<PathBuf>,

    /// Root folder holding the database
    #[arg(short, long, env = "FRETWORK_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "FRETWORK_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is read before tracing so its log level can be the fallback
    let config = TomlConfig::load(args.config.as_deref());
    let level = config
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting Fretwork tracker v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let config = config.context("Failed to load configuration")?;

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), ROOT_FOLDER_ENV, &config);
    let db_path = config.database_path(&root_folder);
    info!("Root folder: {}", root_folder.display());

    let pool = init_database(&db_path)
        .await
        .context("Failed to initialize database")?;

    let store = Arc::new(SqliteStore::new(pool));
    let events = EventBus::new(EVENT_BUS_CAPACITY);
    let notifier = Arc::new(EventNotifier::new(events.clone()));

    let tracker = Arc::new(
        Tracker::new(store.clone(), store, notifier, config.progression.clone())
            .context("Invalid progression config")?,
    );

    if config.reviewer_id != 0 {
        tracker
            .seed_reviewer(LearnerId(config.reviewer_id), "Reviewer")
            .await
            .context("Failed to bootstrap reviewer account")?;
    } else {
        warn!("No reviewer_id configured; any caller can approve or reject submissions");
    }

    let app = build_router(AppState::new(tracker, events, config.reviewer_id));

    let port = args.port.unwrap_or(config.port);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
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
