//! aura-studio - Content back-office service
//!
//! Campaigns, posts with media, and AI editorial feedback on captions.
//! Default port: 4000

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aura_common::config::{default_config_path, load_toml_config, RootFolderInitializer, RootFolderResolver};
use aura_studio::config::{FeedbackSettings, ProviderKind, StudioTomlConfig, DEFAULT_PORT};
use aura_studio::AppState;

const MODULE_NAME: &str = "aura-studio";

/// Command-line arguments for aura-studio
#[derive(Parser, Debug)]
#[command(name = "aura-studio")]
#[command(about = "Campaign and post back-office with AI caption feedback")]
#[command(version)]
struct Args {
    /// Port to listen on (default 4000)
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(long, default_value = "0.0.0.0", env = "AURA_HOST")]
    host: std::net::IpAddr,

    /// Root folder holding aura.db and media/
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// TOML config file (default: <config dir>/aura/aura-studio.toml)
    #[arg(short, long, env = "AURA_CONFIG")]
    config: Option<PathBuf>,

    /// Feedback provider override: "openai" or "mock"
    #[arg(long)]
    feedback_provider: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Step 1: Load TOML config (missing file falls back to defaults)
    let config_path = args
        .config
        .clone()
        .or_else(|| default_config_path(MODULE_NAME));
    let loaded: Option<StudioTomlConfig> = match &config_path {
        Some(path) => load_toml_config(path).context("Failed to load config file")?,
        None => None,
    };
    let config_found = loaded.is_some();
    let toml_config = loaded.unwrap_or_default();

    // Step 2: Initialize tracing (RUST_LOG wins over TOML level), then report the config source
    let default_filter = toml_config
        .logging
        .level
        .clone()
        .unwrap_or_else(|| "aura_studio=info,aura_common=info,tower_http=info".to_string());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting aura-studio v{}", env!("CARGO_PKG_VERSION"));
    match (&config_path, config_found) {
        (Some(path), true) => info!("Loaded config file: {}", path.display()),
        (Some(path), false) => warn!("Config file not found, using defaults: {}", path.display()),
        (None, _) => warn!("No config directory available, using defaults"),
    }

    // Step 3: Resolve and create root folder
    let root_folder = RootFolderResolver::new(MODULE_NAME)
        .with_cli_arg(args.root_folder.clone())
        .with_toml_value(toml_config.root_folder.clone())
        .resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;

    // Step 4: Open database and fail analyses interrupted by a previous run
    let db_path = initializer.database_path();
    info!("Database: {}", db_path.display());
    let db_pool = aura_studio::db::init_database_pool(&db_path)
        .await
        .context("Failed to open database")?;

    let stale = aura_studio::db::analyses::cleanup_stale_analyses(&db_pool).await?;
    if stale > 0 {
        info!("Marked {} interrupted analyses as failed", stale);
    }

    // Step 5: Feedback provider
    let mut settings = FeedbackSettings::resolve(&toml_config.feedback)?;
    if let Some(provider) = &args.feedback_provider {
        settings.provider = provider.parse::<ProviderKind>()?;
    }
    let provider = aura_studio::services::build_provider(&settings)?;

    // Step 6: State, worker and router
    let media_root = initializer.media_path();
    info!("Media folder: {}", media_root.display());
    let (state, worker) = AppState::start(db_pool, provider, media_root);
    let app = aura_studio::build_router(state);

    let port = args.port.or(toml_config.port).unwrap_or(DEFAULT_PORT);
    let addr = SocketAddr::new(args.host, port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // The router (and its queue handle) is gone; queued jobs are abandoned
    worker.abort();
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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
