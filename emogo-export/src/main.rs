//! emogo-export - sample export service
//!
//! Serves the stored samples as JSON, as an HTML table and as a zip package
//! bundling a CSV summary with the recorded video clips.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use emogo_common::config::{default_config_path, load_toml_config, ConfigOverrides, ExportConfig};
use emogo_common::db::{connect_readonly, SqliteSampleRepository};
use emogo_export::{build_router, AppState};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for emogo-export
#[derive(Parser, Debug)]
#[command(name = "emogo-export")]
#[command(about = "Export service for EmoGo samples")]
#[command(version)]
struct Args {
    /// TOML config file (default: ~/.config/emogo/config.toml)
    #[arg(short, long, env = "EMOGO_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite sample database
    #[arg(short, long, env = "EMOGO_DATABASE_PATH")]
    database: Option<PathBuf>,

    /// Directory holding the recorded video clips
    #[arg(short, long, env = "EMOGO_MEDIA_DIR")]
    media_dir: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "EMOGO_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "EMOGO_PORT")]
    port: Option<u16>,

    /// External base URL for absolute video links in the JSON export
    #[arg(long, env = "EMOGO_PUBLIC_BASE_URL")]
    public_base_url: Option<String>,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, env = "EMOGO_LOG_LEVEL")]
    log_level: Option<String>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            database_path: self.database.clone(),
            media_dir: self.media_dir.clone(),
            host: self.host.clone(),
            port: self.port,
            public_base_url: self.public_base_url.clone(),
            log_level: self.log_level.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is read before tracing init so the configured level applies;
    // where it came from is logged right after.
    let config_path = args.config.clone().or_else(default_config_path);
    let file_config = match &config_path {
        Some(path) => load_toml_config(path)?,
        None => None,
    };
    let config_file_found = file_config.is_some();
    let config = ExportConfig::resolve(&args.overrides(), &file_config.unwrap_or_default());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "emogo_export={level},emogo_common={level},tower_http={level}",
                    level = config.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting EmoGo export service v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    match (&config_path, config_file_found) {
        (Some(path), true) => info!("Config file: {}", path.display()),
        (Some(path), false) => info!("No config file at {} (using defaults)", path.display()),
        (None, _) => info!("No config directory available (using defaults)"),
    }

    info!("Database path: {}", config.database_path.display());
    info!("Media directory: {}", config.media_dir.display());
    if !config.media_dir.is_dir() {
        warn!(
            "Media directory {} does not exist; archives will contain no videos",
            config.media_dir.display()
        );
    }

    let pool = match connect_readonly(&config.database_path).await {
        Ok(pool) => {
            info!("✓ Connected to database (read-only)");
            pool
        }
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            return Err(e.into());
        }
    };

    let shutdown = CancellationToken::new();
    let state = AppState::new(
        Arc::new(SqliteSampleRepository::new(pool.clone())),
        config.media_dir.clone(),
    )
    .with_public_base_url(config.public_base_url.clone())
    .with_shutdown(shutdown.clone());

    let app = build_router(state);

    let bind_address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_address))?;
    info!("emogo-export listening on http://{}", bind_address);
    info!("Health check: http://{}/health", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .context("Server error")?;

    pool.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
///
/// Cancels `shutdown` so in-flight archive builds stop reading media.
async fn shutdown_signal(shutdown: CancellationToken) {
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

    shutdown.cancel();
}
