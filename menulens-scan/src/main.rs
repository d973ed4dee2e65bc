//! menulens-scan - Menu scan microservice
//!
//! Reads a photographed menu into dishes and streams enriched results back
//! as newline-delimited JSON events.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use menulens_common::config::{database_path, load_default_toml_config, resolve_root_folder};
use menulens_scan::config::{ScanConfig, ENV_ROOT_FOLDER};
use menulens_scan::providers::ProviderRegistry;
use menulens_scan::services::{CacheMatcher, CuisineCacheStore};
use menulens_scan::{build_pipeline, build_router, AppState};

/// Command-line arguments for menulens-scan
#[derive(Parser, Debug)]
#[command(name = "menulens-scan")]
#[command(about = "Menu scan microservice for MenuLens")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5780", env = "MENULENS_PORT")]
    port: u16,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1", env = "MENULENS_HOST")]
    host: String,

    /// Folder holding the SQLite database
    #[arg(short, long, env = "MENULENS_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let toml_config = load_default_toml_config();

    // RUST_LOG wins over the config file level
    let default_filter = if toml_config.logging.level.trim().is_empty() {
        "menulens_scan=info,tower_http=info".to_string()
    } else {
        format!(
            "menulens_scan={level},menulens_common={level},tower_http=info",
            level = toml_config.logging.level.trim()
        )
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting menulens-scan");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), ENV_ROOT_FOLDER, &toml_config);
    info!("Root folder: {}", root_folder.display());

    let config = ScanConfig::resolve(&toml_config);

    let db_path = database_path(&root_folder);
    let db_pool = menulens_scan::db::init_database_pool(&db_path)
        .await
        .context("Failed to initialize database")?;

    let registry = ProviderRegistry::new(config.credentials.clone());
    let pipeline = Arc::new(build_pipeline(&config, &registry));
    info!(
        extraction = ?pipeline.extraction().provider_names(),
        enrichment = ?pipeline.orchestrator().chain().provider_names(),
        "Provider chains ready"
    );

    let cache_store = CuisineCacheStore::new(
        db_pool.clone(),
        config.cache.snapshot_base_url.clone(),
        config.cache.ttl,
    );
    if config.cache.snapshot_base_url.is_none() {
        warn!("No cache snapshot URL configured; only stored cuisine snapshots will match");
    }
    let cache_matcher = Arc::new(CacheMatcher::new(Arc::new(cache_store)));

    let state = AppState::new(db_pool, pipeline, cache_matcher);
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", args.host, args.port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
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
