// Gestora - Web Server
// REST API with Axum over the SQLite database

use anyhow::{Context, Result};
use clap::Parser;
use gestora::api::{self, AppState};
use gestora::config::{AppConfig, DEFAULT_CONFIG_FILE};
use gestora::db;
use std::path::PathBuf;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "gestora-server", version, about = "API REST de gestora")]
struct Args {
    /// JSON config file
    #[arg(long, env = "GESTORA_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// SQLite database, overrides `database_path` from the config
    #[arg(long, env = "GESTORA_DB")]
    db: Option<PathBuf>,

    /// Listen address, overrides `server.bind_addr`
    #[arg(long, env = "GESTORA_BIND")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = AppConfig::load(&args.config)?;
    if let Some(db) = args.db {
        config.database_path = db;
    }
    if let Some(bind) = args.bind {
        config.server.bind_addr = bind;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let conn = db::open(&config.database_path)?;
    info!(path = %config.database_path.display(), "database opened");

    let app = api::router(AppState::new(conn))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server.bind_addr))?;

    info!(addr = %config.server.bind_addr, "server running");
    println!("🚀 Server running on http://{}", config.server.bind_addr);
    println!("   API: http://{}/api/health", config.server.bind_addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .context("Server stopped with an error")?;

    Ok(())
}
