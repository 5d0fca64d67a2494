//! grocerd
//!
//! A grocery trip tracking server: start a trip against a store, scan
//! line items into the cart, keep the running total against a budget,
//! check out, and stage future purchases on a shopping list. State
//! lives in SQLite; clients talk JSON over HTTP.

mod auth;
mod cart;
mod cleanup;
mod config;
mod error;
mod handlers;
mod server;
mod storage;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "grocerd", about = "Grocery trip tracking server")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "grocerd.toml")]
    config: PathBuf,

    /// Listen address override
    #[arg(short, long)]
    listen: Option<String>,

    /// Database path override
    #[arg(short, long)]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cli = Cli::parse();

    let mut cfg = if cli.config.exists() {
        config::AppConfig::load(&cli.config)?
    } else {
        tracing::info!("No config file found, using defaults");
        config::AppConfig::default()
    };

    if let Some(listen) = cli.listen {
        cfg.listen_addr = listen;
    }
    if let Some(database) = cli.database {
        cfg.storage_path = database;
    }

    tracing::info!("Starting grocerd on {}", cfg.listen_addr);

    let storage = storage::Storage::open(&cfg.storage_path)?;
    cleanup::spawn_session_cleanup(storage.clone());
    let app = server::build_router(storage, &cfg);

    let listener = tokio::net::TcpListener::bind(&cfg.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
