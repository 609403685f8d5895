//! Hafalan API Server
//!
//! Run with: cargo run --bin hafalan -- --config ./config.toml
//!
//! # Configuration
//!
//! Settings come from the TOML file given with `--config`, or the first of
//! `~/.config/hafalan/config.toml`, `/etc/hafalan/config.toml` and
//! `./config.toml` that exists. `HAFALAN_*` environment variables override
//! the file; `RUST_LOG` overrides the configured log level.

use clap::Parser;
use hafalan::api::{serve, AppState};
use hafalan::config::{Config, LoggingConfig};
use hafalan::storage::Store;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "hafalan")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Hafalan tracker API server")]
struct Args {
    /// Path to the config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::resolve(args.config.as_deref())?;
    init_logging(&config.logging);

    tracing::info!("Starting Hafalan API server v{}", env!("CARGO_PKG_VERSION"));

    let db_path = config.storage.resolved_path();
    tracing::info!("Database: {:?}", db_path);

    let store = Arc::new(Store::open(&db_path)?);
    let state = AppState::new(Arc::clone(&store), config.api.clone());

    serve(state, &config.api).await?;

    tracing::info!("Hafalan API server stopped");
    Ok(())
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "hafalan={level},tower_http={level}",
            level = logging.level
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);
    if logging.is_json() {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
