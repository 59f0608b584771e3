//! Pointsync Daemon - Main entry point
//!
//! Consumes change notifications from the database bridge (JSON lines
//! on stdin, one notification per line) and reconciles them into the
//! scene registry.

mod config;
mod fetch;
mod state;

use anyhow::Result;
use clap::Parser;
use pointsync_remote::{HttpStatePublisher, HttpTextureStore, StatePublisher};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "pointsync")]
#[command(about = "Reconciles remote image-embedding records into a live scene registry")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "pointsync.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Write a default configuration file and exit
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Pointsync v{}", env!("CARGO_PKG_VERSION"));

    if args.init_config {
        config::save_default_config(&args.config)?;
        info!(path = %args.config.display(), "Wrote default configuration");
        return Ok(());
    }

    // Load configuration
    let config = config::load_config(&args.config)?;
    let timeout = Duration::from_secs(config.remote.request_timeout_secs);

    info!(
        collection = %config.remote.collection,
        storage = %config.remote.storage_base_url,
        fetch_textures = config.reconcile.fetch_textures,
        "Configuration loaded"
    );

    let store = HttpTextureStore::new(&config.remote.storage_base_url, timeout)?;
    let publisher = Arc::new(HttpStatePublisher::new(
        &config.remote.database_url,
        &config.remote.ml_state_path,
        timeout,
    )?);

    // Create application state and start the reconciler loop; the feed
    // receiver registers before any stdin line is published
    let state = state::AppState::new(config, store);
    let runner = state.start();

    // Mark the pipeline live; fire-and-forget
    let startup_publisher = publisher.clone();
    tokio::spawn(async move {
        if let Err(e) = startup_publisher.publish(true).await {
            warn!(error = %e, "Failed to publish ml-state");
        }
    });

    // Bridge: one ChangeNotification JSON object per stdin line
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        state::publish_bridge_line(&state.feed, &line);
    }

    info!(
        objects = state.registry.read().await.len(),
        "Change stream ended"
    );

    // Mark the pipeline down before exit; failure is logged only
    if let Err(e) = publisher.publish(false).await {
        warn!(error = %e, "Failed to publish ml-state");
    }

    runner.abort();
    Ok(())
}
