mod config;
mod db;
mod error;
mod ids;
mod importer;
mod loader;
mod normalize;
mod supervisor;
mod types;

use std::path::PathBuf;
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::db::Sink;
use crate::error::Result;
use crate::ids::IdAllocator;
use crate::loader::BatchLoader;
use crate::supervisor::Supervisor;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Database setup ---
    // One connection, reused serially across the whole batch. Foreign keys
    // are enforced so the wipe step's deferred-check transaction means
    // something.
    let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", cfg.db_path))?
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(opts)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database ready at {}", cfg.db_path);

    // --- Batch loader owns the sink and the synthetic id counters ---
    let sink = Sink::new(pool);
    let ids = IdAllocator::new(cfg.match_id_seed, cfg.event_id_seed);
    let loader = BatchLoader::new(sink, ids, PathBuf::from(&cfg.data_dir));

    // --- Shutdown signal ---
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
            let _ = shutdown_tx.send(true);
        }
    });

    // --- Produce-import cycle, runs until torn down ---
    let supervisor = Supervisor::new(cfg, loader);
    supervisor.run(shutdown_rx).await;

    Ok(())
}
