//! Jumpgate terminal registry admin tool.
//!
//! Registers, accepts and retires gateway nodes, and runs the SFTP backfill.

mod commands;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};

use jumpgate_core::config::load_config;
use jumpgate_core::tracing_init::init_tracing;
use jumpgate_terminal::TerminalRegistry;
use jumpgate_terminal::liveness::{ExpiringCache, LivenessTracker, MemoryCache};
use jumpgate_terminal::storage::TerminalDatabase;

use commands::Command;

#[derive(Parser, Debug)]
#[command(name = "jumpgate-terminal")]
#[command(version, about = "Jumpgate terminal registry - gateway nodes, liveness and protocols")]
struct Args {
    /// Path to SQLite database file.
    #[arg(long, global = true, env = "JUMPGATE_DB_PATH")]
    db_path: Option<PathBuf>,

    /// Configuration file, layered over the global settings.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_tracing("jumpgate_terminal=info", args.log_json);

    let mut config = load_config(args.config.as_deref())?;
    if let Some(path) = args.db_path {
        config.database.path = Some(path);
    }

    let db_path = match &config.database.path {
        Some(path) => path.clone(),
        None => default_db_path()?,
    };
    info!(path = %db_path.display(), "Opening terminal registry database");
    let db = TerminalDatabase::open(&db_path, &config.database).await?;

    let cache = liveness_cache(config.liveness.redis_url.as_deref()).await?;
    let liveness = LivenessTracker::new(cache, Duration::from_secs(config.liveness.ttl_secs));

    let registry = TerminalRegistry::new(db, liveness, Arc::new(config));
    commands::run(args.command, &registry).await
}

fn default_db_path() -> anyhow::Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(home.join(".jumpgate").join("terminal.db"))
}

#[cfg(feature = "redis")]
async fn liveness_cache(redis_url: Option<&str>) -> anyhow::Result<Arc<dyn ExpiringCache>> {
    if let Some(url) = redis_url {
        info!("Using Redis for terminal liveness");
        let cache = jumpgate_terminal::liveness::RedisCache::connect(url).await?;
        return Ok(Arc::new(cache));
    }
    warn!("No Redis URL configured, liveness is local to this process");
    Ok(Arc::new(MemoryCache::new()))
}

#[cfg(not(feature = "redis"))]
#[allow(clippy::unused_async)]
async fn liveness_cache(redis_url: Option<&str>) -> anyhow::Result<Arc<dyn ExpiringCache>> {
    if redis_url.is_some() {
        warn!("Redis URL configured but built without the redis feature, ignoring");
    }
    warn!("Liveness is local to this process");
    Ok(Arc::new(MemoryCache::new()))
}
