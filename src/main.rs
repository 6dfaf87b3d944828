#![forbid(unsafe_code)]

//! `agent-keepintouch` — liveness supervisor daemon.
//!
//! Bootstraps configuration, opens the shared `SQLite` store, and runs
//! the periodic liveness sweep until SIGINT/SIGTERM. Request paths live
//! in the library and in `agent-keepintouch-ctl`; this binary only keeps
//! the store bootstrapped and the stored counters fresh.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use agent_keepintouch::clock::SystemClock;
use agent_keepintouch::config::SupervisorConfig;
use agent_keepintouch::persistence::db;
use agent_keepintouch::persistence::session_repo::SessionRepo;
use agent_keepintouch::supervisor::locks::KeyedLocks;
use agent_keepintouch::supervisor::session_tracker::SessionTracker;
use agent_keepintouch::supervisor::sweeper;
use agent_keepintouch::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "agent-keepintouch", about = "Agent keep-in-touch supervisor", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Override the database path from the config file.
    #[arg(long)]
    db_path: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("agent-keepintouch supervisor bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let mut config = SupervisorConfig::load_from_path(&args.config)?;
    if let Some(db_path) = args.db_path {
        config.db_path = db_path;
    }
    info!("configuration loaded");

    // ── Initialize database ─────────────────────────────
    let db = Arc::new(db::connect(&config.db_path).await?);
    info!(db_path = %config.db_path.display(), "database ready");

    // ── Start liveness sweep ────────────────────────────
    let ct = CancellationToken::new();
    let sweep_handle = if config.sweep.enabled {
        let tracker = SessionTracker::new(
            SessionRepo::new(Arc::clone(&db)),
            Arc::new(SystemClock),
            &config,
            Arc::new(KeyedLocks::new()),
        );
        let interval = Duration::from_secs(u64::from(config.sweep.interval_seconds));
        info!(
            interval_seconds = config.sweep.interval_seconds,
            "liveness sweep started"
        );
        Some(sweeper::spawn_sweeper_task(tracker, interval, ct.clone()))
    } else {
        warn!("liveness sweep disabled; daemon will only hold the store open");
        None
    };

    // ── Wait for shutdown signal ────────────────────────
    shutdown_signal().await;
    info!("shutdown signal received");
    ct.cancel();

    if let Some(handle) = sweep_handle {
        let _ = handle.await;
    }
    info!("agent-keepintouch shut down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
