#![forbid(unsafe_code)]

//! `agent-keepintouch-ctl` — operator CLI companion for
//! `agent-keepintouch`.
//!
//! Opens the shared `SQLite` store directly (WAL journal mode allows
//! concurrent access with the daemon) and exposes status queries plus
//! the manual grant/deny overrides for when an operator has to decide a
//! completion by hand.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use agent_keepintouch::audit::{AuditLogger, JsonlAuditWriter};
use agent_keepintouch::clock::SystemClock;
use agent_keepintouch::config::SupervisorConfig;
use agent_keepintouch::persistence::db;
use agent_keepintouch::{AppError, Result, Supervisor};

#[derive(Debug, Parser)]
#[command(
    name = "agent-keepintouch-ctl",
    about = "Operator CLI for agent-keepintouch",
    version,
    long_about = None
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Override the database path from the config file.
    #[arg(long)]
    db_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List all sessions with their derived liveness.
    Sessions,

    /// Show the derived liveness of one session.
    Liveness {
        /// Session identifier.
        session_id: String,
    },

    /// List pending completion permissions, oldest first.
    Pending,

    /// Show the stored permission record for a pair.
    Show {
        /// Task identifier.
        task_id: String,
        /// Agent identifier.
        agent_id: String,
    },

    /// Grant completion for a pair, bypassing liveness.
    Grant {
        /// Task identifier.
        task_id: String,
        /// Agent identifier.
        agent_id: String,
        /// Supervisor identity recorded on the decision.
        #[arg(long)]
        by: String,
        /// Optional rationale recorded on the decision.
        #[arg(long)]
        reason: Option<String>,
    },

    /// Deny completion for a pair.
    Deny {
        /// Task identifier.
        task_id: String,
        /// Agent identifier.
        agent_id: String,
        /// Supervisor identity recorded on the decision.
        #[arg(long)]
        by: String,
        /// Optional rationale recorded on the decision.
        #[arg(long)]
        reason: Option<String>,
    },
}

fn main() {
    let args = Cli::parse();
    if let Err(err) = run(args) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run(args: Cli) -> Result<()> {
    let mut config = SupervisorConfig::load_from_path(&args.config)?;
    if let Some(db_path) = args.db_path {
        config.db_path = db_path;
    }

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(exec(args.command, &config))
}

async fn exec(command: Command, config: &SupervisorConfig) -> Result<()> {
    let db = Arc::new(db::connect(&config.db_path).await?);
    let audit: Option<Arc<dyn AuditLogger>> = match &config.audit_log_dir {
        Some(dir) => Some(Arc::new(JsonlAuditWriter::new(dir.clone())?)),
        None => None,
    };
    let supervisor = Supervisor::with_audit(db, Arc::new(SystemClock), config, audit);

    match command {
        Command::Sessions => {
            let mut rows = Vec::new();
            for session in supervisor.list_sessions().await? {
                let liveness = supervisor.liveness(&session.session_id).await?;
                rows.push(serde_json::json!({
                    "session": session,
                    "liveness": liveness,
                }));
            }
            print_json(&serde_json::Value::Array(rows))
        }
        Command::Liveness { session_id } => {
            let liveness = supervisor.liveness(&session_id).await?;
            print_value(&liveness)
        }
        Command::Pending => {
            let pending = supervisor.list_pending().await?;
            print_value(&pending)
        }
        Command::Show { task_id, agent_id } => {
            match supervisor.permission(&task_id, &agent_id).await? {
                Some(record) => print_value(&record),
                None => {
                    println!("no permission record for this pair");
                    Ok(())
                }
            }
        }
        Command::Grant {
            task_id,
            agent_id,
            by,
            reason,
        } => {
            let record = supervisor
                .grant_override(&task_id, &agent_id, &by, reason)
                .await?;
            print_value(&record)
        }
        Command::Deny {
            task_id,
            agent_id,
            by,
            reason,
        } => {
            let record = supervisor
                .deny_override(&task_id, &agent_id, &by, reason)
                .await?;
            print_value(&record)
        }
    }
}

fn print_value<T: serde::Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_value(value)
        .map_err(|e| AppError::Config(format!("failed to render output: {e}")))?;
    print_json(&rendered)
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::Config(format!("failed to render output: {e}")))?;
    println!("{rendered}");
    Ok(())
}
