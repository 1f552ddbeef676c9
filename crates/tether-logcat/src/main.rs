//! # tether-logcat
//!
//! Operator tool for a Tether installation. Opens a user's message log
//! directly and prints what is stored there, without starting the engine.

mod cli;

use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use tether_core::CoreConfig;
use tether_shared::IdAllocator;
use tether_store::{Database, SchemaCheck, CURRENT_VERSION};

use crate::cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,tether_logcat=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = CoreConfig::from_env();
    if let Some(home) = cli.home {
        config.home = home;
    }
    debug!(?config, "Loaded configuration");

    match cli.command {
        Commands::Show {
            user,
            network,
            channel,
            limit,
        } => {
            let db = open_log(&config.logs_dir(), &user)?;
            let limit = limit.or(config.max_history).unwrap_or(usize::MAX);
            let ids = IdAllocator::new();
            let messages = db
                .get_messages_for_channel(network, &channel, limit, &ids)
                .with_context(|| format!("reading {channel} on {network}"))?;

            info!(%network, %channel, count = messages.len(), "Read stored messages");

            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            for message in &messages {
                serde_json::to_writer(&mut out, message)?;
                writeln!(out)?;
            }
        }
        Commands::Schema { user } => {
            let db = open_log(&config.logs_dir(), &user)?;
            let stored = db.stored_schema_version()?;
            let check = match db.schema() {
                SchemaCheck::Created => "created".to_string(),
                SchemaCheck::Current => "current".to_string(),
                SchemaCheck::Migrated { from } => format!("migrated from {from}"),
                SchemaCheck::Newer { stored } => format!("newer than this build ({stored})"),
            };
            println!(
                "{}",
                serde_json::json!({
                    "path": db.path(),
                    "stored_version": stored,
                    "current_version": CURRENT_VERSION,
                    "check": check,
                })
            );
        }
    }

    Ok(())
}

fn open_log(logs_dir: &Path, user: &str) -> anyhow::Result<Database> {
    let path = logs_dir.join(format!("{user}.sqlite3"));
    if !path.exists() {
        bail!("no message log for user {user:?} at {}", path.display());
    }
    Database::open_at(&path).with_context(|| format!("opening {}", path.display()))
}
