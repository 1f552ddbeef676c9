//! Command-line interface definitions and parsing

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect a Tether user's message log", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Tether home directory (overrides TETHER_HOME)
    #[arg(long)]
    pub home: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print stored messages of one channel as JSON lines, oldest first
    Show {
        /// User whose log to read
        user: String,
        /// Durable network UUID
        network: Uuid,
        /// Channel or query name (case-insensitive)
        channel: String,
        /// Maximum number of messages (defaults to TETHER_MAX_HISTORY)
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Report the schema version of a user's log
    Schema {
        /// User whose log to inspect
        user: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_show() {
        let net = Uuid::new_v4();
        let cli = Cli::try_parse_from([
            "tether-logcat",
            "--home",
            "/tmp/tether",
            "show",
            "alice",
            &net.to_string(),
            "#rust",
            "--limit",
            "5",
        ])
        .unwrap();

        assert_eq!(cli.home, Some(PathBuf::from("/tmp/tether")));
        match cli.command {
            Commands::Show {
                user,
                network,
                channel,
                limit,
            } => {
                assert_eq!(user, "alice");
                assert_eq!(network, net);
                assert_eq!(channel, "#rust");
                assert_eq!(limit, Some(5));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_bad_uuid() {
        assert!(Cli::try_parse_from(["tether-logcat", "show", "alice", "nope", "#rust"]).is_err());
    }
}
