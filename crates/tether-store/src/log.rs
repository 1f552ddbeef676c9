//! The per-user message log, which may be disabled.
//!
//! A log that could not be opened is not an error for the session: every
//! write becomes a no-op and every read returns nothing.

use std::path::Path;

use uuid::Uuid;

use tether_shared::{IdAllocator, Message};

use crate::database::Database;
use crate::error::Result;

pub struct MessageLog {
    db: Option<Database>,
}

impl MessageLog {
    /// A log that never stores anything.
    pub fn disabled() -> Self {
        Self { db: None }
    }

    /// Wrap an already opened database.
    pub fn from_database(db: Database) -> Self {
        Self { db: Some(db) }
    }

    /// Open `<logs_dir>/<user>.sqlite3`, creating the directory if needed.
    ///
    /// Any failure is logged and yields a disabled log.
    pub fn enable(logs_dir: &Path, user: &str) -> Self {
        if let Err(e) = std::fs::create_dir_all(logs_dir) {
            tracing::error!(
                path = %logs_dir.display(),
                error = %e,
                "unable to create logs directory, message log disabled"
            );
            return Self::disabled();
        }

        let path = logs_dir.join(format!("{user}.sqlite3"));
        match Database::open_at(&path) {
            Ok(db) => {
                tracing::info!(user, path = %path.display(), "message log enabled");
                Self::from_database(db)
            }
            Err(e) => {
                tracing::error!(
                    user,
                    path = %path.display(),
                    error = %e,
                    "unable to open message log, message log disabled"
                );
                Self::disabled()
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.db.is_some()
    }

    /// Append a message. No-op when disabled.
    pub fn index(&self, network: Uuid, channel: &str, message: &Message) -> Result<()> {
        match &self.db {
            Some(db) => db.insert_message(network, channel, message),
            None => Ok(()),
        }
    }

    /// Load up to `max_history` of the newest messages, oldest-first, with
    /// ids regenerated from `ids`.
    ///
    /// `None` (unbounded history) and `Some(0)` load nothing, as does a
    /// disabled log; the database is not touched in those cases.
    pub fn get_messages(
        &self,
        network: Uuid,
        channel: &str,
        max_history: Option<usize>,
        ids: &IdAllocator,
    ) -> Result<Vec<Message>> {
        let Some(db) = &self.db else {
            return Ok(Vec::new());
        };
        match max_history {
            Some(limit) if limit >= 1 => db.get_messages_for_channel(network, channel, limit, ids),
            _ => Ok(Vec::new()),
        }
    }
}
