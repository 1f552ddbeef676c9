//! Database connection management.
//!
//! The [`Database`] struct owns a [`rusqlite::Connection`] and guarantees that
//! the schema check (and any pending migration) has run before any other
//! operation.

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension};

use crate::error::{Result, StoreError};
use crate::migrations::{self, SchemaCheck};

/// Wrapper around a [`rusqlite::Connection`].
pub struct Database {
    conn: Connection,
    schema: SchemaCheck,
}

impl Database {
    /// Open (or create) a message log at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        conn.pragma_update(None, "journal_mode", "WAL")?;

        let schema = migrations::run_migrations(&conn)?;

        tracing::debug!(path = %path.display(), ?schema, "message log opened");

        Ok(Self { conn, schema })
    }

    /// Open a throwaway in-memory log.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let schema = migrations::run_migrations(&conn)?;
        Ok(Self { conn, schema })
    }

    /// Return a reference to the underlying `rusqlite::Connection`.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// What the schema check found when this handle was opened.
    pub fn schema(&self) -> SchemaCheck {
        self.schema
    }

    /// The version currently stamped in the `options` table.
    pub fn stored_schema_version(&self) -> Result<Option<i64>> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM options WHERE name = ?1",
                [migrations::SCHEMA_VERSION_KEY],
                |row| row.get(0),
            )
            .optional()?;

        value
            .map(|v| {
                v.parse::<i64>()
                    .map_err(|e| StoreError::Migration(format!("bad schema version {v:?}: {e}")))
            })
            .transpose()
    }

    /// Return the filesystem path of the open database (if any).
    pub fn path(&self) -> Option<PathBuf> {
        self.conn.path().map(PathBuf::from)
    }
}
