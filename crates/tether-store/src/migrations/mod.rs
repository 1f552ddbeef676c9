//! Schema version check and migration runner.
//!
//! The schema version lives in the `options` table rather than in
//! `PRAGMA user_version`, so logs written by other tools that share the same
//! layout stay readable. Versions are epoch-second timestamps of the change.

pub mod v001_initial;
pub mod v002_channel_time_index;

use rusqlite::{Connection, OptionalExtension};

use crate::error::{Result, StoreError};

/// Key of the version record in the `options` table.
pub const SCHEMA_VERSION_KEY: &str = "schema_version";

/// Current schema version. Bump this and register a new migration whenever
/// the schema changes.
pub const CURRENT_VERSION: i64 = v002_channel_time_index::VERSION;

/// Migrations applied after the base schema, ordered by version.
const MIGRATIONS: &[(i64, &str, fn(&Connection) -> rusqlite::Result<()>)] = &[(
    v002_channel_time_index::VERSION,
    "v002_channel_time_index",
    v002_channel_time_index::up,
)];

/// Outcome of the version check performed on open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaCheck {
    /// No version was stored; the current one was stamped.
    Created,
    /// The stored version matches the running code.
    Current,
    /// An older store was migrated up to the current version.
    Migrated { from: i64 },
    /// The store was written by newer code. Nothing was changed.
    Newer { stored: i64 },
}

/// Create the base schema if needed, then reconcile the stored version with
/// [`CURRENT_VERSION`].
pub fn run_migrations(conn: &Connection) -> Result<SchemaCheck> {
    v001_initial::up(conn).map_err(|e| StoreError::Migration(e.to_string()))?;

    let stored: Option<String> = conn
        .query_row(
            "SELECT value FROM options WHERE name = ?1",
            [SCHEMA_VERSION_KEY],
            |row| row.get(0),
        )
        .optional()?;

    let Some(stored) = stored else {
        apply_after(conn, 0)?;
        conn.execute(
            "INSERT INTO options (name, value) VALUES (?1, ?2)",
            rusqlite::params![SCHEMA_VERSION_KEY, CURRENT_VERSION.to_string()],
        )?;
        return Ok(SchemaCheck::Created);
    };

    let stored: i64 = stored
        .parse()
        .map_err(|e| StoreError::Migration(format!("bad schema version {stored:?}: {e}")))?;

    if stored == CURRENT_VERSION {
        return Ok(SchemaCheck::Current);
    }

    if stored > CURRENT_VERSION {
        tracing::error!(
            stored_version = stored,
            current_version = CURRENT_VERSION,
            "message log schema is newer than this build, is tether out of date? not migrating"
        );
        return Ok(SchemaCheck::Newer { stored });
    }

    tracing::info!(
        stored_version = stored,
        current_version = CURRENT_VERSION,
        "message log schema is out of date, running migrations"
    );

    apply_after(conn, stored)?;
    conn.execute(
        "UPDATE options SET value = ?1 WHERE name = ?2",
        rusqlite::params![CURRENT_VERSION.to_string(), SCHEMA_VERSION_KEY],
    )?;

    Ok(SchemaCheck::Migrated { from: stored })
}

/// Run every registered migration newer than `version`.
fn apply_after(conn: &Connection, version: i64) -> Result<()> {
    for (target, name, up) in MIGRATIONS {
        if *target > version && *target <= CURRENT_VERSION {
            tracing::info!(migration = *name, "applying migration");
            up(conn).map_err(|e| StoreError::Migration(format!("{name}: {e}")))?;
        }
    }
    Ok(())
}
