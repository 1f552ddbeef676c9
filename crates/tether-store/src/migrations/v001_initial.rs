//! v001 -- Base schema.
//!
//! Creates the `options` table holding the schema version and the append-only
//! `messages` table. Every statement is idempotent; this runs on every open.

use rusqlite::Connection;

/// Version stamped by stores that only have the base schema.
pub const VERSION: i64 = 1_520_239_200;

const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Options (schema_version lives here)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS options (
    name  TEXT,
    value TEXT,
    CONSTRAINT name_unique UNIQUE (name)
);

-- ----------------------------------------------------------------
-- Messages
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    network TEXT,      -- durable network UUID
    channel TEXT,      -- lowercased channel name
    time    INTEGER,   -- unix epoch milliseconds
    type    TEXT,      -- message kind
    msg     TEXT       -- JSON body without id/time/type/previews
);

CREATE INDEX IF NOT EXISTS network_channel ON messages (network, channel);
CREATE INDEX IF NOT EXISTS time ON messages (time);
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
