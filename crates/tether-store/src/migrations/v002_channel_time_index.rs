//! v002 -- Covering index for history loads, which filter by
//! (network, channel) and order by time.

use rusqlite::Connection;

pub const VERSION: i64 = 1_679_743_888;

const UP_SQL: &str = r#"
CREATE INDEX IF NOT EXISTS network_channel_time ON messages (network, channel, time);
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
