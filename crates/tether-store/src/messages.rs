use chrono::{DateTime, Utc};
use rusqlite::params;
use tracing::warn;
use uuid::Uuid;

use tether_shared::{IdAllocator, Message, MessageBody, MessageKind};

use crate::database::Database;
use crate::error::Result;

impl Database {
    /// Append one message for `(network, channel)`.
    ///
    /// The channel name is lowercased so lookups are case-insensitive. Only
    /// the body is serialized: id is regenerated on load, time and type have
    /// their own columns, and previews never outlive the process.
    pub fn insert_message(&self, network: Uuid, channel: &str, message: &Message) -> Result<()> {
        let body = serde_json::to_string(&message.body)?;

        self.conn().execute(
            "INSERT INTO messages (network, channel, time, type, msg)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                network.to_string(),
                channel.to_lowercase(),
                message.time.timestamp_millis(),
                message.kind.as_str(),
                body,
            ],
        )?;
        Ok(())
    }

    /// Load the newest `limit` messages for `(network, channel)`, returned
    /// oldest-first with fresh ids taken from `ids`.
    ///
    /// Rows this build cannot decode (an unknown type, a malformed body) are
    /// skipped with a warning; they still count against `limit`.
    pub fn get_messages_for_channel(
        &self,
        network: Uuid,
        channel: &str,
        limit: usize,
        ids: &IdAllocator,
    ) -> Result<Vec<Message>> {
        let mut stmt = self.conn().prepare(
            "SELECT rowid, msg, type, time
             FROM messages
             WHERE network = ?1 AND channel = ?2
             ORDER BY time DESC, rowid DESC
             LIMIT ?3",
        )?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(
            params![network.to_string(), channel.to_lowercase(), limit],
            row_to_parts,
        )?;

        let mut parts = Vec::new();
        for row in rows {
            let (rowid, msg, kind, time) = row?;
            match decode_row(&msg, &kind, time) {
                Ok(decoded) => parts.push(decoded),
                Err(reason) => warn!(
                    %network,
                    channel,
                    rowid,
                    kind = %kind,
                    %reason,
                    "skipping unreadable message log row"
                ),
            }
        }

        // Rows come newest-first; ids are handed out oldest-first so they
        // increase in display order.
        Ok(parts
            .into_iter()
            .rev()
            .map(|(body, kind, time)| Message::restore(ids.next_message(), kind, time, body))
            .collect())
    }

    /// Number of stored rows for `(network, channel)`.
    pub fn count_messages(&self, network: Uuid, channel: &str) -> Result<u64> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM messages WHERE network = ?1 AND channel = ?2",
            params![network.to_string(), channel.to_lowercase()],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }
}

fn row_to_parts(row: &rusqlite::Row<'_>) -> rusqlite::Result<(i64, String, String, i64)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn decode_row(
    msg: &str,
    kind: &str,
    time_ms: i64,
) -> std::result::Result<(MessageBody, MessageKind, DateTime<Utc>), String> {
    let body: MessageBody = serde_json::from_str(msg).map_err(|e| format!("bad body: {e}"))?;
    let kind: MessageKind = kind.parse().map_err(|e| format!("{e}"))?;
    let time = DateTime::<Utc>::from_timestamp_millis(time_ms)
        .ok_or_else(|| format!("time out of range: {time_ms}"))?;
    Ok((body, kind, time))
}
