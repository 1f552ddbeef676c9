/// Application name
pub const APP_NAME: &str = "Tether";

/// Default IRC port for plain-text connections
pub const DEFAULT_IRC_PORT: u16 = 6667;

/// Default bound on in-memory and durable history per channel
pub const DEFAULT_MAX_HISTORY: usize = 10_000;

/// Most messages sent for a channel in one snapshot
pub const SNAPSHOT_MESSAGE_LIMIT: usize = 100;

/// Most messages carried by a single `more` event after a history load
pub const MORE_MESSAGE_LIMIT: usize = 100;

/// Default capacity of the write-through queue
pub const DEFAULT_LOG_QUEUE: usize = 1024;

/// Backend name that enables the SQLite message log
pub const SQLITE_BACKEND: &str = "sqlite";
