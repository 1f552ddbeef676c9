//! # tether-store
//!
//! Durable message log for Tether, backed by SQLite.
//!
//! The log is a best-effort replica of what clients have seen: rows are keyed
//! by the network's durable UUID and the lowercased channel name, never by the
//! process-local ids. The crate exposes a synchronous [`Database`] handle that
//! wraps a `rusqlite::Connection`, and [`MessageLog`], which adds the
//! "disabled" state used when the store could not be opened.

pub mod database;
pub mod log;
pub mod messages;
pub mod migrations;

mod error;
#[cfg(test)]
mod testing;

pub use database::Database;
pub use error::{Result, StoreError};
pub use log::MessageLog;
pub use migrations::{SchemaCheck, CURRENT_VERSION};
