//! In-memory session state for one IRC user: networks, channels, attached
//! client sessions, and the write-through to the message log.

pub mod channel;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod handlers;
pub mod history;
pub mod network;
pub mod previews;
pub mod session;
pub mod sync;

#[cfg(test)]
mod testing;

pub use channel::{Channel, ChannelKind, JoinState, PushContext};
pub use client::{Client, UserConfigFile};
pub use config::CoreConfig;
pub use error::{CoreError, Result};
pub use events::{ClientEvent, EventSink};
pub use handlers::{HandlerOutcome, IrcEvent};
pub use history::HistoryHandle;
pub use network::{Network, NetworkConfig, NetworkStatus, Transport};
pub use previews::PreviewStorage;
pub use session::Sessions;
pub use sync::{ActiveChannel, ChannelSnapshot, NetworkSnapshot};
