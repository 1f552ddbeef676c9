//! Events pushed to a user's attached client sessions.

use serde::Serialize;
use tokio::sync::mpsc;

use tether_shared::{ChannelId, Message, NetworkId};

use crate::error::CoreError;
use crate::sync::ChannelSnapshot;

pub const EVENT_MSG: &str = "msg";
pub const EVENT_JOIN: &str = "join";
pub const EVENT_USERS: &str = "users";
pub const EVENT_MORE: &str = "more";

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "lowercase")]
pub enum ClientEvent {
    /// A new message in a channel. `unread` is the channel's new unread
    /// count when this message increased it.
    Msg {
        chan: ChannelId,
        msg: Message,
        #[serde(skip_serializing_if = "Option::is_none")]
        unread: Option<u32>,
    },
    /// A channel was added to a network at `index`.
    ///
    /// `index` is the position in the network's full channel list, which
    /// always starts with the lobby, so the first real channel is at 1.
    Join {
        network: NetworkId,
        chan: ChannelSnapshot,
        index: usize,
    },
    /// The user list of a channel changed; clients re-request it.
    Users { chan: ChannelId },
    /// Older history became available for a channel.
    More {
        chan: ChannelId,
        messages: Vec<Message>,
    },
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Msg { .. } => EVENT_MSG,
            Self::Join { .. } => EVENT_JOIN,
            Self::Users { .. } => EVENT_USERS,
            Self::More { .. } => EVENT_MORE,
        }
    }
}

/// Delivery of events to every session attached for one user.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: ClientEvent) -> Result<(), CoreError>;
}

impl EventSink for mpsc::UnboundedSender<ClientEvent> {
    fn emit(&self, event: ClientEvent) -> Result<(), CoreError> {
        self.send(event).map_err(|e| CoreError::Emit(e.to_string()))
    }
}

pub fn emit_event(sink: &dyn EventSink, event: ClientEvent) {
    let name = event.name();
    if let Err(e) = sink.emit(event) {
        tracing::error!(event = name, error = %e, "Failed to emit event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_name_and_payload() {
        let event = ClientEvent::Users { chan: ChannelId(3) };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "users");
        assert_eq!(value["payload"]["chan"], 3);
    }

    #[test]
    fn emitting_to_a_closed_sink_is_not_fatal() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        emit_event(&tx, ClientEvent::Users { chan: ChannelId(1) });
    }
}
