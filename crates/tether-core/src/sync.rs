//! Snapshots sent to a client session when it attaches or reconnects.
//!
//! A snapshot is an explicit projection of network and channel state: secrets
//! and internal fields never appear, user lists are never included (clients
//! ask for them on demand) and each channel carries only as much history as
//! the requesting session needs.
//!
//! Message selection per channel:
//! - reconnecting (`last_message` is known): only messages newer than it, and
//!   at most the newest [`SNAPSHOT_MESSAGE_LIMIT`] of those. After a long gap
//!   the client may see a hole in history rather than a huge burst.
//! - fresh session, active channel: the newest [`SNAPSHOT_MESSAGE_LIMIT`].
//! - fresh session, any other channel: only the newest message, enough for a
//!   preview line.

use std::collections::VecDeque;

use serde::Serialize;
use uuid::Uuid;

use tether_shared::constants::SNAPSHOT_MESSAGE_LIMIT;
use tether_shared::{ChannelId, Message, MessageId, NetworkId};

use crate::channel::{Channel, ChannelKind, JoinState};
use crate::network::{Network, NetworkStatus, ServerOptions};

/// Which channel the requesting session had focused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveChannel {
    /// Treat every channel as active.
    Assume,
    /// Only this channel is active.
    Id(ChannelId),
    /// No channel is active.
    Unknown,
}

impl ActiveChannel {
    pub fn includes(&self, channel: ChannelId) -> bool {
        match self {
            Self::Assume => true,
            Self::Id(id) => *id == channel,
            Self::Unknown => false,
        }
    }
}

impl From<bool> for ActiveChannel {
    fn from(value: bool) -> Self {
        if value {
            Self::Assume
        } else {
            Self::Unknown
        }
    }
}

impl From<ChannelId> for ActiveChannel {
    fn from(value: ChannelId) -> Self {
        Self::Id(value)
    }
}

/// Pick the messages of one channel to send.
///
/// Buffers are not guaranteed to be sorted by id (history loaded from the
/// log is prepended with freshly allocated ids), so the reconnect case
/// filters rather than searching.
pub fn select_messages(
    messages: &VecDeque<Message>,
    channel: ChannelId,
    active: ActiveChannel,
    last_message: Option<MessageId>,
) -> Vec<Message> {
    let newest = |items: Vec<&Message>, n: usize| -> Vec<Message> {
        let skip = items.len().saturating_sub(n);
        items.into_iter().skip(skip).cloned().collect()
    };

    match last_message {
        Some(last) => newest(
            messages.iter().filter(|m| m.id > last).collect(),
            SNAPSHOT_MESSAGE_LIMIT,
        ),
        None => {
            let limit = if active.includes(channel) {
                SNAPSHOT_MESSAGE_LIMIT
            } else {
                1
            };
            newest(messages.iter().collect(), limit)
        }
    }
}

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ChannelSnapshot {
    pub id: ChannelId,
    pub name: String,
    pub key: String,
    pub topic: String,
    #[serde(rename = "type")]
    pub kind: ChannelKind,
    pub state: JoinState,
    pub unread: u32,
    pub highlight: u32,
    pub first_unread: Option<MessageId>,
    pub messages: Vec<Message>,
}

impl ChannelSnapshot {
    pub fn of(channel: &Channel, active: ActiveChannel, last_message: Option<MessageId>) -> Self {
        Self {
            id: channel.id,
            name: channel.name.clone(),
            key: channel.key.clone(),
            topic: channel.topic.clone(),
            kind: channel.kind,
            state: channel.state,
            unread: channel.unread,
            highlight: channel.highlight,
            first_unread: channel.first_unread,
            messages: select_messages(&channel.messages, channel.id, active, last_message),
        }
    }
}

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

/// Public view of a network. Password, away message, transport handle,
/// highlight pattern and the channel rejoin cache are left out.
#[derive(Debug, Clone, Serialize)]
pub struct NetworkSnapshot {
    pub id: NetworkId,
    pub uuid: Uuid,
    pub name: String,
    pub host: String,
    pub port: u16,
    pub tls: bool,
    pub nick: String,
    pub username: String,
    pub realname: String,
    pub commands: Vec<String>,
    pub ip: Option<String>,
    pub hostname: Option<String>,
    pub server_options: ServerOptions,
    pub channels: Vec<ChannelSnapshot>,
    pub status: NetworkStatus,
}

impl NetworkSnapshot {
    pub fn of(network: &Network, active: ActiveChannel, last_message: Option<MessageId>) -> Self {
        Self {
            id: network.id,
            uuid: network.uuid,
            name: network.name.clone(),
            host: network.host.clone(),
            port: network.port,
            tls: network.tls,
            nick: network.nick.clone(),
            username: network.username.clone(),
            realname: network.realname.clone(),
            commands: network.commands.clone(),
            ip: network.ip.clone(),
            hostname: network.hostname.clone(),
            server_options: network.server_options.clone(),
            channels: network
                .channels
                .iter()
                .map(|c| ChannelSnapshot::of(c, active, last_message))
                .collect(),
            status: network.status(),
        }
    }
}
