//! Reactions to inbound IRC events.
//!
//! Every handler receives the network the event arrived on and a
//! [`PushContext`] describing the user's sessions, sink and message log.
//! Handlers never persist the user configuration themselves; they report
//! through [`HandlerOutcome`] that the owner has to save it.

mod banlist;
mod connection;
mod join;
mod message;
mod part;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use tether_shared::MessageKind;

use crate::channel::{Channel, PushContext};
use crate::events::{emit_event, ClientEvent};
use crate::network::Network;
use crate::sync::ActiveChannel;

/// A user joined a channel, possibly us.
#[derive(Debug, Clone, Deserialize)]
pub struct JoinEvent {
    pub channel: String,
    pub nick: String,
    #[serde(default)]
    pub ident: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default = "Utc::now")]
    pub time: DateTime<Utc>,
}

/// A user left a channel, possibly us.
#[derive(Debug, Clone, Deserialize)]
pub struct PartEvent {
    pub channel: String,
    pub nick: String,
    #[serde(default)]
    pub ident: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub message: String,
    #[serde(default = "Utc::now")]
    pub time: DateTime<Utc>,
}

/// A PRIVMSG, NOTICE or CTCP ACTION.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageEvent {
    #[serde(default = "default_message_kind")]
    pub kind: MessageKind,
    /// Channel name or our own nick for private messages.
    pub target: String,
    /// Absent for messages sent by the server itself.
    #[serde(default)]
    pub nick: Option<String>,
    #[serde(default)]
    pub ident: String,
    #[serde(default)]
    pub hostname: String,
    pub text: String,
    #[serde(default = "Utc::now")]
    pub time: DateTime<Utc>,
}

fn default_message_kind() -> MessageKind {
    MessageKind::Message
}

/// One ban as reported by the server.
#[derive(Debug, Clone, Deserialize)]
pub struct RawBan {
    pub banned: String,
    pub banned_by: String,
    /// Unix seconds.
    pub banned_at: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BanlistEvent {
    pub channel: String,
    #[serde(default)]
    pub bans: Vec<RawBan>,
}

/// Someone, possibly us, changed nick.
#[derive(Debug, Clone, Deserialize)]
pub struct NickEvent {
    pub nick: String,
    pub new_nick: String,
    #[serde(default = "Utc::now")]
    pub time: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum IrcEvent {
    Join(JoinEvent),
    Part(PartEvent),
    Message(MessageEvent),
    Banlist(BanlistEvent),
    Nick(NickEvent),
    Disconnected,
}

impl IrcEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Join(_) => "join",
            Self::Part(_) => "part",
            Self::Message(_) => "message",
            Self::Banlist(_) => "banlist",
            Self::Nick(_) => "nick",
            Self::Disconnected => "disconnected",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandlerOutcome {
    /// The network's persistable settings changed.
    pub config_changed: bool,
}

impl HandlerOutcome {
    fn unchanged() -> Self {
        Self::default()
    }

    fn changed() -> Self {
        Self {
            config_changed: true,
        }
    }
}

pub fn dispatch(network: &mut Network, ctx: &PushContext<'_>, event: IrcEvent) -> HandlerOutcome {
    tracing::trace!(network = %network.uuid, event = event.name(), "handling irc event");

    match event {
        IrcEvent::Join(event) => join::handle(network, ctx, event),
        IrcEvent::Part(event) => part::handle(network, ctx, event),
        IrcEvent::Message(event) => message::handle(network, ctx, event),
        IrcEvent::Banlist(event) => banlist::handle(network, ctx, event),
        IrcEvent::Nick(event) => connection::handle_nick(network, ctx, event),
        IrcEvent::Disconnected => connection::handle_disconnected(network, ctx),
    }
}

/// Whether `nick` is the nick we are connected with.
fn is_own_nick(network: &Network, nick: &str) -> bool {
    !network.nick.is_empty() && network.nick.eq_ignore_ascii_case(nick)
}

/// Tell attached sessions that a channel appeared at `index`.
fn announce_channel(network: &Network, ctx: &PushContext<'_>, index: usize) {
    let channel: &Channel = &network.channels[index];
    emit_event(
        ctx.sink,
        ClientEvent::Join {
            network: network.id,
            chan: channel.filtered_clone(ActiveChannel::Assume, None),
            index,
        },
    );
}

fn announce_users(channel: &Channel, ctx: &PushContext<'_>) {
    emit_event(ctx.sink, ClientEvent::Users { chan: channel.id });
}

fn hostmask(ident: &str, hostname: &str) -> String {
    format!("{ident}@{hostname}")
}
