//! Chat messages as held in channel buffers, sent to clients and persisted.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SharedError;
use crate::ids::IdAllocator;
use crate::types::{MessageId, UserRecord};

// ---------------------------------------------------------------------------
// Kind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Action,
    Banlist,
    Error,
    Join,
    Kick,
    Message,
    Mode,
    Motd,
    Nick,
    Notice,
    Part,
    Quit,
    Topic,
    Whois,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Action => "action",
            Self::Banlist => "banlist",
            Self::Error => "error",
            Self::Join => "join",
            Self::Kick => "kick",
            Self::Message => "message",
            Self::Mode => "mode",
            Self::Motd => "motd",
            Self::Nick => "nick",
            Self::Notice => "notice",
            Self::Part => "part",
            Self::Quit => "quit",
            Self::Topic => "topic",
            Self::Whois => "whois",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "action" => Self::Action,
            "banlist" => Self::Banlist,
            "error" => Self::Error,
            "join" => Self::Join,
            "kick" => Self::Kick,
            "message" => Self::Message,
            "mode" => Self::Mode,
            "motd" => Self::Motd,
            "nick" => Self::Nick,
            "notice" => Self::Notice,
            "part" => Self::Part,
            "quit" => Self::Quit,
            "topic" => Self::Topic,
            "whois" => Self::Whois,
            other => return Err(SharedError::UnknownMessageKind(other.to_string())),
        })
    }
}

// ---------------------------------------------------------------------------
// Payload pieces
// ---------------------------------------------------------------------------

/// One entry of a channel ban list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BanEntry {
    pub hostmask: String,
    pub banned_by: String,
    /// Unix epoch milliseconds.
    pub banned_at: i64,
}

/// A link preview attached to a message. `thumb` names a file in the
/// preview storage directory and is reference counted there.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinkPreview {
    pub link: String,
    #[serde(default)]
    pub thumb: Option<String>,
}

/// Every message field that is persisted as-is in the durable log.
///
/// `id`, `time` and `type` live outside the body because the log keeps them
/// in dedicated columns (or regenerates them).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageBody {
    #[serde(rename = "self", default)]
    pub self_authored: bool,
    #[serde(default)]
    pub highlight: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub show_in_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<UserRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostmask: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bans: Vec<BanEntry>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub time: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(flatten)]
    pub body: MessageBody,
    /// Live previews. Never persisted: preview storage does not outlive the
    /// process.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub previews: Vec<LinkPreview>,
}

impl Message {
    /// Create a message, taking its id from `ids` right away so clients see
    /// messages in creation order.
    pub fn new(ids: &IdAllocator, kind: MessageKind, time: DateTime<Utc>) -> Self {
        Self::restore(ids.next_message(), kind, time, MessageBody::default())
    }

    /// Rebuild a message from its stored parts.
    pub fn restore(id: MessageId, kind: MessageKind, time: DateTime<Utc>, body: MessageBody) -> Self {
        Self {
            id,
            time: truncate_to_millis(time),
            kind,
            body,
            previews: Vec::new(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.body.text = text.into();
        self
    }

    pub fn with_from(mut self, from: UserRecord) -> Self {
        self.body.from = Some(from);
        self
    }

    pub fn with_hostmask(mut self, hostmask: impl Into<String>) -> Self {
        self.body.hostmask = Some(hostmask.into());
        self
    }

    pub fn with_bans(mut self, bans: Vec<BanEntry>) -> Self {
        self.body.bans = bans;
        self
    }

    pub fn self_authored(mut self, value: bool) -> Self {
        self.body.self_authored = value;
        self
    }

    pub fn highlighted(mut self, value: bool) -> Self {
        self.body.highlight = value;
        self
    }

    pub fn show_in_active(mut self, value: bool) -> Self {
        self.body.show_in_active = value;
        self
    }

    pub fn is_self(&self) -> bool {
        self.body.self_authored
    }

    pub fn is_highlight(&self) -> bool {
        self.body.highlight
    }

    /// Server chatter that is only meaningful live is kept out of the log.
    pub fn is_loggable(&self) -> bool {
        !matches!(
            self.kind,
            MessageKind::Motd | MessageKind::Banlist | MessageKind::Whois
        )
    }
}

/// The log stores millisecond timestamps; keep in-memory times at the same
/// precision so a round trip is lossless.
fn truncate_to_millis(time: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(time.timestamp_millis()).unwrap_or(time)
}
