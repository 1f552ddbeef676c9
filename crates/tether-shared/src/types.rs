use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Process-local network identifier. Not stable across restarts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct NetworkId(pub u64);

/// Process-global channel identifier, unique for the lifetime of the process.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ChannelId(pub u64);

/// Monotonic message identifier, assigned when the message is created.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl std::fmt::Display for NetworkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user present in a channel.
///
/// Two records are the same user when their nicks match case-insensitively;
/// the mode prefix does not take part in identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub nick: String,
    #[serde(default)]
    pub mode: String,
}

impl UserRecord {
    pub fn new(nick: impl Into<String>) -> Self {
        Self {
            nick: nick.into(),
            mode: String::new(),
        }
    }

    pub fn with_mode(nick: impl Into<String>, mode: impl Into<String>) -> Self {
        Self {
            nick: nick.into(),
            mode: mode.into(),
        }
    }

    /// Key used for per-channel user maps.
    pub fn key(&self) -> String {
        self.nick.to_lowercase()
    }
}

impl PartialEq for UserRecord {
    fn eq(&self, other: &Self) -> bool {
        self.nick.to_lowercase() == other.nick.to_lowercase()
    }
}

impl Eq for UserRecord {}

impl Hash for UserRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}
