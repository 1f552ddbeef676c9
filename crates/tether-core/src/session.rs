//! Client sessions attached to one user (one per device or browser tab).

use std::collections::HashMap;

use tether_shared::ChannelId;

/// Transport-assigned session identifier.
pub type SessionId = String;

#[derive(Debug, Clone, Default)]
pub struct AttachedSession {
    /// The channel this session currently displays.
    pub open_channel: Option<ChannelId>,
}

#[derive(Debug, Clone, Default)]
pub struct Sessions {
    attached: HashMap<SessionId, AttachedSession>,
}

impl Sessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, id: impl Into<SessionId>, open_channel: Option<ChannelId>) {
        self.attached
            .insert(id.into(), AttachedSession { open_channel });
    }

    pub fn detach(&mut self, id: &str) -> Option<AttachedSession> {
        self.attached.remove(id)
    }

    /// Returns `false` when the session is not attached.
    pub fn set_open_channel(&mut self, id: &str, channel: Option<ChannelId>) -> bool {
        match self.attached.get_mut(id) {
            Some(session) => {
                session.open_channel = channel;
                true
            }
            None => false,
        }
    }

    /// Whether any attached session currently shows `channel`.
    pub fn is_open(&self, channel: ChannelId) -> bool {
        self.attached
            .values()
            .any(|s| s.open_channel == Some(channel))
    }

    pub fn len(&self) -> usize {
        self.attached.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attached.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_if_any_session_shows_the_channel() {
        let mut sessions = Sessions::new();
        sessions.attach("phone", Some(ChannelId(1)));
        sessions.attach("laptop", Some(ChannelId(2)));

        assert!(sessions.is_open(ChannelId(1)));
        assert!(sessions.is_open(ChannelId(2)));
        assert!(!sessions.is_open(ChannelId(3)));

        sessions.detach("phone");
        assert!(!sessions.is_open(ChannelId(1)));
        assert!(!sessions.set_open_channel("phone", Some(ChannelId(3))));
    }
}
