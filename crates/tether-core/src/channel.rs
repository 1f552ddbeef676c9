//! One conversation window: a channel, a private query, the network lobby or
//! a synthetic window showing a one-off server response.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use tether_shared::constants::MORE_MESSAGE_LIMIT;
use tether_shared::{ChannelId, IdAllocator, Message, MessageId, UserRecord};

use crate::config::CoreConfig;
use crate::events::{emit_event, ClientEvent, EventSink};
use crate::history::HistoryHandle;
use crate::network::PrefixMode;
use crate::previews::PreviewStorage;
use crate::session::Sessions;
use crate::sync::{ActiveChannel, ChannelSnapshot};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Channel,
    Lobby,
    Query,
    Special,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum JoinState {
    #[default]
    Parted,
    Joined,
}

/// Everything a channel needs from its owner to accept a message.
pub struct PushContext<'a> {
    /// Durable identity of the owning network; keys the message log.
    pub network_uuid: Uuid,
    pub config: &'a CoreConfig,
    pub ids: &'a IdAllocator,
    pub sessions: &'a Sessions,
    pub sink: &'a dyn EventSink,
    /// Present only when logging is enabled for the deployment and the user.
    pub history: Option<&'a HistoryHandle>,
    pub previews: &'a PreviewStorage,
}

#[derive(Debug, Clone)]
pub struct Channel {
    pub id: ChannelId,
    pub name: String,
    pub key: String,
    pub topic: String,
    pub kind: ChannelKind,
    pub state: JoinState,
    pub messages: VecDeque<Message>,
    /// Keyed by lowercased nick.
    pub users: HashMap<String, UserRecord>,
    pub unread: u32,
    pub highlight: u32,
    pub first_unread: Option<MessageId>,
}

impl Channel {
    pub fn new(ids: &IdAllocator, name: impl Into<String>, kind: ChannelKind) -> Self {
        Self {
            id: ids.next_channel(),
            name: name.into(),
            key: String::new(),
            topic: String::new(),
            kind,
            state: JoinState::Parted,
            messages: VecDeque::new(),
            users: HashMap::new(),
            unread: 0,
            highlight: 0,
            first_unread: None,
        }
    }

    pub fn with_state(mut self, state: JoinState) -> Self {
        self.state = state;
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Only real conversations are persisted; the lobby and special windows
    /// never reach the message log.
    pub fn is_loggable(&self) -> bool {
        matches!(self.kind, ChannelKind::Channel | ChannelKind::Query)
    }

    /// Append `message`, update unread state, fan it out to every attached
    /// session and write it through to the message log.
    pub fn push_message(&mut self, ctx: &PushContext<'_>, message: Message, increases_unread: bool) {
        let is_open = ctx.sessions.is_open(self.id);

        let mut unread = None;
        if (increases_unread || message.is_highlight()) && !is_open {
            self.unread += 1;
            unread = Some(self.unread);
        }

        emit_event(
            ctx.sink,
            ClientEvent::Msg {
                chan: self.id,
                msg: message.clone(),
                unread,
            },
        );

        if let Some(history) = ctx.history {
            if message.is_loggable() && self.is_loggable() {
                history.index(ctx.network_uuid, &self.name, &message);
            }
        }

        let id = message.id;
        let self_authored = message.is_self();
        let highlight = message.is_highlight();
        self.messages.push_back(message);
        self.trim(ctx);

        if self_authored {
            self.first_unread = None;
            self.highlight = 0;
        } else if !is_open {
            if self.first_unread.is_none() {
                self.first_unread = Some(id);
            }
            if highlight {
                self.highlight += 1;
            }
        }
    }

    /// Drop the oldest messages beyond the history bound. Only memory is
    /// affected; the log keeps its copy.
    fn trim(&mut self, ctx: &PushContext<'_>) {
        let Some(max) = ctx.config.max_history else {
            return;
        };
        if self.messages.len() <= max {
            return;
        }

        let excess = self.messages.len() - max;
        let mut evicted: Vec<Message> = self.messages.drain(..excess).collect();
        debug!(chan = %self.id, evicted = excess, "trimmed channel buffer");

        if ctx.config.releases_previews() {
            release_previews(&mut evicted, ctx.previews);
        }
    }

    /// Merge history loaded from the log in front of the live buffer and
    /// tell attached sessions about it.
    pub fn prepend_history(&mut self, ctx: &PushContext<'_>, loaded: Vec<Message>) {
        let Some(last) = loaded.last() else {
            return;
        };

        if self.first_unread.is_none() {
            self.first_unread = Some(last.id);
        }

        let skip = loaded.len().saturating_sub(MORE_MESSAGE_LIMIT);
        let announced: Vec<Message> = loaded[skip..].to_vec();

        for message in loaded.into_iter().rev() {
            self.messages.push_front(message);
        }
        self.trim(ctx);

        emit_event(
            ctx.sink,
            ClientEvent::More {
                chan: self.id,
                messages: announced,
            },
        );
    }

    pub fn filtered_clone(
        &self,
        active: ActiveChannel,
        last_message: Option<MessageId>,
    ) -> ChannelSnapshot {
        ChannelSnapshot::of(self, active, last_message)
    }

    pub fn find_message(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn find_user(&self, nick: &str) -> Option<&UserRecord> {
        self.users.get(&nick.to_lowercase())
    }

    /// The known record for `nick`, or a fresh one without a mode.
    pub fn get_user(&self, nick: &str) -> UserRecord {
        self.find_user(nick)
            .cloned()
            .unwrap_or_else(|| UserRecord::new(nick))
    }

    /// Insert or overwrite the record for `user.nick`.
    pub fn set_user(&mut self, user: UserRecord) {
        self.users.insert(user.key(), user);
    }

    pub fn remove_user(&mut self, nick: &str) -> Option<UserRecord> {
        self.users.remove(&nick.to_lowercase())
    }

    /// Users ordered by the server's mode prefixes (highest first), then by
    /// nick. Users without a mode, or with an unknown one, come last.
    pub fn sorted_users(&self, prefixes: &[PrefixMode]) -> Vec<&UserRecord> {
        let rank = |mode: &str| {
            prefixes
                .iter()
                .position(|p| p.symbol == mode)
                .unwrap_or(usize::MAX)
        };

        let mut users: Vec<&UserRecord> = self.users.values().collect();
        users.sort_by(|a, b| {
            rank(&a.mode)
                .cmp(&rank(&b.mode))
                .then_with(|| a.nick.to_lowercase().cmp(&b.nick.to_lowercase()))
        });
        users
    }

    /// Release every cached thumbnail still referenced by the buffer.
    pub fn destroy(&mut self, previews: &PreviewStorage) {
        release_previews(self.messages.make_contiguous(), previews);
    }
}

fn release_previews(messages: &mut [Message], previews: &PreviewStorage) {
    for message in messages {
        for preview in &mut message.previews {
            if let Some(thumb) = preview.thumb.take() {
                previews.dereference(&thumb);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Utc;
    use tokio::sync::mpsc;

    use tether_shared::{LinkPreview, MessageKind};

    /// Owner-side state a channel needs, assembled for tests.
    pub(crate) struct Harness {
        pub config: CoreConfig,
        pub ids: IdAllocator,
        pub sessions: Sessions,
        pub tx: mpsc::UnboundedSender<ClientEvent>,
        pub rx: mpsc::UnboundedReceiver<ClientEvent>,
        pub previews: PreviewStorage,
        pub network_uuid: Uuid,
        _dir: tempfile::TempDir,
    }

    impl Harness {
        pub fn new(max_history: Option<usize>) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let config = CoreConfig {
                home: dir.path().to_path_buf(),
                max_history,
                ..CoreConfig::default()
            };
            let (tx, rx) = mpsc::unbounded_channel();
            Self {
                previews: PreviewStorage::new(config.storage_dir()),
                config,
                ids: IdAllocator::new(),
                sessions: Sessions::new(),
                tx,
                rx,
                network_uuid: Uuid::new_v4(),
                _dir: dir,
            }
        }

        pub fn ctx(&self) -> PushContext<'_> {
            PushContext {
                network_uuid: self.network_uuid,
                config: &self.config,
                ids: &self.ids,
                sessions: &self.sessions,
                sink: &self.tx,
                history: None,
                previews: &self.previews,
            }
        }

        pub fn message(&self, text: &str) -> Message {
            Message::new(&self.ids, MessageKind::Message, Utc::now())
                .with_from(UserRecord::new("bob"))
                .with_text(text)
        }

        pub fn drain(&mut self) -> Vec<ClientEvent> {
            let mut events = Vec::new();
            while let Ok(event) = self.rx.try_recv() {
                events.push(event);
            }
            events
        }
    }

    #[test]
    fn pushes_keep_creation_order() {
        let mut h = Harness::new(Some(1000));
        let mut chan = Channel::new(&h.ids, "#rust", ChannelKind::Channel);

        for i in 0..20 {
            let msg = h.message(&i.to_string());
            chan.push_message(&h.ctx(), msg, true);
        }

        let ids: Vec<MessageId> = chan.messages.iter().map(|m| m.id).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));

        let emitted: Vec<MessageId> = h
            .drain()
            .into_iter()
            .filter_map(|e| match e {
                ClientEvent::Msg { msg, .. } => Some(msg.id),
                _ => None,
            })
            .collect();
        assert_eq!(emitted, ids);
    }

    #[test]
    fn buffer_is_bounded_and_evicts_oldest() {
        let h = Harness::new(Some(5));
        let mut chan = Channel::new(&h.ids, "#rust", ChannelKind::Channel);

        for i in 0..12 {
            let msg = h.message(&i.to_string());
            chan.push_message(&h.ctx(), msg, false);
            assert!(chan.messages.len() <= 5);
        }

        let texts: Vec<&str> = chan.messages.iter().map(|m| m.body.text.as_str()).collect();
        assert_eq!(texts, ["7", "8", "9", "10", "11"]);
    }

    #[test]
    fn unread_counts_only_when_closed_everywhere() {
        let mut h = Harness::new(Some(100));
        let mut chan = Channel::new(&h.ids, "#rust", ChannelKind::Channel);

        let msg = h.message("one");
        chan.push_message(&h.ctx(), msg, true);
        assert_eq!(chan.unread, 1);
        assert!(matches!(
            h.drain().as_slice(),
            [ClientEvent::Msg { unread: Some(1), .. }]
        ));

        h.sessions.attach("laptop", None);
        h.sessions.attach("phone", Some(chan.id));
        let msg = h.message("two");
        chan.push_message(&h.ctx(), msg, true);
        assert_eq!(chan.unread, 1);
        assert!(matches!(
            h.drain().as_slice(),
            [ClientEvent::Msg { unread: None, .. }]
        ));
    }

    #[test]
    fn unread_needs_flag_or_highlight() {
        let h = Harness::new(Some(100));
        let mut chan = Channel::new(&h.ids, "#rust", ChannelKind::Channel);

        let quiet = h.message("join noise");
        chan.push_message(&h.ctx(), quiet, false);
        assert_eq!(chan.unread, 0);

        let mention = h.message("hey you").highlighted(true);
        chan.push_message(&h.ctx(), mention, false);
        assert_eq!(chan.unread, 1);
        assert_eq!(chan.highlight, 1);
    }

    #[test]
    fn first_unread_marks_first_missed_message() {
        let h = Harness::new(Some(100));
        let mut chan = Channel::new(&h.ids, "#rust", ChannelKind::Channel);

        let first = h.message("a");
        let first_id = first.id;
        chan.push_message(&h.ctx(), first, true);
        let second = h.message("b");
        chan.push_message(&h.ctx(), second, true);

        assert_eq!(chan.first_unread, Some(first_id));
    }

    #[test]
    fn self_message_resets_markers() {
        let h = Harness::new(Some(100));
        let mut chan = Channel::new(&h.ids, "#rust", ChannelKind::Channel);

        for _ in 0..3 {
            let msg = h.message("ping me").highlighted(true);
            chan.push_message(&h.ctx(), msg, true);
        }
        assert_eq!(chan.highlight, 3);
        assert!(chan.first_unread.is_some());

        let mine = h.message("reply").self_authored(true);
        chan.push_message(&h.ctx(), mine, true);
        assert_eq!(chan.highlight, 0);
        assert_eq!(chan.first_unread, None);
    }

    #[test]
    fn eviction_releases_thumbnails_when_prefetch_storage_is_on() {
        let mut h = Harness::new(Some(1));
        h.config.prefetch = true;
        h.config.prefetch_storage = true;
        let mut chan = Channel::new(&h.ids, "#pics", ChannelKind::Channel);

        h.previews.store("cat.jpg", b"meow").unwrap();
        let mut with_preview = h.message("look");
        with_preview.previews.push(LinkPreview {
            link: "https://example.com/cat".into(),
            thumb: Some("cat.jpg".into()),
        });
        chan.push_message(&h.ctx(), with_preview, true);
        assert_eq!(h.previews.references("cat.jpg"), 1);

        let next = h.message("next");
        chan.push_message(&h.ctx(), next, true);
        assert_eq!(h.previews.references("cat.jpg"), 0);
        assert!(!h.previews.base_path().join("cat.jpg").exists());
    }

    #[test]
    fn destroy_releases_buffered_thumbnails() {
        let h = Harness::new(Some(10));
        let mut chan = Channel::new(&h.ids, "#pics", ChannelKind::Channel);

        h.previews.store("dog.png", b"woof").unwrap();
        let mut msg = h.message("dog");
        msg.previews.push(LinkPreview {
            link: "https://example.com/dog".into(),
            thumb: Some("dog.png".into()),
        });
        chan.push_message(&h.ctx(), msg, false);

        chan.destroy(&h.previews);
        assert_eq!(h.previews.references("dog.png"), 0);
        assert!(chan.messages[0].previews[0].thumb.is_none());
    }

    #[test]
    fn users_are_case_insensitive() {
        let h = Harness::new(None);
        let mut chan = Channel::new(&h.ids, "#rust", ChannelKind::Channel);

        chan.set_user(UserRecord::new("Alice"));
        chan.set_user(UserRecord::with_mode("ALICE", "@"));
        assert_eq!(chan.users.len(), 1);
        assert_eq!(chan.find_user("alice").unwrap().mode, "@");

        assert_eq!(chan.get_user("carol").nick, "carol");
        assert!(chan.find_user("carol").is_none());

        assert!(chan.remove_user("aLiCe").is_some());
        assert!(chan.users.is_empty());
    }

    #[test]
    fn users_sort_by_mode_then_nick() {
        let h = Harness::new(None);
        let mut chan = Channel::new(&h.ids, "#rust", ChannelKind::Channel);
        let prefixes = vec![
            PrefixMode { symbol: "@".into(), mode: 'o' },
            PrefixMode { symbol: "+".into(), mode: 'v' },
        ];

        chan.set_user(UserRecord::new("zed"));
        chan.set_user(UserRecord::with_mode("bob", "+"));
        chan.set_user(UserRecord::with_mode("Carl", "@"));
        chan.set_user(UserRecord::with_mode("abe", "@"));
        chan.set_user(UserRecord::new("Amy"));

        let order: Vec<&str> = chan
            .sorted_users(&prefixes)
            .into_iter()
            .map(|u| u.nick.as_str())
            .collect();
        assert_eq!(order, ["abe", "Carl", "bob", "Amy", "zed"]);
    }

    #[test]
    fn only_channels_and_queries_are_loggable() {
        let ids = IdAllocator::new();
        assert!(Channel::new(&ids, "#a", ChannelKind::Channel).is_loggable());
        assert!(Channel::new(&ids, "bob", ChannelKind::Query).is_loggable());
        assert!(!Channel::new(&ids, "net", ChannelKind::Lobby).is_loggable());
        assert!(!Channel::new(&ids, "Banlist for #a", ChannelKind::Special).is_loggable());
    }

    #[test]
    fn prepended_history_is_announced() {
        let mut h = Harness::new(Some(1000));
        let mut chan = Channel::new(&h.ids, "#rust", ChannelKind::Channel);
        let live = h.message("live").self_authored(true);
        chan.push_message(&h.ctx(), live, false);
        h.drain();

        let loaded: Vec<Message> = (0..150).map(|i| h.message(&format!("old {i}"))).collect();
        let last_loaded = loaded[149].id;
        chan.prepend_history(&h.ctx(), loaded);

        assert_eq!(chan.messages.len(), 151);
        assert_eq!(chan.messages[0].body.text, "old 0");
        assert_eq!(chan.messages[150].body.text, "live");
        assert_eq!(chan.first_unread, Some(last_loaded));

        match h.drain().as_slice() {
            [ClientEvent::More { chan: id, messages }] => {
                assert_eq!(*id, chan.id);
                assert_eq!(messages.len(), 100);
                assert_eq!(messages[99].id, last_loaded);
            }
            other => panic!("unexpected events: {other:?}"),
        }
    }

    #[test]
    fn empty_history_changes_nothing() {
        let mut h = Harness::new(Some(10));
        let mut chan = Channel::new(&h.ids, "#rust", ChannelKind::Channel);
        chan.prepend_history(&h.ctx(), Vec::new());
        assert!(chan.first_unread.is_none());
        assert!(h.drain().is_empty());
    }
}
