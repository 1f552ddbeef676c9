//! One IRC server connection and its ordered list of channels.
//!
//! `channels[0]` is always the lobby. It is created with the network, never
//! matched by name lookups, never removed and never moved by sorted inserts.

use std::net::IpAddr;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use tether_shared::constants::DEFAULT_IRC_PORT;
use tether_shared::{ChannelId, IdAllocator, MessageId, NetworkId};

use crate::channel::{Channel, ChannelKind};
use crate::previews::PreviewStorage;
use crate::sync::{ActiveChannel, NetworkSnapshot};

/// One entry of the server's `PREFIX` list, e.g. `@` for `o`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrefixMode {
    pub symbol: String,
    pub mode: char,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct ServerOptions {
    /// Highest privilege first.
    pub prefix: Vec<PrefixMode>,
    pub network: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkStatus {
    pub connected: bool,
    pub secure: bool,
}

/// The live IRC connection, as far as connection status is concerned.
pub trait Transport: Send + Sync {
    fn is_connected(&self) -> bool;

    /// TLS is established and the peer certificate was verified.
    fn is_encrypted_and_authorized(&self) -> bool;

    fn remote_addr(&self) -> Option<IpAddr>;
}

/// A channel as stored in the user configuration file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExportedChannel {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ChannelKind>,
}

/// Persistable network settings, used both to construct a [`Network`] and
/// as the output of [`Network::export`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    #[serde(default)]
    pub uuid: Option<Uuid>,
    #[serde(default)]
    pub away_message: String,
    #[serde(default)]
    pub nick: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub tls: bool,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub realname: String,
    #[serde(default)]
    pub commands: Vec<String>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub channels: Vec<ExportedChannel>,
}

fn default_port() -> u16 {
    DEFAULT_IRC_PORT
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            uuid: None,
            away_message: String::new(),
            nick: String::new(),
            name: String::new(),
            host: String::new(),
            port: DEFAULT_IRC_PORT,
            tls: false,
            password: String::new(),
            username: String::new(),
            realname: String::new(),
            commands: Vec::new(),
            ip: None,
            hostname: None,
            channels: Vec::new(),
        }
    }
}

pub struct Network {
    pub id: NetworkId,
    /// Durable identity; keys the message log across restarts.
    pub uuid: Uuid,
    pub name: String,
    pub host: String,
    pub port: u16,
    pub tls: bool,
    pub nick: String,
    pub username: String,
    pub realname: String,
    pub password: String,
    pub away_message: String,
    pub commands: Vec<String>,
    pub ip: Option<String>,
    pub hostname: Option<String>,
    pub server_options: ServerOptions,
    pub channels: Vec<Channel>,
    /// Channels to rejoin after a reconnect.
    pub chan_cache: Vec<Channel>,
    transport: Option<Box<dyn Transport>>,
    highlight_regex: Option<Regex>,
}

impl Network {
    pub fn new(ids: &IdAllocator, config: NetworkConfig) -> Self {
        let name = if config.name.is_empty() {
            config.host.clone()
        } else {
            config.name
        };

        let mut channels = Vec::with_capacity(config.channels.len() + 1);
        channels.push(Channel::new(ids, name.clone(), ChannelKind::Lobby));
        for exported in config.channels {
            let channel = match exported.kind {
                Some(ChannelKind::Query) => Channel::new(ids, exported.name, ChannelKind::Query),
                _ => Channel::new(ids, exported.name, ChannelKind::Channel)
                    .with_key(exported.key.unwrap_or_default()),
            };
            channels.push(channel);
        }

        let mut network = Self {
            id: ids.next_network(),
            uuid: config.uuid.unwrap_or_else(Uuid::new_v4),
            name,
            host: config.host,
            port: config.port,
            tls: config.tls,
            nick: String::new(),
            username: config.username,
            realname: config.realname,
            password: config.password,
            away_message: config.away_message,
            commands: config.commands,
            ip: config.ip,
            hostname: config.hostname,
            server_options: ServerOptions::default(),
            channels,
            chan_cache: Vec::new(),
            transport: None,
            highlight_regex: None,
        };
        network.set_nick(&config.nick);
        network
    }

    /// Store the nick and rebuild the pattern matching mentions of it.
    pub fn set_nick(&mut self, nick: &str) {
        self.nick = nick.to_string();
        if nick.is_empty() {
            self.highlight_regex = None;
            return;
        }

        let pattern = format!(
            r"(?i)(?:^|[^a-z0-9]|\x03[0-9]{{1,2}}){}(?:[^a-z0-9]|$)",
            regex::escape(nick)
        );
        match Regex::new(&pattern) {
            Ok(re) => self.highlight_regex = Some(re),
            Err(e) => {
                warn!(network = %self.uuid, nick, error = %e, "unable to build highlight pattern");
                self.highlight_regex = None;
            }
        }
    }

    /// Whether `text` mentions our nick.
    pub fn is_highlight(&self, text: &str) -> bool {
        self.highlight_regex
            .as_ref()
            .is_some_and(|re| re.is_match(text))
    }

    pub fn set_transport(&mut self, transport: Option<Box<dyn Transport>>) {
        self.transport = transport;
    }

    pub fn status(&self) -> NetworkStatus {
        let Some(transport) = &self.transport else {
            return NetworkStatus::default();
        };

        let loopback = transport.remote_addr().is_some_and(|addr| addr.is_loopback());
        NetworkStatus {
            connected: transport.is_connected(),
            secure: transport.is_encrypted_and_authorized() || loopback,
        }
    }

    pub fn filtered_clone(
        &self,
        active: ActiveChannel,
        last_message: Option<MessageId>,
    ) -> NetworkSnapshot {
        NetworkSnapshot::of(self, active, last_message)
    }

    /// Settings to persist in the user configuration. The lobby and special
    /// windows are left out.
    pub fn export(&self) -> NetworkConfig {
        let channels = self
            .channels
            .iter()
            .filter_map(|chan| match chan.kind {
                ChannelKind::Channel => Some(ExportedChannel {
                    name: chan.name.clone(),
                    key: Some(chan.key.clone()),
                    kind: None,
                }),
                ChannelKind::Query => Some(ExportedChannel {
                    name: chan.name.clone(),
                    key: None,
                    kind: Some(ChannelKind::Query),
                }),
                ChannelKind::Lobby | ChannelKind::Special => None,
            })
            .collect();

        NetworkConfig {
            uuid: Some(self.uuid),
            away_message: self.away_message.clone(),
            nick: self.nick.clone(),
            name: self.name.clone(),
            host: self.host.clone(),
            port: self.port,
            tls: self.tls,
            password: self.password.clone(),
            username: self.username.clone(),
            realname: self.realname.clone(),
            commands: self.commands.clone(),
            ip: self.ip.clone(),
            hostname: self.hostname.clone(),
            channels,
        }
    }

    pub fn lobby(&self) -> &Channel {
        &self.channels[0]
    }

    pub fn lobby_mut(&mut self) -> &mut Channel {
        &mut self.channels[0]
    }

    /// Index of the channel called `name`, ignoring case. Never 0.
    pub fn channel_index(&self, name: &str) -> Option<usize> {
        let name = name.to_lowercase();
        self.channels
            .iter()
            .skip(1)
            .position(|c| c.name.to_lowercase() == name)
            .map(|i| i + 1)
    }

    /// Case-insensitive lookup by name. Never returns the lobby.
    pub fn get_channel(&self, name: &str) -> Option<&Channel> {
        self.channel_index(name).map(|i| &self.channels[i])
    }

    pub fn get_channel_mut(&mut self, name: &str) -> Option<&mut Channel> {
        let index = self.channel_index(name)?;
        Some(&mut self.channels[index])
    }

    pub fn find_channel(&self, id: ChannelId) -> Option<&Channel> {
        self.channels.iter().find(|c| c.id == id)
    }

    pub fn find_channel_mut(&mut self, id: ChannelId) -> Option<&mut Channel> {
        self.channels.iter_mut().find(|c| c.id == id)
    }

    /// Insert keeping names after the lobby in ascending order; returns the
    /// absolute index of the new channel.
    pub fn insert_channel_sorted(&mut self, channel: Channel) -> usize {
        let existing = self.channels.iter().skip(1).map(|c| c.name.as_str());
        let index = 1 + insertion_index(&channel.name, existing);
        self.channels.insert(index, channel);
        index
    }

    /// Append at the end of the list; returns its index.
    pub fn push_channel(&mut self, channel: Channel) -> usize {
        self.channels.push(channel);
        self.channels.len() - 1
    }

    /// Remove a channel by id. The lobby cannot be removed.
    pub fn remove_channel(&mut self, id: ChannelId) -> Option<Channel> {
        let index = self.channels.iter().skip(1).position(|c| c.id == id)? + 1;
        Some(self.channels.remove(index))
    }

    pub fn destroy(&mut self, previews: &PreviewStorage) {
        debug!(network = %self.uuid, channels = self.channels.len(), "destroying network");
        for channel in &mut self.channels {
            channel.destroy(previews);
        }
    }
}

/// Position at which `name` keeps `existing` in ascending order: the first
/// entry strictly greater than it, or the end of the list.
pub fn insertion_index<'a>(name: &str, existing: impl IntoIterator<Item = &'a str>) -> usize {
    let mut count = 0;
    for (i, other) in existing.into_iter().enumerate() {
        if other > name {
            return i;
        }
        count = i + 1;
    }
    count
}
