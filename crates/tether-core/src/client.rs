//! The per-user owner of networks and attached sessions.
//!
//! All in-memory state is mutated through `&mut Client`; the only work that
//! leaves the caller's task is the message log, which lives behind a
//! [`HistoryHandle`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use tether_shared::{ChannelId, IdAllocator, MessageId, NetworkId};
use tether_store::MessageLog;

use crate::channel::{Channel, PushContext};
use crate::config::CoreConfig;
use crate::error::{CoreError, Result};
use crate::events::EventSink;
use crate::handlers::{self, HandlerOutcome, IrcEvent};
use crate::history::HistoryHandle;
use crate::network::{Network, NetworkConfig};
use crate::previews::PreviewStorage;
use crate::session::Sessions;
use crate::sync::{ActiveChannel, NetworkSnapshot};

/// Contents of `users/<name>.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfigFile {
    /// Whether this user's messages go to the message log.
    #[serde(default = "default_log")]
    pub log: bool,
    #[serde(default)]
    pub networks: Vec<NetworkConfig>,
}

fn default_log() -> bool {
    true
}

impl Default for UserConfigFile {
    fn default() -> Self {
        Self {
            log: true,
            networks: Vec::new(),
        }
    }
}

impl UserConfigFile {
    /// Read a user file. A missing file is an empty configuration.
    pub fn read(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }
}

pub struct Client {
    name: String,
    config: Arc<CoreConfig>,
    ids: Arc<IdAllocator>,
    sink: Arc<dyn EventSink>,
    previews: Arc<PreviewStorage>,
    history: Option<HistoryHandle>,
    sessions: Sessions,
    networks: Vec<Network>,
    log_enabled: bool,
    config_path: PathBuf,
}

impl Client {
    pub fn new(
        name: impl Into<String>,
        user: UserConfigFile,
        config: Arc<CoreConfig>,
        ids: Arc<IdAllocator>,
        sink: Arc<dyn EventSink>,
        previews: Arc<PreviewStorage>,
    ) -> Self {
        let name = name.into();
        let config_path = config.user_config_path(&name);
        let networks = user
            .networks
            .into_iter()
            .map(|network| Network::new(&ids, network))
            .collect();

        Self {
            name,
            config,
            ids,
            sink,
            previews,
            history: None,
            sessions: Sessions::new(),
            networks,
            log_enabled: user.log,
            config_path,
        }
    }

    /// Build a client from its file under `<home>/users/`.
    pub fn load(
        name: impl Into<String>,
        config: Arc<CoreConfig>,
        ids: Arc<IdAllocator>,
        sink: Arc<dyn EventSink>,
        previews: Arc<PreviewStorage>,
    ) -> Result<Self> {
        let name = name.into();
        let user = UserConfigFile::read(&config.user_config_path(&name))?;
        Ok(Self::new(name, user, config, ids, sink, previews))
    }

    /// Open the message log and start its worker, when logging is enabled
    /// both for the deployment and for this user.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_history(&mut self) -> Option<JoinHandle<()>> {
        if !self.config.sqlite_enabled() || !self.log_enabled {
            debug!(user = %self.name, "message log not enabled");
            return None;
        }

        let log = MessageLog::enable(&self.config.logs_dir(), &self.name);
        if !log.is_enabled() {
            return None;
        }

        let (handle, task) = HistoryHandle::spawn(
            log,
            self.ids.clone(),
            self.config.max_history,
            self.config.log_queue,
        );
        self.history = Some(handle);
        Some(task)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn networks(&self) -> &[Network] {
        &self.networks
    }

    pub fn network(&self, id: NetworkId) -> Option<&Network> {
        self.networks.iter().find(|n| n.id == id)
    }

    pub fn network_mut(&mut self, id: NetworkId) -> Option<&mut Network> {
        self.networks.iter_mut().find(|n| n.id == id)
    }

    pub fn sessions(&self) -> &Sessions {
        &self.sessions
    }

    pub fn add_network(&mut self, network: NetworkConfig) -> NetworkId {
        let network = Network::new(&self.ids, network);
        let id = network.id;
        info!(user = %self.name, network = %network.uuid, host = %network.host, "network added");

        self.networks.push(network);
        self.persist();
        id
    }

    pub fn remove_network(&mut self, id: NetworkId) -> Result<()> {
        let index = self
            .networks
            .iter()
            .position(|n| n.id == id)
            .ok_or(CoreError::NetworkNotFound(id))?;

        let mut network = self.networks.remove(index);
        network.destroy(&self.previews);
        info!(user = %self.name, network = %network.uuid, "network removed");

        self.persist();
        Ok(())
    }

    pub fn attach(&mut self, session: &str, open_channel: Option<ChannelId>) {
        self.sessions.attach(session, open_channel);
        debug!(user = %self.name, session, attached = self.sessions.len(), "session attached");
    }

    pub fn detach(&mut self, session: &str) {
        if self.sessions.detach(session).is_none() {
            warn!(user = %self.name, session, "detach for unknown session");
        }
    }

    /// Record that `session` now shows `channel`, clearing its unread and
    /// highlight counters.
    pub fn open_channel(&mut self, session: &str, channel: Option<ChannelId>) -> Result<()> {
        if !self.sessions.set_open_channel(session, channel) {
            warn!(user = %self.name, session, "open channel for unknown session");
        }

        let Some(id) = channel else {
            return Ok(());
        };
        let chan = self
            .find_channel_mut(id)
            .ok_or(CoreError::ChannelNotFound(id))?;
        chan.unread = 0;
        chan.highlight = 0;
        Ok(())
    }

    /// State for a session that just attached or reconnected.
    pub fn init_state(
        &self,
        active: ActiveChannel,
        last_message: Option<MessageId>,
    ) -> Vec<NetworkSnapshot> {
        self.networks
            .iter()
            .map(|n| n.filtered_clone(active, last_message))
            .collect()
    }

    pub fn find_channel(&self, id: ChannelId) -> Option<(&Network, &Channel)> {
        self.networks
            .iter()
            .find_map(|n| n.find_channel(id).map(|c| (n, c)))
    }

    fn find_channel_mut(&mut self, id: ChannelId) -> Option<&mut Channel> {
        self.networks
            .iter_mut()
            .find_map(|n| n.find_channel_mut(id))
    }

    pub fn handle_event(&mut self, network: NetworkId, event: IrcEvent) -> Result<HandlerOutcome> {
        let Self {
            ref config,
            ref ids,
            ref sink,
            ref previews,
            ref history,
            ref sessions,
            ref mut networks,
            ..
        } = *self;

        let target = networks
            .iter_mut()
            .find(|n| n.id == network)
            .ok_or(CoreError::NetworkNotFound(network))?;

        let ctx = PushContext {
            network_uuid: target.uuid,
            config: &**config,
            ids: &**ids,
            sessions,
            sink: &**sink,
            history: history.as_ref(),
            previews: &**previews,
        };
        let outcome = handlers::dispatch(target, &ctx, event);

        if outcome.config_changed {
            self.persist();
        }
        Ok(outcome)
    }

    /// Load stored history for one channel and prepend it to the buffer.
    ///
    /// A failed read is logged and treated as no history.
    pub async fn load_history(&mut self, network: NetworkId, channel: ChannelId) -> Result<()> {
        let Some(history) = self.history.clone() else {
            return Ok(());
        };

        let target = self.network(network).ok_or(CoreError::NetworkNotFound(network))?;
        let uuid = target.uuid;
        let chan = target
            .find_channel(channel)
            .ok_or(CoreError::ChannelNotFound(channel))?;
        if !chan.is_loggable() {
            return Ok(());
        }
        let name = chan.name.clone();

        let loaded = match history.get_messages(uuid, &name).await {
            Ok(messages) => messages,
            Err(e) => {
                error!(network = %uuid, chan = %name, error = %e, "failed to load messages");
                return Ok(());
            }
        };
        debug!(network = %uuid, chan = %name, count = loaded.len(), "loaded history");

        let Self {
            ref config,
            ref ids,
            ref sink,
            ref previews,
            ref history,
            ref sessions,
            ref mut networks,
            ..
        } = *self;

        // the channel may have gone away while the log was being read
        let Some(chan) = networks
            .iter_mut()
            .find(|n| n.id == network)
            .and_then(|n| n.find_channel_mut(channel))
        else {
            return Ok(());
        };

        let ctx = PushContext {
            network_uuid: uuid,
            config: &**config,
            ids: &**ids,
            sessions,
            sink: &**sink,
            history: history.as_ref(),
            previews: &**previews,
        };
        chan.prepend_history(&ctx, loaded);
        Ok(())
    }

    /// Load stored history for every loggable channel of every network.
    pub async fn load_all_history(&mut self) {
        let targets: Vec<(NetworkId, ChannelId)> = self
            .networks
            .iter()
            .flat_map(|n| {
                n.channels
                    .iter()
                    .filter(|c| c.is_loggable())
                    .map(move |c| (n.id, c.id))
            })
            .collect();

        for (network, channel) in targets {
            if let Err(e) = self.load_history(network, channel).await {
                warn!(user = %self.name, error = %e, "skipping history load");
            }
        }
    }

    /// Write the user configuration file.
    pub fn save(&self) -> Result<()> {
        let file = UserConfigFile {
            log: self.log_enabled,
            networks: self.networks.iter().map(Network::export).collect(),
        };
        let json = serde_json::to_string_pretty(&file)?;

        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.config_path, json)?;

        debug!(user = %self.name, path = %self.config_path.display(), "user configuration saved");
        Ok(())
    }

    fn persist(&self) {
        if let Err(e) = self.save() {
            error!(user = %self.name, path = %self.config_path.display(), error = %e, "failed to save user configuration");
        }
    }

    /// Release everything held for this user.
    pub fn quit(&mut self) {
        for network in &mut self.networks {
            network.destroy(&self.previews);
        }
        self.networks.clear();
        self.history = None;
        info!(user = %self.name, "client stopped");
    }
}
