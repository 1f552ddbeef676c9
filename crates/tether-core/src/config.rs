//! Engine configuration loaded from environment variables.
//!
//! All settings have defaults so the engine runs with zero configuration.

use std::path::PathBuf;

use directories::ProjectDirs;

use tether_shared::constants::{APP_NAME, DEFAULT_LOG_QUEUE, DEFAULT_MAX_HISTORY, SQLITE_BACKEND};

#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Root directory holding `logs/`, `storage/` and `users/`.
    /// Env: `TETHER_HOME`
    /// Default: the platform data directory, or `./tether`.
    pub home: PathBuf,

    /// Enabled message log backends. Only `sqlite` is understood.
    /// Env: `TETHER_MESSAGE_STORAGE` (comma separated, may be empty)
    /// Default: `sqlite`
    pub message_storage: Vec<String>,

    /// Maximum messages kept per channel in memory and loaded from the log.
    /// `None` means unbounded.
    /// Env: `TETHER_MAX_HISTORY` (negative = unbounded)
    /// Default: `10000`
    pub max_history: Option<usize>,

    /// Whether link previews are prefetched.
    /// Env: `TETHER_PREFETCH`
    pub prefetch: bool,

    /// Whether prefetched thumbnails are kept in local storage, in which case
    /// evicted messages must release them.
    /// Env: `TETHER_PREFETCH_STORAGE`
    pub prefetch_storage: bool,

    /// Capacity of the write-through queue in front of the message log.
    /// Env: `TETHER_LOG_QUEUE`
    /// Default: `1024`
    pub log_queue: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        let home = ProjectDirs::from("org", "tether", APP_NAME)
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("./tether"));

        Self {
            home,
            message_storage: vec![SQLITE_BACKEND.to_string()],
            max_history: Some(DEFAULT_MAX_HISTORY),
            prefetch: false,
            prefetch_storage: false,
            log_queue: DEFAULT_LOG_QUEUE,
        }
    }
}

impl CoreConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(home) = lookup("TETHER_HOME") {
            config.home = PathBuf::from(home);
        }

        if let Some(list) = lookup("TETHER_MESSAGE_STORAGE") {
            config.message_storage = list
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect();
        }

        if let Some(val) = lookup("TETHER_MAX_HISTORY") {
            match val.trim().parse::<i64>() {
                Ok(n) if n < 0 => config.max_history = None,
                Ok(n) => config.max_history = Some(n as usize),
                Err(_) => {
                    tracing::warn!(value = %val, "Invalid TETHER_MAX_HISTORY, using default");
                }
            }
        }

        if let Some(val) = lookup("TETHER_PREFETCH") {
            config.prefetch = parse_flag(&val);
        }

        if let Some(val) = lookup("TETHER_PREFETCH_STORAGE") {
            config.prefetch_storage = parse_flag(&val);
        }

        if let Some(val) = lookup("TETHER_LOG_QUEUE") {
            match val.trim().parse::<usize>() {
                Ok(n) if n > 0 => config.log_queue = n,
                _ => {
                    tracing::warn!(value = %val, "Invalid TETHER_LOG_QUEUE, using default");
                }
            }
        }

        config
    }

    /// Whether the SQLite message log is enabled for this deployment.
    pub fn sqlite_enabled(&self) -> bool {
        self.message_storage.iter().any(|b| b == SQLITE_BACKEND)
    }

    /// Whether evicted messages must release their cached thumbnails.
    ///
    /// With a history bound of zero a thumbnail would be gone before any
    /// client could fetch it, so nothing is released in that case.
    pub fn releases_previews(&self) -> bool {
        self.prefetch && self.prefetch_storage && self.max_history != Some(0)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.home.join("logs")
    }

    pub fn storage_dir(&self) -> PathBuf {
        self.home.join("storage")
    }

    pub fn user_config_path(&self, user: &str) -> PathBuf {
        self.home.join("users").join(format!("{user}.json"))
    }
}

fn parse_flag(val: &str) -> bool {
    let val = val.trim();
    !val.is_empty() && val != "false" && val != "0"
}
