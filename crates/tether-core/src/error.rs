use thiserror::Error;

use tether_shared::{ChannelId, NetworkId};

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Store error: {0}")]
    Store(#[from] tether_store::StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Network not found: {0}")]
    NetworkNotFound(NetworkId),

    #[error("Channel not found: {0}")]
    ChannelNotFound(ChannelId),

    #[error("Failed to emit event: {0}")]
    Emit(String),

    #[error("History worker is not running")]
    WorkerClosed,
}

pub type Result<T> = std::result::Result<T, CoreError>;
