//! Process-wide identifier sequences.
//!
//! One [`IdAllocator`] is created at startup and shared (behind an `Arc`) by
//! every client, so channel and message ids stay unique across all users for
//! the lifetime of the process. Nothing here survives a restart.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::{ChannelId, MessageId, NetworkId};

#[derive(Debug)]
pub struct IdAllocator {
    network: AtomicU64,
    channel: AtomicU64,
    message: AtomicU64,
}

impl IdAllocator {
    /// All sequences start at 1; 0 is reserved to mean "none".
    pub fn new() -> Self {
        Self {
            network: AtomicU64::new(1),
            channel: AtomicU64::new(1),
            message: AtomicU64::new(1),
        }
    }

    pub fn next_network(&self) -> NetworkId {
        NetworkId(self.network.fetch_add(1, Ordering::Relaxed))
    }

    pub fn next_channel(&self) -> ChannelId {
        ChannelId(self.channel.fetch_add(1, Ordering::Relaxed))
    }

    pub fn next_message(&self) -> MessageId {
        MessageId(self.message.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
