//! # tether-shared
//!
//! Value types used by every Tether crate: identifiers, the process-wide id
//! allocator, chat messages and user records.

pub mod constants;
pub mod error;
pub mod ids;
pub mod message;
pub mod types;

pub use error::SharedError;
pub use ids::IdAllocator;
pub use message::{BanEntry, LinkPreview, Message, MessageBody, MessageKind};
pub use types::{ChannelId, MessageId, NetworkId, UserRecord};
