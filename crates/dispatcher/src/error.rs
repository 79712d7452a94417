//! Dispatcher error types

use contracts::{ChannelId, GuildId, PlatformError, UserId};
use thiserror::Error;

/// One destination could not be posted to
///
/// Logged and answered with an owner notification, never propagated.
#[derive(Debug, Clone, Error)]
#[error("failed to deliver to channel {channel_id} in guild {guild_id}: {source}")]
pub struct DeliveryError {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    #[source]
    pub source: PlatformError,
}

impl DeliveryError {
    pub fn new(guild_id: &str, channel_id: &str, source: PlatformError) -> Self {
        Self {
            guild_id: guild_id.to_string(),
            channel_id: channel_id.to_string(),
            source,
        }
    }
}

/// Owner notification failure, by stage. Logged only.
#[derive(Debug, Clone, Error)]
pub enum NotificationError {
    /// Guild owner could not be resolved
    #[error("owner lookup for guild {guild_id} failed: {source}")]
    OwnerLookup {
        guild_id: GuildId,
        #[source]
        source: PlatformError,
    },

    /// Private channel with the owner could not be opened
    #[error("opening private channel with {owner_id} failed: {source}")]
    PrivateChannel {
        owner_id: UserId,
        #[source]
        source: PlatformError,
    },

    /// Notice could not be sent
    #[error("sending notice to {owner_id} failed: {source}")]
    Send {
        owner_id: UserId,
        #[source]
        source: PlatformError,
    },
}

impl NotificationError {
    /// Stage label used in logs and metrics
    pub fn stage(&self) -> &'static str {
        match self {
            Self::OwnerLookup { .. } => "owner_lookup",
            Self::PrivateChannel { .. } => "private_channel",
            Self::Send { .. } => "send",
        }
    }
}
