//! InboundMessage - chat message delivered to the command handler

use crate::{ChannelId, GuildId, UserId};

/// A message received from the chat platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Guild the message was posted in (None for private channels)
    pub guild_id: Option<GuildId>,

    /// Channel the message was posted in
    pub channel_id: ChannelId,

    /// Author
    pub author_id: UserId,

    /// Author is a bot account
    pub author_is_bot: bool,

    /// Raw message text
    pub content: String,
}

impl InboundMessage {
    /// Message from a human member of a guild
    pub fn in_guild(
        guild_id: impl Into<GuildId>,
        channel_id: impl Into<ChannelId>,
        author_id: impl Into<UserId>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            guild_id: Some(guild_id.into()),
            channel_id: channel_id.into(),
            author_id: author_id.into(),
            author_is_bot: false,
            content: content.into(),
        }
    }
}
