//! ChatSession trait - chat platform interface
//!
//! Narrow view of the chat platform used by the dispatcher and the admin
//! handler. Real (REST) and mock sessions implement the same trait.

use serde::{Deserialize, Serialize};

use crate::{ChannelId, PlatformError, UserId};

/// Administrator permission bit
pub const PERMISSION_ADMINISTRATOR: u64 = 1 << 3;

/// Longest plain-text message the platform accepts, in characters
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// Split `text` into pieces of at most `max_chars` characters
///
/// Pieces are in order and concatenate back to `text`. Empty text yields a
/// single empty piece.
pub fn split_message(text: &str, max_chars: usize) -> Vec<&str> {
    let max_chars = max_chars.max(1);
    let mut pieces = Vec::new();
    let mut rest = text;
    while let Some((cut, _)) = rest.char_indices().nth(max_chars) {
        let (head, tail) = rest.split_at(cut);
        pieces.push(head);
        rest = tail;
    }
    if !rest.is_empty() || pieces.is_empty() {
        pieces.push(rest);
    }
    pieces
}

/// Guild role with its permission bit set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub id: String,
    pub permissions: u64,
}

impl Role {
    pub fn new(id: impl Into<String>, permissions: u64) -> Self {
        Self {
            id: id.into(),
            permissions,
        }
    }

    /// Role grants the administrator capability
    pub fn is_admin(&self) -> bool {
        self.permissions & PERMISSION_ADMINISTRATOR != 0
    }
}

/// Structured (embed) message content
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub color: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
}

/// One embed field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Chat platform session
#[trait_variant::make(ChatSession: Send)]
pub trait LocalChatSession {
    /// Post plain text to a channel
    ///
    /// # Errors
    /// Permission or network failure
    async fn send_message(&self, channel_id: &str, text: &str) -> Result<(), PlatformError>;

    /// Post an embed to a channel
    async fn send_embed(&self, channel_id: &str, embed: &Embed) -> Result<(), PlatformError>;

    /// Owner of a guild; fails if the guild is unknown
    async fn guild_owner(&self, guild_id: &str) -> Result<UserId, PlatformError>;

    /// Open (or reuse) a private channel with a user
    async fn open_private_channel(&self, user_id: &str) -> Result<ChannelId, PlatformError>;

    /// Role ids held by a guild member
    async fn member_roles(&self, guild_id: &str, member_id: &str)
        -> Result<Vec<String>, PlatformError>;

    /// Every role of a guild
    async fn guild_roles(&self, guild_id: &str) -> Result<Vec<Role>, PlatformError>;

    /// Guild a channel belongs to; None for private channels
    async fn channel_guild(&self, channel_id: &str) -> Result<Option<String>, PlatformError>;
}
