//! Destination mapping - guild -> relay channel

use std::collections::HashMap;

/// Chat-platform guild (community) identifier
pub type GuildId = String;

/// Chat-platform channel identifier
pub type ChannelId = String;

/// Chat-platform user identifier
pub type UserId = String;

/// Snapshot of every configured destination (guild_id -> channel_id)
///
/// Always an owned copy: callers may mutate it freely.
pub type DestinationMap = HashMap<GuildId, ChannelId>;

/// One configured destination
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Destination {
    /// Subscribing guild
    pub guild_id: GuildId,

    /// Channel in that guild receiving relayed items
    pub channel_id: ChannelId,
}

impl Destination {
    pub fn new(guild_id: impl Into<GuildId>, channel_id: impl Into<ChannelId>) -> Self {
        Self {
            guild_id: guild_id.into(),
            channel_id: channel_id.into(),
        }
    }
}

/// Flatten a snapshot into destinations, sorted by guild for stable iteration
pub fn destinations_of(map: &DestinationMap) -> Vec<Destination> {
    let mut out: Vec<Destination> = map
        .iter()
        .map(|(guild, channel)| Destination::new(guild.clone(), channel.clone()))
        .collect();
    out.sort_by(|a, b| a.guild_id.cmp(&b.guild_id));
    out
}
