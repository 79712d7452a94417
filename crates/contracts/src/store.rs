//! DestinationStore trait - configuration store interface
//!
//! One contract, three independent backends (memory / embedded / relational).

use crate::{DestinationMap, StoreError};

/// Guild -> destination channel store
///
/// All implementations share the same external contract:
/// - upsert and delete are atomic per guild, last writer wins
/// - removing an absent guild is not an error
/// - `list_destinations` returns a point-in-time snapshot owned by the caller
#[trait_variant::make(DestinationStore: Send)]
pub trait LocalDestinationStore {
    /// Backend name (used for logging/metrics)
    fn backend(&self) -> &str;

    /// Set (or overwrite) the destination channel for a guild
    ///
    /// # Errors
    /// Returns `StoreError` on underlying I/O failure only
    async fn set_destination(&self, guild_id: &str, channel_id: &str) -> Result<(), StoreError>;

    /// Remove the destination for a guild, succeeding if none exists
    async fn remove_destination(&self, guild_id: &str) -> Result<(), StoreError>;

    /// Consistent snapshot of every destination
    async fn list_destinations(&self) -> Result<DestinationMap, StoreError>;
}
