//! MemoryStore - process-local destination map

use std::sync::{PoisonError, RwLock};

use contracts::{DestinationMap, DestinationStore, StoreError};
use tracing::{debug, instrument};

/// Destination store kept in process memory
///
/// Writers take the lock exclusively, readers share it. Snapshots are deep
/// copies taken under the read lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    channels: RwLock<DestinationMap>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of configured guilds
    pub fn len(&self) -> usize {
        self.channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// No guild configured
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DestinationStore for MemoryStore {
    fn backend(&self) -> &str {
        "memory"
    }

    #[instrument(name = "memory_store_set", skip(self))]
    async fn set_destination(&self, guild_id: &str, channel_id: &str) -> Result<(), StoreError> {
        let mut channels = self
            .channels
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        channels.insert(guild_id.to_string(), channel_id.to_string());
        debug!(guild = %guild_id, channel = %channel_id, "destination set");
        Ok(())
    }

    #[instrument(name = "memory_store_remove", skip(self))]
    async fn remove_destination(&self, guild_id: &str) -> Result<(), StoreError> {
        let mut channels = self
            .channels
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if channels.remove(guild_id).is_some() {
            debug!(guild = %guild_id, "destination removed");
        }
        Ok(())
    }

    async fn list_destinations(&self) -> Result<DestinationMap, StoreError> {
        let channels = self
            .channels
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(channels.clone())
    }
}
