//! Startup-selected store backend

use contracts::{DestinationMap, DestinationStore, StoreConfig, StoreError};
use tracing::{info, instrument};

use crate::{EmbeddedStore, MemoryStore, RelationalStore};

/// The single store instance of a process
///
/// Chosen once from `StoreConfig`; backends are never mixed at runtime.
#[derive(Debug)]
pub enum ConfigStore {
    Memory(MemoryStore),
    Embedded(EmbeddedStore),
    Relational(RelationalStore),
}

/// Open the backend described by `config`
///
/// # Errors
/// The backend cannot be opened. Callers treat this as fatal at startup.
#[instrument(name = "store_open", skip(config), fields(backend = config.backend_name()))]
pub async fn open_store(config: &StoreConfig) -> Result<ConfigStore, StoreError> {
    let store = match config {
        StoreConfig::Memory => ConfigStore::Memory(MemoryStore::new()),
        StoreConfig::Embedded { path } => ConfigStore::Embedded(EmbeddedStore::open(path)?),
        StoreConfig::Relational {
            url,
            max_connections,
        } => ConfigStore::Relational(RelationalStore::connect(url, *max_connections).await?),
    };
    info!(backend = store.backend(), "destination store ready");
    Ok(store)
}

impl DestinationStore for ConfigStore {
    fn backend(&self) -> &str {
        match self {
            Self::Memory(s) => s.backend(),
            Self::Embedded(s) => s.backend(),
            Self::Relational(s) => s.backend(),
        }
    }

    async fn set_destination(&self, guild_id: &str, channel_id: &str) -> Result<(), StoreError> {
        match self {
            Self::Memory(s) => s.set_destination(guild_id, channel_id).await,
            Self::Embedded(s) => s.set_destination(guild_id, channel_id).await,
            Self::Relational(s) => s.set_destination(guild_id, channel_id).await,
        }
    }

    async fn remove_destination(&self, guild_id: &str) -> Result<(), StoreError> {
        match self {
            Self::Memory(s) => s.remove_destination(guild_id).await,
            Self::Embedded(s) => s.remove_destination(guild_id).await,
            Self::Relational(s) => s.remove_destination(guild_id).await,
        }
    }

    async fn list_destinations(&self) -> Result<DestinationMap, StoreError> {
        match self {
            Self::Memory(s) => s.list_destinations().await,
            Self::Embedded(s) => s.list_destinations().await,
            Self::Relational(s) => s.list_destinations().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_open_memory() {
        let store = open_store(&StoreConfig::Memory).await.unwrap();
        assert_eq!(store.backend(), "memory");
        crate::contract::last_writer_wins(&store).await;
    }

    #[tokio::test]
    async fn test_open_embedded() {
        let dir = tempdir().unwrap();
        let config = StoreConfig::Embedded {
            path: dir.path().join("kirb.db"),
        };
        let store = open_store(&config).await.unwrap();
        assert_eq!(store.backend(), "embedded");
        crate::contract::remove_absent_is_noop(&store).await;
    }

    #[tokio::test]
    async fn test_open_relational_sqlite() {
        let config = StoreConfig::Relational {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        };
        let store = open_store(&config).await.unwrap();
        assert_eq!(store.backend(), "relational");
        crate::contract::snapshot_is_detached(&store).await;
    }

    #[tokio::test]
    async fn test_open_relational_bad_url_fails() {
        let config = StoreConfig::Relational {
            url: "sqlite:///nonexistent-dir/definitely/missing.db".to_string(),
            max_connections: 1,
        };
        let err = open_store(&config).await.unwrap_err();
        assert!(matches!(err, StoreError::Open { .. }));
    }
}
