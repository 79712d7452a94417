//! EmbeddedStore - redb key-value file
//!
//! Layout: one table `kirb-posting`, key = guild id, value = channel id.

use std::path::Path;
use std::sync::Arc;

use contracts::{DestinationMap, DestinationStore, StoreError};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use tracing::{debug, info, instrument};

const BACKEND: &str = "embedded";

const DESTINATIONS: TableDefinition<'static, &'static str, &'static str> =
    TableDefinition::new("kirb-posting");

/// Destination store backed by an embedded redb file
#[derive(Debug, Clone)]
pub struct EmbeddedStore {
    db: Arc<Database>,
}

impl EmbeddedStore {
    /// Open (or create) the database file and ensure the table exists
    ///
    /// # Errors
    /// Parent directory or database file cannot be created
    #[instrument(name = "embedded_store_open", skip(path), fields(path = %path.display()))]
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::open(BACKEND, e))?;
        }

        let db = Database::create(path).map_err(|e| StoreError::open(BACKEND, e))?;
        let store = Self::with_database(Arc::new(db))?;
        info!(path = %path.display(), "embedded store opened");
        Ok(store)
    }

    /// Wrap an already open database
    pub fn with_database(db: Arc<Database>) -> Result<Self, StoreError> {
        let write_txn = db.begin_write().map_err(|e| StoreError::open(BACKEND, e))?;
        write_txn
            .open_table(DESTINATIONS)
            .map_err(|e| StoreError::open(BACKEND, e))?;
        write_txn.commit().map_err(|e| StoreError::open(BACKEND, e))?;

        Ok(Self { db })
    }

    fn put(db: &Database, guild_id: &str, channel_id: &str) -> Result<(), StoreError> {
        let write_txn = db.begin_write().map_err(|e| StoreError::write(BACKEND, e))?;
        {
            let mut table = write_txn
                .open_table(DESTINATIONS)
                .map_err(|e| StoreError::write(BACKEND, e))?;
            table
                .insert(guild_id, channel_id)
                .map_err(|e| StoreError::write(BACKEND, e))?;
        }
        write_txn.commit().map_err(|e| StoreError::write(BACKEND, e))
    }

    fn delete(db: &Database, guild_id: &str) -> Result<bool, StoreError> {
        let write_txn = db.begin_write().map_err(|e| StoreError::write(BACKEND, e))?;
        let existed = {
            let mut table = write_txn
                .open_table(DESTINATIONS)
                .map_err(|e| StoreError::write(BACKEND, e))?;
            let removed = table
                .remove(guild_id)
                .map_err(|e| StoreError::write(BACKEND, e))?;
            removed.is_some()
        };
        write_txn.commit().map_err(|e| StoreError::write(BACKEND, e))?;
        Ok(existed)
    }

    fn scan(db: &Database) -> Result<DestinationMap, StoreError> {
        let read_txn = db.begin_read().map_err(|e| StoreError::read(BACKEND, e))?;
        let table = read_txn
            .open_table(DESTINATIONS)
            .map_err(|e| StoreError::read(BACKEND, e))?;

        let mut channels = DestinationMap::new();
        for entry in table.iter().map_err(|e| StoreError::read(BACKEND, e))? {
            let (guild, channel) = entry.map_err(|e| StoreError::read(BACKEND, e))?;
            channels.insert(guild.value().to_string(), channel.value().to_string());
        }
        Ok(channels)
    }
}

impl DestinationStore for EmbeddedStore {
    fn backend(&self) -> &str {
        BACKEND
    }

    #[instrument(name = "embedded_store_set", skip(self))]
    async fn set_destination(&self, guild_id: &str, channel_id: &str) -> Result<(), StoreError> {
        let db = Arc::clone(&self.db);
        let (guild, channel) = (guild_id.to_string(), channel_id.to_string());
        tokio::task::spawn_blocking(move || Self::put(&db, &guild, &channel))
            .await
            .map_err(|e| StoreError::write(BACKEND, e))??;
        debug!(guild = %guild_id, channel = %channel_id, "destination set");
        Ok(())
    }

    #[instrument(name = "embedded_store_remove", skip(self))]
    async fn remove_destination(&self, guild_id: &str) -> Result<(), StoreError> {
        let db = Arc::clone(&self.db);
        let guild = guild_id.to_string();
        let existed = tokio::task::spawn_blocking(move || Self::delete(&db, &guild))
            .await
            .map_err(|e| StoreError::write(BACKEND, e))??;
        if existed {
            debug!(guild = %guild_id, "destination removed");
        }
        Ok(())
    }

    async fn list_destinations(&self) -> Result<DestinationMap, StoreError> {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || Self::scan(&db))
            .await
            .map_err(|e| StoreError::read(BACKEND, e))?
    }
}
