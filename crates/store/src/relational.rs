//! RelationalStore - `kirby_channels` table
//!
//! Uses the sqlx `Any` driver so the same queries run on Postgres in
//! production and SQLite for local runs and tests.

use std::time::Duration;

use contracts::{DestinationMap, DestinationStore, StoreError};
use sqlx::any::{install_default_drivers, AnyPoolOptions};
use sqlx::AnyPool;
use tracing::{debug, info, instrument};

const BACKEND: &str = "relational";

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS kirby_channels (\
     guild_id TEXT PRIMARY KEY, \
     channel_id TEXT NOT NULL)";

const UPSERT: &str = "INSERT INTO kirby_channels (guild_id, channel_id) VALUES ($1, $2) \
     ON CONFLICT (guild_id) DO UPDATE SET channel_id = EXCLUDED.channel_id";

const DELETE: &str = "DELETE FROM kirby_channels WHERE guild_id = $1";

const SELECT_ALL: &str = "SELECT guild_id, channel_id FROM kirby_channels";

/// Destination store backed by a relational table
#[derive(Debug, Clone)]
pub struct RelationalStore {
    pool: AnyPool,
}

impl RelationalStore {
    /// Connect, then create `kirby_channels` if it does not exist
    ///
    /// # Errors
    /// Connection or schema creation failure
    #[instrument(name = "relational_store_connect", skip(url))]
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        install_default_drivers();

        let pool = AnyPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(url)
            .await
            .map_err(|e| StoreError::open(BACKEND, e))?;

        let store = Self::with_pool(pool).await?;
        info!(max_connections, "relational store connected");
        Ok(store)
    }

    /// Wrap an existing pool, ensuring the schema
    pub async fn with_pool(pool: AnyPool) -> Result<Self, StoreError> {
        sqlx::query(CREATE_TABLE)
            .execute(&pool)
            .await
            .map_err(|e| StoreError::open(BACKEND, e))?;
        Ok(Self { pool })
    }

    /// Close every pooled connection
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl DestinationStore for RelationalStore {
    fn backend(&self) -> &str {
        BACKEND
    }

    #[instrument(name = "relational_store_set", skip(self))]
    async fn set_destination(&self, guild_id: &str, channel_id: &str) -> Result<(), StoreError> {
        sqlx::query(UPSERT)
            .bind(guild_id)
            .bind(channel_id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::write(BACKEND, e))?;
        debug!(guild = %guild_id, channel = %channel_id, "destination set");
        Ok(())
    }

    #[instrument(name = "relational_store_remove", skip(self))]
    async fn remove_destination(&self, guild_id: &str) -> Result<(), StoreError> {
        let result = sqlx::query(DELETE)
            .bind(guild_id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::write(BACKEND, e))?;
        if result.rows_affected() > 0 {
            debug!(guild = %guild_id, "destination removed");
        }
        Ok(())
    }

    async fn list_destinations(&self) -> Result<DestinationMap, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::read(BACKEND, e))?;

        let rows: Vec<(String, String)> = sqlx::query_as(SELECT_ALL)
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| StoreError::read(BACKEND, e))?;

        tx.commit()
            .await
            .map_err(|e| StoreError::read(BACKEND, e))?;

        Ok(rows.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract;

    // A single connection keeps one in-memory database alive for the pool
    async fn memory_store() -> RelationalStore {
        RelationalStore::connect("sqlite::memory:", 1).await.unwrap()
    }

    #[tokio::test]
    async fn test_relational_contract() {
        contract::empty_store(&memory_store().await).await;
        contract::last_writer_wins(&memory_store().await).await;
        contract::remove_absent_is_noop(&memory_store().await).await;
        contract::snapshot_is_detached(&memory_store().await).await;
    }

    #[tokio::test]
    async fn test_schema_creation_is_idempotent() {
        let store = memory_store().await;
        store.set_destination("G1", "C1").await.unwrap();

        let again = RelationalStore::with_pool(store.pool.clone()).await.unwrap();
        assert_eq!(again.list_destinations().await.unwrap()["G1"], "C1");
    }

    #[tokio::test]
    async fn test_closed_pool_surfaces_store_error() {
        let store = memory_store().await;
        store.close().await;

        let err = store.set_destination("G1", "C1").await.unwrap_err();
        assert!(matches!(err, StoreError::Write { .. }));
        let err = store.list_destinations().await.unwrap_err();
        assert!(matches!(err, StoreError::Read { .. }));
    }
}
