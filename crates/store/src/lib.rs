//! # Store
//!
//! Destination store backends.
//!
//! Responsibilities:
//! - In-memory map guarded by a reader/writer lock
//! - Embedded key-value file (redb, table `kirb-posting`)
//! - Relational table `kirby_channels` (Postgres, or SQLite for local runs)
//! - Select exactly one backend at startup from `StoreConfig`
//!
//! All backends implement `contracts::DestinationStore` and share the same
//! external contract.

mod backend;
mod embedded;
mod memory;
mod relational;

pub use backend::{open_store, ConfigStore};
pub use contracts::{DestinationMap, DestinationStore, StoreConfig, StoreError};
pub use embedded::EmbeddedStore;
pub use memory::MemoryStore;
pub use relational::RelationalStore;

/// Contract checks run against every backend
#[cfg(test)]
pub(crate) mod contract {
    use contracts::{DestinationMap, DestinationStore};

    /// Net effect of a set/remove sequence, last writer wins per guild
    pub async fn last_writer_wins<S: DestinationStore + Sync>(store: &S) {
        store.set_destination("G1", "C1").await.unwrap();
        store.set_destination("G2", "C9").await.unwrap();
        store.set_destination("G1", "C2").await.unwrap();
        store.remove_destination("G2").await.unwrap();
        store.set_destination("G3", "C3").await.unwrap();
        store.set_destination("G3", "C3").await.unwrap();

        let mut expected = DestinationMap::new();
        expected.insert("G1".to_string(), "C2".to_string());
        expected.insert("G3".to_string(), "C3".to_string());
        assert_eq!(store.list_destinations().await.unwrap(), expected);
    }

    /// Removing an absent guild succeeds and changes nothing
    pub async fn remove_absent_is_noop<S: DestinationStore + Sync>(store: &S) {
        store.set_destination("G1", "C1").await.unwrap();
        store.remove_destination("missing").await.unwrap();

        let snapshot = store.list_destinations().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.get("G1").map(String::as_str), Some("C1"));
    }

    /// Mutating a snapshot never leaks back into the store
    pub async fn snapshot_is_detached<S: DestinationStore + Sync>(store: &S) {
        store.set_destination("G1", "C1").await.unwrap();

        let mut snapshot = store.list_destinations().await.unwrap();
        snapshot.insert("G1".to_string(), "hijacked".to_string());
        snapshot.insert("G2".to_string(), "C2".to_string());

        let fresh = store.list_destinations().await.unwrap();
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh.get("G1").map(String::as_str), Some("C1"));
    }

    /// Empty store lists nothing
    pub async fn empty_store<S: DestinationStore + Sync>(store: &S) {
        assert!(store.list_destinations().await.unwrap().is_empty());
    }
}
