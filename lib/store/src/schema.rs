//! Boot-time schema initialization.
//!
//! Ensures the long-lived registration sets exist before the scheduler and
//! HTTP surface start reading them. Sets cannot be empty in the store, so an
//! absent key is created by adding and immediately removing a sentinel
//! member; existing data is never touched.

use crate::error::StoreError;
use crate::keys;
use crate::store::StateStore;

/// Sentinel member used to materialize an empty set.
const INIT_SENTINEL: &str = "__init__";

/// Initializes the store schema. Safe to call on every boot.
pub async fn initialize(store: &dyn StateStore) -> Result<(), StoreError> {
    ensure_set(store, keys::USERS).await?;
    ensure_set(store, keys::ACTIVE_USERS).await?;
    tracing::info!("store schema initialized");
    Ok(())
}

async fn ensure_set(store: &dyn StateStore, key: &str) -> Result<(), StoreError> {
    if store.exists(key).await? {
        return Ok(());
    }
    store.set_add(key, INIT_SENTINEL).await?;
    store.set_remove(key, INIT_SENTINEL).await?;
    tracing::debug!(key, "initialized set");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    #[tokio::test]
    async fn initialize_leaves_no_sentinel() {
        let store = MemoryStore::new();
        initialize(&store).await.unwrap();

        assert!(!store.set_contains(keys::USERS, INIT_SENTINEL).await.unwrap());
        assert_eq!(store.set_size(keys::USERS).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn initialize_preserves_existing_members() {
        let store = MemoryStore::new();
        store.set_add(keys::USERS, "u1").await.unwrap();

        initialize(&store).await.unwrap();

        assert!(store.set_contains(keys::USERS, "u1").await.unwrap());
    }
}
