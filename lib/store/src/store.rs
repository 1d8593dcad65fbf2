//! The [`StateStore`] trait: the primitive operations every backend offers.
//!
//! All operations are atomic with respect to a single key. Contents are
//! strings; structured payloads are encoded before storage. The one blocking
//! primitive is [`StateStore::blocking_pop_front`], which the scheduler uses
//! on the global pending queue so it does not busy-loop; everything else is
//! non-blocking and polled with short sleeps by its consumers.

use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Shared handle to a state store backend.
pub type SharedStore = Arc<dyn StateStore>;

/// Primitive key/value operations shared by all backends.
#[async_trait]
pub trait StateStore: Send + Sync {
    // --- sets ---

    /// Adds a member to a set. Returns true if the member was newly added.
    async fn set_add(&self, key: &str, member: &str) -> Result<bool, StoreError>;

    /// Removes a member from a set. Returns true if the member was present.
    async fn set_remove(&self, key: &str, member: &str) -> Result<bool, StoreError>;

    /// Returns all members of a set (unordered).
    async fn set_members(&self, key: &str) -> Result<Vec<String>, StoreError>;

    /// Returns the cardinality of a set.
    async fn set_size(&self, key: &str) -> Result<usize, StoreError>;

    /// Returns true if the member is in the set.
    async fn set_contains(&self, key: &str, member: &str) -> Result<bool, StoreError>;

    // --- lists ---

    /// Appends a value to the tail of a list.
    async fn push_back(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Pops the head of a list, or None if the list is empty.
    async fn pop_front(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Pops the head of a list, waiting up to `timeout` for a value to arrive.
    async fn blocking_pop_front(
        &self,
        key: &str,
        timeout: Duration,
    ) -> Result<Option<String>, StoreError>;

    /// Returns the full contents of a list, head first.
    async fn list_range(&self, key: &str) -> Result<Vec<String>, StoreError>;

    /// Removes the first occurrence of a value from a list.
    /// Returns true if a value was removed.
    async fn list_remove(&self, key: &str, value: &str) -> Result<bool, StoreError>;

    /// Returns the length of a list.
    async fn list_len(&self, key: &str) -> Result<usize, StoreError>;

    // --- hashes ---

    /// Sets one field of a hash.
    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError>;

    /// Sets many fields of a hash at once.
    async fn hash_set_many(
        &self,
        key: &str,
        entries: &[(&str, String)],
    ) -> Result<(), StoreError>;

    /// Reads one field of a hash.
    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, StoreError>;

    /// Reads all fields of a hash. An absent key reads as an empty map.
    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, StoreError>;

    /// Deletes one field from a hash.
    async fn hash_delete(&self, key: &str, field: &str) -> Result<(), StoreError>;

    // --- plain keys ---

    /// Sets a plain string key.
    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Reads a plain string key.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Deletes a key of any type. Returns true if the key existed.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Returns true if the key exists (any type).
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;
}
