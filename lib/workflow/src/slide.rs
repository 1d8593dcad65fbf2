//! Slide metadata registry.
//!
//! Slides are external whole-slide images consumed by slide-initialization
//! templates. The engine only tracks their metadata; the bytes live in blob
//! storage owned by the upload surface.

use fairway_store::{SharedStore, StoreError, keys};
use serde::Serialize;
use std::collections::HashMap;

/// Metadata for one registered slide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlideRecord {
    pub slide_id: String,
    pub user_id: String,
    pub slide_path: String,
    pub size_bytes: u64,
}

impl SlideRecord {
    fn from_fields(fields: &HashMap<String, String>) -> Option<Self> {
        if fields.is_empty() {
            return None;
        }
        let text = |field: &str| fields.get(field).cloned().unwrap_or_default();
        Some(Self {
            slide_id: text("slide_id"),
            user_id: text("user_id"),
            slide_path: text("slide_path"),
            size_bytes: fields
                .get("size_bytes")
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
        })
    }
}

/// Manages slide metadata in the store.
#[derive(Clone)]
pub struct SlideManager {
    store: SharedStore,
}

impl SlideManager {
    /// Creates a manager over the shared store.
    #[must_use]
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Registers slide metadata and tracks it under its owner.
    ///
    /// # Errors
    ///
    /// Returns an error if a store operation fails.
    pub async fn register(&self, record: &SlideRecord) -> Result<(), StoreError> {
        self.store
            .hash_set_many(
                &keys::slide(&record.slide_id),
                &[
                    ("slide_id", record.slide_id.clone()),
                    ("user_id", record.user_id.clone()),
                    ("slide_path", record.slide_path.clone()),
                    ("size_bytes", record.size_bytes.to_string()),
                ],
            )
            .await?;
        self.store
            .set_add(&keys::user_slides(&record.user_id), &record.slide_id)
            .await?;

        tracing::info!(slide_id = %record.slide_id, user_id = %record.user_id, "registered slide");
        Ok(())
    }

    /// Fetches slide metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if a store operation fails.
    pub async fn get(&self, slide_id: &str) -> Result<Option<SlideRecord>, StoreError> {
        let fields = self.store.hash_get_all(&keys::slide(slide_id)).await?;
        Ok(SlideRecord::from_fields(&fields))
    }

    /// Lists the slides registered by one user.
    ///
    /// # Errors
    ///
    /// Returns an error if a store operation fails.
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<SlideRecord>, StoreError> {
        let mut records = Vec::new();
        for slide_id in self.store.set_members(&keys::user_slides(user_id)).await? {
            if let Some(record) = self.get(&slide_id).await? {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Deletes slide metadata. Returns false if the slide was unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if a store operation fails.
    pub async fn delete(&self, slide_id: &str) -> Result<bool, StoreError> {
        let Some(record) = self.get(slide_id).await? else {
            return Ok(false);
        };
        self.store.delete(&keys::slide(slide_id)).await?;
        self.store
            .set_remove(&keys::user_slides(&record.user_id), slide_id)
            .await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fairway_store::MemoryStore;
    use std::sync::Arc;

    fn manager() -> SlideManager {
        SlideManager::new(Arc::new(MemoryStore::new()))
    }

    fn record(slide_id: &str, user_id: &str) -> SlideRecord {
        SlideRecord {
            slide_id: slide_id.to_string(),
            user_id: user_id.to_string(),
            slide_path: format!("/data/slides/{slide_id}.svs"),
            size_bytes: 1_048_576,
        }
    }

    #[tokio::test]
    async fn register_then_get_roundtrip() {
        let slides = manager();
        let original = record("s1", "u1");

        slides.register(&original).await.unwrap();

        let fetched = slides.get("s1").await.unwrap().expect("present");
        assert_eq!(fetched, original);
    }

    #[tokio::test]
    async fn list_for_user_scopes_by_owner() {
        let slides = manager();
        slides.register(&record("s1", "u1")).await.unwrap();
        slides.register(&record("s2", "u1")).await.unwrap();
        slides.register(&record("s3", "u2")).await.unwrap();

        let mut owned = slides.list_for_user("u1").await.unwrap();
        owned.sort_by(|a, b| a.slide_id.cmp(&b.slide_id));
        let ids: Vec<&str> = owned.iter().map(|s| s.slide_id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "s2"]);
    }

    #[tokio::test]
    async fn delete_removes_owner_tracking() {
        let slides = manager();
        slides.register(&record("s1", "u1")).await.unwrap();

        assert!(slides.delete("s1").await.unwrap());
        assert!(slides.get("s1").await.unwrap().is_none());
        assert!(slides.list_for_user("u1").await.unwrap().is_empty());

        assert!(!slides.delete("s1").await.unwrap());
    }
}
