//! In-process state store backend.
//!
//! Backs tests and single-node deployments. Every operation locks one shared
//! map, which makes each primitive atomic exactly the way the Redis backend
//! is. Collections that become empty are removed, matching Redis semantics
//! where an empty list or set does not exist.

use crate::error::StoreError;
use crate::store::StateStore;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;

/// One stored value.
#[derive(Debug, Clone)]
enum Entry {
    Text(String),
    List(VecDeque<String>),
    Set(HashSet<String>),
    Hash(HashMap<String, String>),
}

impl Entry {
    fn type_matches(&self, other: &Entry) -> bool {
        matches!(
            (self, other),
            (Entry::Text(_), Entry::Text(_))
                | (Entry::List(_), Entry::List(_))
                | (Entry::Set(_), Entry::Set(_))
                | (Entry::Hash(_), Entry::Hash(_))
        )
    }
}

/// In-memory [`StateStore`] backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
    /// Wakes blocked list pops when any list grows.
    list_grew: Notify,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn wrong_type(key: &str) -> StoreError {
        StoreError::WrongType {
            key: key.to_string(),
        }
    }

    /// Runs `f` against the set stored at `key`, inserting an empty set first
    /// if the key is absent. Removes the key again if the set ends up empty.
    fn with_set<T>(
        &self,
        key: &str,
        f: impl FnOnce(&mut HashSet<String>) -> T,
    ) -> Result<T, StoreError> {
        let mut entries = self.entries.lock().expect("store lock poisoned");
        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::Set(HashSet::new()));
        let Entry::Set(set) = entry else {
            return Err(Self::wrong_type(key));
        };
        let result = f(set);
        if set.is_empty() {
            entries.remove(key);
        }
        Ok(result)
    }

    fn with_list<T>(
        &self,
        key: &str,
        f: impl FnOnce(&mut VecDeque<String>) -> T,
    ) -> Result<T, StoreError> {
        let mut entries = self.entries.lock().expect("store lock poisoned");
        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::List(VecDeque::new()));
        let Entry::List(list) = entry else {
            return Err(Self::wrong_type(key));
        };
        let result = f(list);
        if list.is_empty() {
            entries.remove(key);
        }
        Ok(result)
    }

    fn with_hash<T>(
        &self,
        key: &str,
        f: impl FnOnce(&mut HashMap<String, String>) -> T,
    ) -> Result<T, StoreError> {
        let mut entries = self.entries.lock().expect("store lock poisoned");
        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::Hash(HashMap::new()));
        let Entry::Hash(hash) = entry else {
            return Err(Self::wrong_type(key));
        };
        let result = f(hash);
        if hash.is_empty() {
            entries.remove(key);
        }
        Ok(result)
    }

    /// Read-only peek that does not create the key.
    fn read<T: Default>(
        &self,
        key: &str,
        expect: &Entry,
        f: impl FnOnce(&Entry) -> T,
    ) -> Result<T, StoreError> {
        let entries = self.entries.lock().expect("store lock poisoned");
        match entries.get(key) {
            Some(entry) if entry.type_matches(expect) => Ok(f(entry)),
            Some(_) => Err(Self::wrong_type(key)),
            None => Ok(T::default()),
        }
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn set_add(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        self.with_set(key, |set| set.insert(member.to_string()))
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        self.with_set(key, |set| set.remove(member))
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, StoreError> {
        self.read(key, &Entry::Set(HashSet::new()), |entry| match entry {
            Entry::Set(set) => set.iter().cloned().collect(),
            _ => Vec::new(),
        })
    }

    async fn set_size(&self, key: &str) -> Result<usize, StoreError> {
        self.read(key, &Entry::Set(HashSet::new()), |entry| match entry {
            Entry::Set(set) => set.len(),
            _ => 0,
        })
    }

    async fn set_contains(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        self.read(key, &Entry::Set(HashSet::new()), |entry| match entry {
            Entry::Set(set) => set.contains(member),
            _ => false,
        })
    }

    async fn push_back(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.with_list(key, |list| list.push_back(value.to_string()))?;
        self.list_grew.notify_waiters();
        Ok(())
    }

    async fn pop_front(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.with_list(key, VecDeque::pop_front)
    }

    async fn blocking_pop_front(
        &self,
        key: &str,
        timeout: Duration,
    ) -> Result<Option<String>, StoreError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            // Register interest before checking, so a push between the check
            // and the wait still wakes us.
            let notified = self.list_grew.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(value) = self.with_list(key, VecDeque::pop_front)? {
                return Ok(Some(value));
            }

            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            if tokio::time::timeout(remaining, notified).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn list_range(&self, key: &str) -> Result<Vec<String>, StoreError> {
        self.read(key, &Entry::List(VecDeque::new()), |entry| match entry {
            Entry::List(list) => list.iter().cloned().collect(),
            _ => Vec::new(),
        })
    }

    async fn list_remove(&self, key: &str, value: &str) -> Result<bool, StoreError> {
        self.with_list(key, |list| {
            match list.iter().position(|v| v == value) {
                Some(index) => {
                    list.remove(index);
                    true
                }
                None => false,
            }
        })
    }

    async fn list_len(&self, key: &str) -> Result<usize, StoreError> {
        self.read(key, &Entry::List(VecDeque::new()), |entry| match entry {
            Entry::List(list) => list.len(),
            _ => 0,
        })
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError> {
        self.with_hash(key, |hash| {
            hash.insert(field.to_string(), value.to_string());
        })
    }

    async fn hash_set_many(
        &self,
        key: &str,
        entries: &[(&str, String)],
    ) -> Result<(), StoreError> {
        self.with_hash(key, |hash| {
            for (field, value) in entries {
                hash.insert((*field).to_string(), value.clone());
            }
        })
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        self.read(key, &Entry::Hash(HashMap::new()), |entry| match entry {
            Entry::Hash(hash) => hash.get(field).cloned(),
            _ => None,
        })
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, StoreError> {
        self.read(key, &Entry::Hash(HashMap::new()), |entry| match entry {
            Entry::Hash(hash) => hash.clone(),
            _ => HashMap::new(),
        })
    }

    async fn hash_delete(&self, key: &str, field: &str) -> Result<(), StoreError> {
        self.with_hash(key, |hash| {
            hash.remove(field);
        })
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().expect("store lock poisoned");
        entries.insert(key.to_string(), Entry::Text(value.to_string()));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().expect("store lock poisoned");
        match entries.get(key) {
            Some(Entry::Text(value)) => Ok(Some(value.clone())),
            Some(_) => Err(Self::wrong_type(key)),
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut entries = self.entries.lock().expect("store lock poisoned");
        Ok(entries.remove(key).is_some())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let entries = self.entries.lock().expect("store lock poisoned");
        Ok(entries.contains_key(key))
    }
}
