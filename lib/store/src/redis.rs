//! Redis-backed state store.
//!
//! Production backend. A [`ConnectionManager`] multiplexes one reconnecting
//! connection and is cheap to clone, so every worker and the scheduler share
//! this store through one handle; progress writes coming from handler
//! background threads go through the same thread-safe client.

use crate::error::StoreError;
use crate::store::StateStore;
use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::collections::HashMap;
use std::time::Duration;

/// Redis [`StateStore`] backend.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connects to Redis and verifies the connection with a PING.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the server is unreachable.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url).map_err(map_err)?;
        let mut conn = ConnectionManager::new(client).await.map_err(map_err)?;

        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(map_err)?;

        Ok(Self { conn })
    }

    fn conn(&self) -> ConnectionManager {
        self.conn.clone()
    }
}

/// Maps a Redis error onto [`StoreError`]. A WRONGTYPE reply means the caller
/// addressed a key with the wrong primitive; everything else is treated as a
/// transient backend failure.
fn map_err(err: redis::RedisError) -> StoreError {
    let message = err.to_string();
    if message.contains("WRONGTYPE") {
        StoreError::WrongType {
            key: String::new(),
        }
    } else {
        StoreError::Unavailable { message }
    }
}

#[async_trait]
impl StateStore for RedisStore {
    async fn set_add(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn();
        let added: i64 = conn.sadd(key, member).await.map_err(map_err)?;
        Ok(added > 0)
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn();
        let removed: i64 = conn.srem(key, member).await.map_err(map_err)?;
        Ok(removed > 0)
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.conn();
        conn.smembers(key).await.map_err(map_err)
    }

    async fn set_size(&self, key: &str) -> Result<usize, StoreError> {
        let mut conn = self.conn();
        conn.scard(key).await.map_err(map_err)
    }

    async fn set_contains(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn();
        conn.sismember(key, member).await.map_err(map_err)
    }

    async fn push_back(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.conn();
        let _: i64 = conn.rpush(key, value).await.map_err(map_err)?;
        Ok(())
    }

    async fn pop_front(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn();
        conn.lpop(key, None).await.map_err(map_err)
    }

    async fn blocking_pop_front(
        &self,
        key: &str,
        timeout: Duration,
    ) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn();
        let popped: Option<(String, String)> = conn
            .blpop(key, timeout.as_secs_f64())
            .await
            .map_err(map_err)?;
        Ok(popped.map(|(_, value)| value))
    }

    async fn list_range(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.conn();
        conn.lrange(key, 0, -1).await.map_err(map_err)
    }

    async fn list_remove(&self, key: &str, value: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn();
        let removed: i64 = conn.lrem(key, 1, value).await.map_err(map_err)?;
        Ok(removed > 0)
    }

    async fn list_len(&self, key: &str) -> Result<usize, StoreError> {
        let mut conn = self.conn();
        conn.llen(key).await.map_err(map_err)
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.conn();
        let _: i64 = conn.hset(key, field, value).await.map_err(map_err)?;
        Ok(())
    }

    async fn hash_set_many(
        &self,
        key: &str,
        entries: &[(&str, String)],
    ) -> Result<(), StoreError> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn();
        let _: () = conn.hset_multiple(key, entries).await.map_err(map_err)?;
        Ok(())
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn();
        conn.hget(key, field).await.map_err(map_err)
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, StoreError> {
        let mut conn = self.conn();
        conn.hgetall(key).await.map_err(map_err)
    }

    async fn hash_delete(&self, key: &str, field: &str) -> Result<(), StoreError> {
        let mut conn = self.conn();
        let _: i64 = conn.hdel(key, field).await.map_err(map_err)?;
        Ok(())
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.conn();
        let _: () = conn.set(key, value).await.map_err(map_err)?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn();
        conn.get(key).await.map_err(map_err)
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn();
        let deleted: i64 = conn.del(key).await.map_err(map_err)?;
        Ok(deleted > 0)
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn();
        conn.exists(key).await.map_err(map_err)
    }
}
