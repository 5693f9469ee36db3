//! A [`KvStore`] backed by Redis, the shared store this system leans on for per-key
//! linearizability.
use async_trait::async_trait;
use redis::{
    aio::ConnectionManager,
    AsyncCommands as _,
};
use std::collections::HashMap;

use super::{
    KvStore,
    StoreError,
};

/// Wraps a [`ConnectionManager`], which transparently reconnects and pipelines
/// requests, so callers never have to reason about a dropped connection themselves.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connects to `redis_url` (e.g. `redis://127.0.0.1:6379`).
    ///
    /// # Errors
    /// Returns an error if the client cannot be constructed or the initial connection
    /// fails.
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url).map_err(backend)?;
        let conn = client.get_connection_manager().await.map_err(backend)?;
        Ok(Self {
            conn,
        })
    }
}

fn backend(err: redis::RedisError) -> StoreError {
    StoreError::Backend(Box::new(err))
}

#[async_trait]
impl KvStore for RedisStore {
    async fn hset(&self, key: &str, field: &str, value: Vec<u8>) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        conn.hset::<_, _, _, ()>(key, field, value)
            .await
            .map_err(backend)
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let mut conn = self.conn.clone();
        conn.hget(key, field).await.map_err(backend)
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, Vec<u8>>, StoreError> {
        let mut conn = self.conn.clone();
        conn.hgetall(key).await.map_err(backend)
    }

    async fn scan_match(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.conn.clone();
        let mut iter: redis::AsyncIter<'_, String> = conn
            .scan_match(pattern)
            .await
            .map_err(backend)?;
        let mut keys = Vec::new();
        while let Some(key) = futures::StreamExt::next(&mut iter).await {
            keys.push(key);
        }
        Ok(keys)
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let mut conn = self.conn.clone();
        conn.get(key).await.map_err(backend)
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(key, value).await.map_err(backend)
    }

    async fn publish(&self, channel: &str, payload: Vec<u8>) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        conn.publish::<_, _, ()>(channel, payload)
            .await
            .map_err(backend)
    }
}
