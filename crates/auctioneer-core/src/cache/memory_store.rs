//! An in-process [`KvStore`] test double, used by the test suites of every module built
//! on the cache facade instead of spinning up Redis.
//!
//! Backed by [`papaya`], a lock-free concurrent hash map, so that tests exercising
//! concurrent upserts observe the same per-key serialization the real
//! store gives without needing a mutex around the whole table.
use async_trait::async_trait;
use papaya::HashMap as ConcurrentMap;
use std::{
    collections::HashMap,
    sync::Mutex,
};

use super::{
    KvStore,
    StoreError,
};

#[derive(Default)]
pub struct InMemoryStore {
    hashes: ConcurrentMap<String, ConcurrentMap<String, Vec<u8>>>,
    scalars: ConcurrentMap<String, Vec<u8>>,
    published: Mutex<Vec<(String, Vec<u8>)>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every `(channel, payload)` pair published so far, in publish order.
    /// Used by tests to assert that `NewBid` is only published after a successful
    /// store write.
    #[must_use]
    pub fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.published.lock().expect("mutex poisoned").clone()
    }
}

#[async_trait]
impl KvStore for InMemoryStore {
    async fn hset(&self, key: &str, field: &str, value: Vec<u8>) -> Result<(), StoreError> {
        let guard = self.hashes.guard();
        let inner = self
            .hashes
            .get_or_insert_with(key.to_owned(), ConcurrentMap::new, &guard);
        inner.pin().insert(field.to_owned(), value);
        Ok(())
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let guard = self.hashes.guard();
        Ok(self
            .hashes
            .get(key, &guard)
            .and_then(|inner| inner.pin().get(field).cloned()))
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, Vec<u8>>, StoreError> {
        let guard = self.hashes.guard();
        Ok(self.hashes.get(key, &guard).map_or_else(HashMap::new, |inner| {
            inner
                .pin()
                .iter()
                .map(|(field, value)| (field.clone(), value.clone()))
                .collect()
        }))
    }

    async fn scan_match(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let prefix = pattern.trim_end_matches('*');
        let guard = self.hashes.guard();
        Ok(self
            .hashes
            .keys(&guard)
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let guard = self.scalars.guard();
        Ok(self.scalars.get(key, &guard).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        self.scalars.pin().insert(key.to_owned(), value);
        Ok(())
    }

    async fn publish(&self, channel: &str, payload: Vec<u8>) -> Result<(), StoreError> {
        self.published
            .lock()
            .expect("mutex poisoned")
            .push((channel.to_owned(), payload));
        Ok(())
    }
}
