//! Typed accessors over a single shared key/value store (C1).
//!
//! Every higher component goes through [`KvStore`]; nothing above this module touches a
//! store client directly. The store is assumed to serialize individual per-key
//! operations (hash-field set/get, scalar get/set) but gives no multi-key transactions —
//! components built on top design around that, not around this facade.
pub mod auction;
pub mod liquidity;
pub mod memory_store;
pub mod redis_store;

use async_trait::async_trait;
use std::collections::HashMap;

pub use auction::AuctionCache;
pub use liquidity::LiquidityCache;
pub use memory_store::InMemoryStore;
pub use redis_store::RedisStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("key/value store operation failed")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

/// The minimal hash-table + pub/sub surface every cache table in this crate is built on.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Sets a single field of a hash stored at `key`.
    async fn hset(&self, key: &str, field: &str, value: Vec<u8>) -> Result<(), StoreError>;

    /// Gets a single field of a hash stored at `key`.
    async fn hget(&self, key: &str, field: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Gets every field of a hash stored at `key`.
    async fn hgetall(&self, key: &str) -> Result<HashMap<String, Vec<u8>>, StoreError>;

    /// Returns the keys matching a glob-style `pattern`, used to enumerate a transfer's
    /// legacy per-bid records (`bids:<transferId>:*`).
    async fn scan_match(&self, pattern: &str) -> Result<Vec<String>, StoreError>;

    /// Gets a scalar value.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Overwrites a scalar value.
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError>;

    /// Publishes `payload` on `channel`. Subscribers are out of scope for this crate;
    /// the core only commits to publishing after a successful store write.
    async fn publish(&self, channel: &str, payload: Vec<u8>) -> Result<(), StoreError>;
}

/// Namespaced hash and scalar key names used by the tables in [`auction`] and
/// [`liquidity`].
pub(crate) mod keys {
    pub const AUCTION: &str = "auctions:auction";
    pub const STATUS: &str = "auctions:status";
    pub const BID_DATA: &str = "auctions:bidData";
    pub const TASK: &str = "auctions:task";
    pub const NEW_BID_CHANNEL: &str = "NewBid";

    pub fn liquidity_key(router: &str, domain: &str, asset: &str) -> String {
        format!("routers:liquidity:{router}:{domain}:{asset}")
    }

    pub fn legacy_bid_scan_pattern(transfer_id: &str) -> String {
        format!("bids:{transfer_id}:*")
    }
}
