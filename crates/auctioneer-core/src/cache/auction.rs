//! The auction table (C2): per-transfer [`Auction`], [`AuctionStatus`], [`BidData`] and
//! [`AuctionTask`] records, plus the queued-transfer scan the executor drives off of.
use std::{
    fmt,
    sync::Arc,
};

use indexmap::IndexMap;
use serde::{
    Deserialize,
    Serialize,
};

use super::{
    keys,
    KvStore,
    StoreError,
};
use crate::{
    bid::{
        Bid,
        BidData,
    },
    types::{
        now_unix_seconds,
        DomainId,
        RouterAddress,
        TaskId,
        TransferId,
    },
};

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to (de)serialize a cache record")]
    Serde(#[from] serde_json::Error),
    #[error(
        "upsert for transfer `{transfer_id}` carries origin/destination that does not match the \
         existing auction record (existing: {existing_origin}/{existing_destination}, new: \
         {new_origin}/{new_destination})"
    )]
    MismatchedRoute {
        transfer_id: TransferId,
        existing_origin: DomainId,
        existing_destination: DomainId,
        new_origin: DomainId,
        new_destination: DomainId,
    },
}

/// The per-transfer record collecting bids during the wait window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Auction {
    pub origin: DomainId,
    pub destination: DomainId,
    /// Seconds since epoch at which the first bid for this transfer was accepted.
    /// Immutable after creation.
    pub timestamp: u64,
    pub bids: IndexMap<RouterAddress, Bid>,
}

/// One of `{None, Queued, Sent, Executed, Cancelled}`. `None` is the explicit
/// absence variant so callers never have to special-case an `Option` to detect it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuctionStatus {
    #[default]
    None,
    Queued,
    Sent,
    Executed,
    Cancelled,
}

impl AuctionStatus {
    fn as_wire(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Queued => "Queued",
            Self::Sent => "Sent",
            Self::Executed => "Executed",
            Self::Cancelled => "Cancelled",
        }
    }

    fn from_wire(raw: &str) -> Self {
        match raw {
            "Queued" => Self::Queued,
            "Sent" => Self::Sent,
            "Executed" => Self::Executed,
            "Cancelled" => Self::Cancelled,
            _ => Self::None,
        }
    }
}

impl fmt::Display for AuctionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// `taskId`/`attempts`/`timestamp` of the most recent dispatch for a transfer.
///
/// Presence of a Task implies the Auction is in status `Sent`, never earlier — that
/// invariant is upheld by the executor, not by this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuctionTask {
    pub task_id: TaskId,
    pub attempts: u32,
    pub timestamp: u64,
}

/// Whether a write created a new record or updated an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Created(pub bool);

/// Typed accessor over the `auctions:*` hash tables.
#[derive(Clone)]
pub struct AuctionCache {
    store: Arc<dyn KvStore>,
}

impl AuctionCache {
    #[must_use]
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
        }
    }

    /// Returns the current record, or `None` if no bid has ever been accepted for this
    /// transfer.
    pub async fn get_auction(&self, transfer_id: TransferId) -> Result<Option<Auction>, CacheError> {
        self.read(keys::AUCTION, &field(transfer_id)).await
    }

    /// Creates or merges a bid into a transfer's auction record.
    ///
    /// A router resubmitting overwrites its own prior bid; `timestamp` is preserved once
    /// set. Mismatched `origin`/`destination` on a repeat upsert are rejected
    /// defensively rather than silently tolerated.
    pub async fn upsert_auction(
        &self,
        transfer_id: TransferId,
        origin: DomainId,
        destination: DomainId,
        bid: Bid,
    ) -> Result<Created, CacheError> {
        let existing = self.get_auction(transfer_id).await?;
        let created = existing.is_none();

        let mut auction = existing.unwrap_or_else(|| Auction {
            origin: origin.clone(),
            destination: destination.clone(),
            timestamp: now_unix_seconds(),
            bids: IndexMap::new(),
        });

        if !created && (auction.origin != origin || auction.destination != destination) {
            return Err(CacheError::MismatchedRoute {
                transfer_id,
                existing_origin: auction.origin,
                existing_destination: auction.destination,
                new_origin: origin,
                new_destination: destination,
            });
        }

        auction.bids.insert(bid.router, bid);
        self.write(keys::AUCTION, &field(transfer_id), &auction).await?;
        Ok(Created(created))
    }

    /// Returns `AuctionStatus::None` when absent.
    pub async fn get_status(&self, transfer_id: TransferId) -> Result<AuctionStatus, CacheError> {
        let raw = self
            .store
            .hget(keys::STATUS, &field(transfer_id))
            .await?;
        Ok(raw
            .map(|bytes| AuctionStatus::from_wire(&String::from_utf8_lossy(&bytes)))
            .unwrap_or_default())
    }

    /// Sets the status, returning whether the key previously had no status at all.
    pub async fn set_status(
        &self,
        transfer_id: TransferId,
        status: AuctionStatus,
    ) -> Result<Created, CacheError> {
        let existing = self
            .store
            .hget(keys::STATUS, &field(transfer_id))
            .await?;
        self.store
            .hset(keys::STATUS, &field(transfer_id), status.as_wire().as_bytes().to_vec())
            .await?;
        Ok(Created(existing.is_none()))
    }

    /// A full scan over the status table, filtered to `Queued` entries. No ordering
    /// beyond insertion-scan order is guaranteed.
    pub async fn get_queued_transfers(&self) -> Result<Vec<TransferId>, CacheError> {
        let all = self.store.hgetall(keys::STATUS).await?;
        let mut queued = Vec::new();
        for (field, raw_status) in all {
            if AuctionStatus::from_wire(&String::from_utf8_lossy(&raw_status)) == AuctionStatus::Queued {
                if let Some(transfer_id) = parse_transfer_id(&field) {
                    queued.push(transfer_id);
                }
            }
        }
        Ok(queued)
    }

    pub async fn get_bid_data(&self, transfer_id: TransferId) -> Result<Option<BidData>, CacheError> {
        self.read(keys::BID_DATA, &field(transfer_id)).await
    }

    /// Writes bid data unconditionally. Callers enforce the "only on first acceptance"
    /// rule by checking `get_status` before calling this.
    pub async fn set_bid_data(&self, transfer_id: TransferId, bid_data: &BidData) -> Result<(), CacheError> {
        self.write(keys::BID_DATA, &field(transfer_id), bid_data).await
    }

    pub async fn get_task(&self, transfer_id: TransferId) -> Result<Option<AuctionTask>, CacheError> {
        self.read(keys::TASK, &field(transfer_id)).await
    }

    /// Creates a task on first dispatch, or bumps `attempts` and overwrites `taskId`/
    /// `timestamp` on every subsequent dispatch for the same transfer.
    ///
    /// `attempts` always increments here, even if a prior task was determined to be
    /// terminally failed; this does not reset the counter.
    pub async fn upsert_task(
        &self,
        transfer_id: TransferId,
        task_id: TaskId,
    ) -> Result<Created, CacheError> {
        let existing: Option<AuctionTask> = self.read(keys::TASK, &field(transfer_id)).await?;
        let created = existing.is_none();
        let task = match existing {
            Some(mut task) => {
                task.task_id = task_id;
                task.attempts = task.attempts.saturating_add(1);
                task.timestamp = now_unix_seconds();
                task
            }
            None => AuctionTask {
                task_id,
                attempts: 1,
                timestamp: now_unix_seconds(),
            },
        };
        self.write(keys::TASK, &field(transfer_id), &task).await?;
        Ok(Created(created))
    }

    async fn read<T: for<'de> Deserialize<'de>>(
        &self,
        table: &str,
        field: &str,
    ) -> Result<Option<T>, CacheError> {
        match self.store.hget(table, field).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn write<T: Serialize>(&self, table: &str, field: &str, value: &T) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec(value)?;
        self.store.hset(table, field, bytes).await?;
        Ok(())
    }
}

fn field(transfer_id: TransferId) -> String {
    transfer_id.to_string()
}

fn parse_transfer_id(field: &str) -> Option<TransferId> {
    field.parse().ok()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use alloy_primitives::{
        address,
        b256,
        U256,
    };

    use super::*;
    use crate::cache::memory_store::InMemoryStore;

    fn bid(router: RouterAddress, fee: u64) -> Bid {
        let mut signatures = BTreeMap::new();
        signatures.insert("1".to_owned(), vec![1, 2, 3]);
        Bid {
            router,
            fee: U256::from(fee),
            signatures,
        }
    }

    #[tokio::test]
    async fn first_upsert_creates_auction() {
        let cache = AuctionCache::new(Arc::new(InMemoryStore::new()));
        let transfer_id = b256!("0000000000000000000000000000000000000000000000000000000000000001");
        let router = address!("1111111111111111111111111111111111111111");

        let created = cache
            .upsert_auction(transfer_id, "eth".into(), "osmo".into(), bid(router, 100))
            .await
            .unwrap();
        assert!(created.0);

        let auction = cache.get_auction(transfer_id).await.unwrap().unwrap();
        assert_eq!(auction.bids.len(), 1);
        assert_eq!(auction.origin.as_str(), "eth");
    }

    #[tokio::test]
    async fn bid_merge_keeps_one_entry_per_router() {
        let cache = AuctionCache::new(Arc::new(InMemoryStore::new()));
        let transfer_id = b256!("0000000000000000000000000000000000000000000000000000000000000002");
        let r1 = address!("1111111111111111111111111111111111111111");
        let r2 = address!("2222222222222222222222222222222222222222");

        cache
            .upsert_auction(transfer_id, "eth".into(), "osmo".into(), bid(r1, 100))
            .await
            .unwrap();
        cache
            .upsert_auction(transfer_id, "eth".into(), "osmo".into(), bid(r2, 200))
            .await
            .unwrap();
        // A router resubmitting overwrites its own prior bid, not adds a second entry.
        cache
            .upsert_auction(transfer_id, "eth".into(), "osmo".into(), bid(r1, 150))
            .await
            .unwrap();

        let auction = cache.get_auction(transfer_id).await.unwrap().unwrap();
        assert_eq!(auction.bids.len(), 2);
        assert_eq!(auction.bids.get(&r1).unwrap().fee, U256::from(150));
    }

    #[tokio::test]
    async fn timestamp_is_immutable_after_creation() {
        let cache = AuctionCache::new(Arc::new(InMemoryStore::new()));
        let transfer_id = b256!("0000000000000000000000000000000000000000000000000000000000000003");
        let r1 = address!("1111111111111111111111111111111111111111");
        let r2 = address!("2222222222222222222222222222222222222222");

        cache
            .upsert_auction(transfer_id, "eth".into(), "osmo".into(), bid(r1, 100))
            .await
            .unwrap();
        let first_timestamp = cache.get_auction(transfer_id).await.unwrap().unwrap().timestamp;

        cache
            .upsert_auction(transfer_id, "eth".into(), "osmo".into(), bid(r2, 200))
            .await
            .unwrap();
        let second_timestamp = cache.get_auction(transfer_id).await.unwrap().unwrap().timestamp;

        assert_eq!(first_timestamp, second_timestamp);
    }

    #[tokio::test]
    async fn mismatched_route_on_repeat_upsert_is_rejected() {
        let cache = AuctionCache::new(Arc::new(InMemoryStore::new()));
        let transfer_id = b256!("0000000000000000000000000000000000000000000000000000000000000004");
        let r1 = address!("1111111111111111111111111111111111111111");

        cache
            .upsert_auction(transfer_id, "eth".into(), "osmo".into(), bid(r1, 100))
            .await
            .unwrap();

        let result = cache
            .upsert_auction(transfer_id, "eth".into(), "arbitrum".into(), bid(r1, 100))
            .await;
        assert!(matches!(result, Err(CacheError::MismatchedRoute { .. })));
    }

    #[tokio::test]
    async fn status_defaults_to_none_and_round_trips() {
        let cache = AuctionCache::new(Arc::new(InMemoryStore::new()));
        let transfer_id = b256!("0000000000000000000000000000000000000000000000000000000000000005");

        assert_eq!(cache.get_status(transfer_id).await.unwrap(), AuctionStatus::None);

        let created = cache.set_status(transfer_id, AuctionStatus::Queued).await.unwrap();
        assert!(created.0);
        assert_eq!(cache.get_status(transfer_id).await.unwrap(), AuctionStatus::Queued);

        let created_again = cache.set_status(transfer_id, AuctionStatus::Sent).await.unwrap();
        assert!(!created_again.0);
        assert_eq!(cache.get_status(transfer_id).await.unwrap(), AuctionStatus::Sent);
    }

    #[tokio::test]
    async fn queued_scan_returns_exactly_the_queued_transfers() {
        let cache = AuctionCache::new(Arc::new(InMemoryStore::new()));
        let queued_ids: Vec<TransferId> = (1..=3)
            .map(|i| {
                let mut bytes = [0u8; 32];
                bytes[31] = i;
                TransferId::from(bytes)
            })
            .collect();
        let sent_ids: Vec<TransferId> = (4..=5)
            .map(|i| {
                let mut bytes = [0u8; 32];
                bytes[31] = i;
                TransferId::from(bytes)
            })
            .collect();

        for id in &queued_ids {
            cache.set_status(*id, AuctionStatus::Queued).await.unwrap();
        }
        for id in &sent_ids {
            cache.set_status(*id, AuctionStatus::Sent).await.unwrap();
        }

        let mut observed = cache.get_queued_transfers().await.unwrap();
        observed.sort();
        let mut expected = queued_ids;
        expected.sort();
        assert_eq!(observed, expected);
    }

    #[tokio::test]
    async fn task_attempts_increment_on_each_dispatch() {
        let cache = AuctionCache::new(Arc::new(InMemoryStore::new()));
        let transfer_id = b256!("0000000000000000000000000000000000000000000000000000000000000006");

        let created = cache
            .upsert_task(transfer_id, TaskId::new("t-1"))
            .await
            .unwrap();
        assert!(created.0);
        let task = cache.get_task(transfer_id).await.unwrap().unwrap();
        assert_eq!(task.attempts, 1);
        assert_eq!(task.task_id.as_str(), "t-1");

        let created_again = cache
            .upsert_task(transfer_id, TaskId::new("t-2"))
            .await
            .unwrap();
        assert!(!created_again.0);
        let task = cache.get_task(transfer_id).await.unwrap().unwrap();
        assert_eq!(task.attempts, 2);
        assert_eq!(task.task_id.as_str(), "t-2");
    }
}
