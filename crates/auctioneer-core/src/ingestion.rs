//! Bid ingestion (C4): validates an inbound bid, attaches it to the transfer's auction
//! record, seeds bid-data once, and opens the transfer for the executor.
use std::sync::Arc;

use tracing::instrument;

use crate::{
    bid::{
        Bid,
        BidData,
    },
    cache::{
        auction::{
            AuctionCache,
            AuctionStatus,
            CacheError,
        },
        keys,
        KvStore,
    },
    types::{
        DomainId,
        TransferId,
    },
    Metrics,
};

#[derive(Debug, thiserror::Error)]
pub enum IngestionError {
    /// Caller error: the bid envelope failed schema validation. Fail fast, do not retry.
    #[error("invalid bid: {reason}")]
    InvalidParams { reason: String },
    /// Caller error: the auction has already been dispatched or executed.
    #[error("auction for this transfer has already been dispatched or executed")]
    AuctionExpired,
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Schema-validates a bid. The core's contract only requires a router
/// address and, to be useful to the executor at all, at least one signature.
fn validate(bid: &Bid) -> Result<(), IngestionError> {
    if bid.signatures.is_empty() {
        return Err(IngestionError::InvalidParams {
            reason: "bid carries no round signatures".to_owned(),
        });
    }
    Ok(())
}

pub struct BidIngestion {
    auctions: AuctionCache,
    store: Arc<dyn KvStore>,
    metrics: &'static Metrics,
}

impl BidIngestion {
    #[must_use]
    pub fn new(auctions: AuctionCache, store: Arc<dyn KvStore>, metrics: &'static Metrics) -> Self {
        Self {
            auctions,
            store,
            metrics,
        }
    }

    /// Validates, merges the bid into the auction record, seeds bid data on first
    /// acceptance, marks the transfer `Queued`, and publishes to the `NewBid` channel.
    #[instrument(skip_all, fields(%transfer_id), err)]
    pub async fn store_bid(
        &self,
        transfer_id: TransferId,
        origin: DomainId,
        destination: DomainId,
        bid: Bid,
        bid_data: BidData,
    ) -> Result<(), IngestionError> {
        validate(&bid)?;

        let status = self.auctions.get_status(transfer_id).await?;
        if !matches!(status, AuctionStatus::None | AuctionStatus::Queued) {
            self.metrics.increment_transfers_expired();
            return Err(IngestionError::AuctionExpired);
        }

        let raw_bid = serde_json::to_vec(&bid).map_err(CacheError::from)?;

        self.auctions
            .upsert_auction(transfer_id, origin, destination, bid)
            .await?;

        if matches!(status, AuctionStatus::None) {
            self.auctions.set_bid_data(transfer_id, &bid_data).await?;
        }

        self.auctions
            .set_status(transfer_id, AuctionStatus::Queued)
            .await?;

        self.store
            .publish(keys::NEW_BID_CHANNEL, raw_bid)
            .await
            .map_err(CacheError::from)?;

        self.metrics.increment_transfers_ingested();
        Ok(())
    }
}
