//! The auction executor (C6): a periodic tick that scans queued transfers, groups them
//! by destination domain, and within each domain sequentially selects a bid, checks
//! liquidity, and dispatches to a relayer.
pub mod selection;

use std::{
    collections::HashMap,
    sync::Arc,
    time::Duration,
};

use futures::stream::{
    FuturesUnordered,
    StreamExt as _,
};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{
    debug,
    info,
    instrument,
    warn,
};

use self::selection::BidSelectionStrategy;
use crate::{
    bid::Bid,
    cache::{
        auction::{
            Auction,
            AuctionCache,
            AuctionStatus,
        },
        liquidity::LiquidityCache,
    },
    chain::ChainReader,
    relayer::{
        dispatch_with_backup,
        RelayerConfig,
    },
    types::{
        now_unix_seconds,
        DomainId,
        TransferId,
    },
    Metrics,
};

/// `auctionWaitTime`: minimum elapsed age before an auction is eligible for dispatch.
#[derive(Debug, Clone, Copy)]
pub struct ExecutorConfig {
    pub auction_wait_time: Duration,
    pub tick_interval: Duration,
}

pub struct Executor<C> {
    auctions: AuctionCache,
    liquidity: LiquidityCache,
    chain: Arc<C>,
    relayers: Vec<RelayerConfig>,
    selection: Box<dyn BidSelectionStrategy>,
    config: ExecutorConfig,
    metrics: &'static Metrics,
    cancellation_token: CancellationToken,
}

impl<C: ChainReader + 'static> Executor<C> {
    #[must_use]
    pub fn new(
        auctions: AuctionCache,
        liquidity: LiquidityCache,
        chain: Arc<C>,
        relayers: Vec<RelayerConfig>,
        selection: Box<dyn BidSelectionStrategy>,
        config: ExecutorConfig,
        metrics: &'static Metrics,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            auctions,
            liquidity,
            chain,
            relayers,
            selection,
            config,
            metrics,
            cancellation_token,
        }
    }

    /// Runs ticks on `tick_interval` until cancelled.
    pub async fn run(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.config.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = self.cancellation_token.cancelled() => {
                    info!("executor received shutdown signal");
                    return;
                }
                _ = interval.tick() => {
                    self.clone().tick().await;
                }
            }
        }
    }

    /// One full pass over the queued-transfer table.
    #[instrument(skip_all)]
    async fn tick(self: Arc<Self>) {
        let queued = match self.auctions.get_queued_transfers().await {
            Ok(queued) => queued,
            Err(error) => {
                warn!(error = &error as &dyn std::error::Error, "failed to scan queued transfers");
                return;
            }
        };

        let mut by_domain: HashMap<DomainId, Vec<TransferId>> = HashMap::new();
        for transfer_id in queued {
            let auction = match self.auctions.get_auction(transfer_id).await {
                Ok(Some(auction)) => auction,
                Ok(None) => continue,
                Err(error) => {
                    warn!(%transfer_id, error = &error as &dyn std::error::Error, "failed to read auction");
                    continue;
                }
            };
            let elapsed = now_unix_seconds().saturating_sub(auction.timestamp);
            if Duration::from_secs(elapsed) <= self.config.auction_wait_time {
                continue;
            }
            by_domain.entry(auction.destination.clone()).or_default().push(transfer_id);
        }

        let mut domain_tasks = FuturesUnordered::new();
        for (domain, transfers) in by_domain {
            let this = self.clone();
            domain_tasks.push(async move { this.process_domain(domain, transfers).await });
        }
        while domain_tasks.next().await.is_some() {}
    }

    /// Processes every queued transfer targeting one destination domain, strictly
    /// sequentially, so the liquidity read-then-decrement in [`Self::process_transfer`]
    /// cannot race within a domain.
    async fn process_domain(self: Arc<Self>, domain: DomainId, transfers: Vec<TransferId>) {
        debug!(%domain, count = transfers.len(), "processing domain");
        for transfer_id in transfers {
            self.process_transfer(transfer_id).await;
        }
    }

    #[instrument(skip_all, fields(%transfer_id))]
    async fn process_transfer(&self, transfer_id: TransferId) {
        let bid_data = match self.auctions.get_bid_data(transfer_id).await {
            Ok(Some(bid_data)) => bid_data,
            Ok(None) => {
                self.metrics.increment_bid_data_missing();
                warn!("auction exists but bid data is missing; invariant violation, skipping");
                return;
            }
            Err(error) => {
                warn!(error = &error as &dyn std::error::Error, "failed to read bid data");
                return;
            }
        };

        let auction = match self.auctions.get_auction(transfer_id).await {
            Ok(Some(auction)) => auction,
            _ => return,
        };

        let eligible: Vec<Arc<Bid>> = auction
            .bids
            .values()
            .filter(|bid| bid.is_round_one_eligible())
            .cloned()
            .map(Arc::new)
            .collect();
        if eligible.is_empty() {
            debug!("no round-1-eligible bids, skipping");
            return;
        }

        let candidates = self.selection.order(eligible);

        for candidate in candidates {
            let Some(available) = self
                .sufficient_liquidity(&candidate, &auction, &bid_data)
                .await
            else {
                continue;
            };

            let mut payload = bid_data.destination_params.clone();
            if let (Some(object), Some(signature)) =
                (payload.as_object_mut(), candidate.round_one_signature())
            {
                object.insert(
                    "relayerSignature".to_owned(),
                    serde_json::Value::String(hex::encode(signature)),
                );
            }

            match dispatch_with_backup(
                &self.relayers,
                auction.destination.as_str(),
                &auction.destination,
                &candidate.router.to_string(),
                &payload,
            )
            .await
            {
                Ok(task_id) => {
                    if let Err(error) = self
                        .liquidity
                        .set_liquidity(
                            candidate.router,
                            &auction.destination,
                            bid_data.asset,
                            available.saturating_sub(bid_data.amount),
                        )
                        .await
                    {
                        warn!(error = &error as &dyn std::error::Error, "failed to write back decremented liquidity");
                    }

                    if let Err(error) = self.auctions.set_status(transfer_id, AuctionStatus::Sent).await {
                        warn!(error = &error as &dyn std::error::Error, "failed to set status to Sent");
                    }
                    if let Err(error) = self.auctions.upsert_task(transfer_id, task_id).await {
                        warn!(error = &error as &dyn std::error::Error, "failed to record dispatch task");
                    }
                    self.metrics.increment_transfers_dispatched();
                    return;
                }
                Err(failed) => {
                    self.metrics.increment_relayer_send_failures();
                    warn!(attempted = ?failed.attempted, "all relayers rejected candidate; trying next bid");
                }
            }
        }

        debug!("no candidate succeeded this tick; transfer remains queued");
    }

    /// Reads cached liquidity for `candidate`, refreshing from the chain reader on a
    /// miss, and returns the available amount if it covers what this transfer needs.
    /// `None` means the candidate must be skipped.
    async fn sufficient_liquidity(
        &self,
        candidate: &Bid,
        auction: &Auction,
        bid_data: &crate::bid::BidData,
    ) -> Option<crate::types::Amount> {
        let cached = match self
            .liquidity
            .get_liquidity(candidate.router, &auction.destination, bid_data.asset)
            .await
        {
            Ok(amount) => amount,
            Err(error) => {
                warn!(error = &error as &dyn std::error::Error, "liquidity cache read failed");
                None
            }
        };

        let amount = match cached {
            Some(amount) => amount,
            None => match self
                .chain
                .get_asset_balance(&auction.destination, candidate.router, bid_data.asset)
                .await
            {
                Ok(amount) => {
                    if let Err(error) = self
                        .liquidity
                        .set_liquidity(candidate.router, &auction.destination, bid_data.asset, amount)
                        .await
                    {
                        warn!(error = &error as &dyn std::error::Error, "failed to populate liquidity cache");
                    }
                    amount
                }
                Err(error) => {
                    warn!(
                        router = %candidate.router,
                        error = &error as &dyn std::error::Error,
                        "router not found in indexer; skipping candidate"
                    );
                    return None;
                }
            },
        };

        (amount >= bid_data.amount).then_some(amount)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use alloy_primitives::{
        address,
        U256,
    };
    use async_trait::async_trait;
    use auctioneer_telemetry::metrics::{
        Metrics as _,
        RegisteringBuilder,
    };

    use super::*;
    use crate::{
        bid::BidData,
        cache::memory_store::InMemoryStore,
        chain::ScaledPrice,
        relayer::{
            Relayer,
            RelayerError,
        },
        types::{
            Amount,
            NATIVE_ASSET,
        },
    };

    fn test_metrics() -> &'static Metrics {
        Box::leak(Box::new(
            Metrics::register(&mut RegisteringBuilder::new(), &()).unwrap(),
        ))
    }

    struct FixedBalanceChain {
        balance: Amount,
    }

    #[async_trait]
    impl ChainReader for FixedBalanceChain {
        async fn get_asset_balance(
            &self,
            _domain: &DomainId,
            _router: crate::types::RouterAddress,
            _asset: crate::types::AssetId,
        ) -> Result<Amount, crate::chain::ChainError> {
            Ok(self.balance)
        }

        async fn get_gas_price(&self, _domain: &DomainId) -> Result<Amount, crate::chain::ChainError> {
            Ok(Amount::ZERO)
        }

        async fn get_conversion_rate(
            &self,
            _chain_id: &DomainId,
            _asset: crate::types::AssetId,
        ) -> Result<ScaledPrice, crate::chain::ChainError> {
            Ok(ScaledPrice(ScaledPrice::SCALE))
        }

        async fn get_decimals_for_asset(
            &self,
            _asset: crate::types::AssetId,
            _chain_id: &DomainId,
        ) -> Result<u8, crate::chain::ChainError> {
            Ok(18)
        }

        async fn calculate_relayer_fee(
            &self,
            _origin: &DomainId,
            _destination: &DomainId,
        ) -> Result<ScaledPrice, crate::chain::ChainError> {
            Ok(ScaledPrice(0))
        }
    }

    struct AlwaysAccepts;

    #[async_trait]
    impl Relayer for AlwaysAccepts {
        async fn send(
            &self,
            _chain_id: &str,
            _domain: &DomainId,
            _dest_address: &str,
            _data: &serde_json::Value,
        ) -> Result<crate::types::TaskId, RelayerError> {
            Ok(crate::types::TaskId::new("task-1"))
        }
    }

    struct AlwaysRejects;

    #[async_trait]
    impl Relayer for AlwaysRejects {
        async fn send(
            &self,
            _chain_id: &str,
            _domain: &DomainId,
            _dest_address: &str,
            _data: &serde_json::Value,
        ) -> Result<crate::types::TaskId, RelayerError> {
            Err(RelayerError::Rejected("no".into()))
        }
    }

    fn relayer_config(instance: Arc<dyn Relayer>) -> RelayerConfig {
        RelayerConfig {
            instance,
            api_key: "unused".to_owned(),
            relayer_type: "test".to_owned(),
        }
    }

    fn router() -> crate::types::RouterAddress {
        address!("5555555555555555555555555555555555555555")
    }

    async fn seed_queued_transfer(
        auctions: &AuctionCache,
        transfer_id: TransferId,
        router: crate::types::RouterAddress,
        amount: Amount,
    ) {
        let mut signatures = BTreeMap::new();
        signatures.insert("1".to_owned(), vec![1, 2, 3]);
        let bid = Bid {
            router,
            fee: U256::from(10u64),
            signatures,
        };
        auctions
            .upsert_auction(transfer_id, "eth".into(), "osmo".into(), bid)
            .await
            .unwrap();
        auctions
            .set_bid_data(
                transfer_id,
                &BidData {
                    amount,
                    asset: NATIVE_ASSET,
                    destination_params: serde_json::json!({}),
                },
            )
            .await
            .unwrap();
        auctions.set_status(transfer_id, AuctionStatus::Queued).await.unwrap();
    }

    fn executor(
        auctions: AuctionCache,
        liquidity: LiquidityCache,
        chain: Arc<FixedBalanceChain>,
        relayers: Vec<RelayerConfig>,
    ) -> Executor<FixedBalanceChain> {
        Executor::new(
            auctions,
            liquidity,
            chain,
            relayers,
            Box::new(selection::UniformRandom),
            ExecutorConfig {
                auction_wait_time: Duration::ZERO,
                tick_interval: Duration::from_secs(1),
            },
            test_metrics(),
            CancellationToken::new(),
        )
    }

    #[tokio::test]
    async fn sufficient_liquidity_and_accepting_relayer_dispatches_and_decrements() {
        let store = Arc::new(InMemoryStore::new());
        let auctions = AuctionCache::new(store.clone());
        let liquidity = LiquidityCache::new(store);
        let transfer_id = alloy_primitives::b256!(
            "0000000000000000000000000000000000000000000000000000000000000020"
        );
        seed_queued_transfer(&auctions, transfer_id, router(), U256::from(100u64)).await;

        let chain = Arc::new(FixedBalanceChain { balance: U256::from(100u64) });
        let exec = executor(
            auctions.clone(),
            liquidity.clone(),
            chain,
            vec![relayer_config(Arc::new(AlwaysAccepts))],
        );

        exec.process_transfer(transfer_id).await;

        assert_eq!(
            auctions.get_status(transfer_id).await.unwrap(),
            AuctionStatus::Sent
        );
        let remaining = liquidity
            .get_liquidity(router(), &"osmo".into(), NATIVE_ASSET)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(remaining, U256::ZERO);
    }

    #[tokio::test]
    async fn insufficient_liquidity_leaves_transfer_queued() {
        let store = Arc::new(InMemoryStore::new());
        let auctions = AuctionCache::new(store.clone());
        let liquidity = LiquidityCache::new(store);
        let transfer_id = alloy_primitives::b256!(
            "0000000000000000000000000000000000000000000000000000000000000021"
        );
        seed_queued_transfer(&auctions, transfer_id, router(), U256::from(100u64)).await;

        let chain = Arc::new(FixedBalanceChain { balance: U256::from(1u64) });
        let exec = executor(
            auctions.clone(),
            liquidity,
            chain,
            vec![relayer_config(Arc::new(AlwaysAccepts))],
        );

        exec.process_transfer(transfer_id).await;

        assert_eq!(
            auctions.get_status(transfer_id).await.unwrap(),
            AuctionStatus::Queued
        );
    }

    #[tokio::test]
    async fn all_relayers_rejecting_leaves_transfer_queued() {
        let store = Arc::new(InMemoryStore::new());
        let auctions = AuctionCache::new(store.clone());
        let liquidity = LiquidityCache::new(store);
        let transfer_id = alloy_primitives::b256!(
            "0000000000000000000000000000000000000000000000000000000000000022"
        );
        seed_queued_transfer(&auctions, transfer_id, router(), U256::from(100u64)).await;

        let chain = Arc::new(FixedBalanceChain { balance: U256::from(100u64) });
        let exec = executor(
            auctions.clone(),
            liquidity,
            chain,
            vec![relayer_config(Arc::new(AlwaysRejects))],
        );

        exec.process_transfer(transfer_id).await;

        assert_eq!(
            auctions.get_status(transfer_id).await.unwrap(),
            AuctionStatus::Queued
        );
    }

    #[tokio::test]
    async fn primary_relayer_failure_falls_back_to_second() {
        let store = Arc::new(InMemoryStore::new());
        let auctions = AuctionCache::new(store.clone());
        let liquidity = LiquidityCache::new(store);
        let transfer_id = alloy_primitives::b256!(
            "0000000000000000000000000000000000000000000000000000000000000023"
        );
        seed_queued_transfer(&auctions, transfer_id, router(), U256::from(100u64)).await;

        let chain = Arc::new(FixedBalanceChain { balance: U256::from(100u64) });
        let exec = executor(
            auctions.clone(),
            liquidity,
            chain,
            vec![
                relayer_config(Arc::new(AlwaysRejects)),
                relayer_config(Arc::new(AlwaysAccepts)),
            ],
        );

        exec.process_transfer(transfer_id).await;

        assert_eq!(
            auctions.get_status(transfer_id).await.unwrap(),
            AuctionStatus::Sent
        );
    }
}
