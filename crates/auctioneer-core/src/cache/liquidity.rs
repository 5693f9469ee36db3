//! The router-liquidity cache (C3): a per (router, domain, asset) optimistic view of a
//! router's balance, maintained by the executor's local decrement on successful dispatch
//! and refreshed from the external indexer on a miss.
use std::sync::Arc;

use super::{
    keys,
    CacheError,
    KvStore,
};
use crate::types::{
    Amount,
    AssetId,
    DomainId,
    RouterAddress,
};

#[derive(Clone)]
pub struct LiquidityCache {
    store: Arc<dyn KvStore>,
}

impl LiquidityCache {
    #[must_use]
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
        }
    }

    /// Returns the cached amount, or `None` on a cache miss — the caller refreshes from
    /// the external indexer and repopulates via [`Self::set_liquidity`].
    pub async fn get_liquidity(
        &self,
        router: RouterAddress,
        domain: &DomainId,
        asset: AssetId,
    ) -> Result<Option<Amount>, CacheError> {
        let raw = self.store.get(&key(router, domain, asset)).await?;
        Ok(raw.and_then(|bytes| std::str::from_utf8(&bytes).ok()?.parse().ok()))
    }

    /// Overwrites the cached amount unconditionally. No expiry is mandated.
    pub async fn set_liquidity(
        &self,
        router: RouterAddress,
        domain: &DomainId,
        asset: AssetId,
        amount: Amount,
    ) -> Result<(), CacheError> {
        self.store
            .set(&key(router, domain, asset), amount.to_string().into_bytes())
            .await?;
        Ok(())
    }
}

fn key(router: RouterAddress, domain: &DomainId, asset: AssetId) -> String {
    keys::liquidity_key(&router.to_string(), domain.as_str(), &asset.to_string())
}
