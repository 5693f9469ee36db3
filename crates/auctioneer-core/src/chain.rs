//! The external read interface the executor and the fee checker depend on:
//! authoritative router balances from the chain/indexer, and pricing/gas helpers used to
//! estimate a minimum relayer fee. Both collaborators share one contract here since the
//! core only ever calls them for reads, never writes.
use async_trait::async_trait;

use crate::types::{
    Amount,
    AssetId,
    DomainId,
    RouterAddress,
};

/// A price or rate scaled by 1000: multiplications by
/// floating-point USD prices must be performed by scaling the price and integer-dividing,
/// never by converting token balances to floating point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ScaledPrice(pub u128);

impl ScaledPrice {
    pub const SCALE: u128 = 1000;

    #[must_use]
    pub fn from_float(price: f64) -> Self {
        Self((price * Self::SCALE as f64).round() as u128)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("router `{router}` not found on domain `{domain}` for asset `{asset}`")]
    RouterNotFound {
        router: RouterAddress,
        domain: DomainId,
        asset: AssetId,
    },
    #[error("external chain/indexer read failed")]
    Upstream(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

/// Read-only access to on-chain/indexed state: router liquidity (used by the executor on
/// a cache miss) and pricing/gas data (used by the fee checker).
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// The authoritative balance a router has committed on `domain` for `asset`.
    async fn get_asset_balance(
        &self,
        domain: &DomainId,
        router: RouterAddress,
        asset: AssetId,
    ) -> Result<Amount, ChainError>;

    async fn get_gas_price(&self, domain: &DomainId) -> Result<Amount, ChainError>;

    async fn get_conversion_rate(
        &self,
        chain_id: &DomainId,
        asset: AssetId,
    ) -> Result<ScaledPrice, ChainError>;

    async fn get_decimals_for_asset(
        &self,
        asset: AssetId,
        chain_id: &DomainId,
    ) -> Result<u8, ChainError>;

    /// An estimated minimum relayer fee in USD for moving a transfer from `origin` to
    /// `destination`.
    async fn calculate_relayer_fee(
        &self,
        origin: &DomainId,
        destination: &DomainId,
    ) -> Result<ScaledPrice, ChainError>;
}
