//! A concrete [`ChainReader`] for the in-scope half of the external read interface
//! authoritative router balances and gas price, read directly off the
//! destination chain via an RPC provider.
//!
//! Pricing and gas-estimation helpers are explicitly out of scope for this core
//! "Out of scope: pricing and gas-estimation helpers (pure functions from external
//! market feeds)"); this type delegates those three methods to a caller-supplied
//! [`PriceOracle`] rather than reimplementing them.
use std::{
    sync::Arc,
    time::Duration,
};

use alloy_primitives::Address;
use alloy_provider::{
    Provider,
    ProviderBuilder,
    RootProvider,
};
use async_trait::async_trait;
use tracing::warn;

use crate::{
    chain::{
        ChainError,
        ChainReader,
        ScaledPrice,
    },
    types::{
        Amount,
        AssetId,
        DomainId,
        RouterAddress,
        NATIVE_ASSET,
    },
};

/// The out-of-scope pricing/gas-estimation collaborator. A production
/// deployment wires this to whatever market-data service it uses; nothing in this crate
/// assumes a particular one.
#[async_trait]
pub trait PriceOracle: Send + Sync {
    async fn get_conversion_rate(
        &self,
        chain_id: &DomainId,
        asset: AssetId,
    ) -> Result<ScaledPrice, ChainError>;

    async fn get_decimals_for_asset(&self, asset: AssetId, chain_id: &DomainId) -> Result<u8, ChainError>;

    async fn calculate_relayer_fee(
        &self,
        origin: &DomainId,
        destination: &DomainId,
    ) -> Result<ScaledPrice, ChainError>;
}

/// Reads router balances and gas price directly off an RPC endpoint; one instance
/// covers a single destination domain.
pub struct RpcChainReader<P> {
    provider: RootProvider,
    price_oracle: Arc<P>,
}

impl<P> RpcChainReader<P> {
    /// # Errors
    /// Returns an error if `rpc_url` cannot be parsed into a transport.
    pub fn connect(rpc_url: &str, price_oracle: Arc<P>) -> Result<Self, ChainError> {
        let url = rpc_url.parse().map_err(|error| ChainError::Upstream(Box::new(error)))?;
        let provider = ProviderBuilder::new().on_http(url);
        Ok(Self {
            provider,
            price_oracle,
        })
    }
}

#[async_trait]
impl<P: PriceOracle + Send + Sync> ChainReader for RpcChainReader<P> {
    async fn get_asset_balance(
        &self,
        domain: &DomainId,
        router: RouterAddress,
        asset: AssetId,
    ) -> Result<Amount, ChainError> {
        if asset == NATIVE_ASSET {
            retrying_rpc_call(|| self.provider.get_balance(router)).await
        } else {
            erc20_balance_of(&self.provider, asset, router)
                .await
                .ok_or(ChainError::RouterNotFound {
                    router,
                    domain: domain.clone(),
                    asset,
                })
        }
    }

    async fn get_gas_price(&self, _domain: &DomainId) -> Result<Amount, ChainError> {
        let price = retrying_rpc_call(|| self.provider.get_gas_price()).await?;
        Ok(Amount::from(price))
    }

    async fn get_conversion_rate(
        &self,
        chain_id: &DomainId,
        asset: AssetId,
    ) -> Result<ScaledPrice, ChainError> {
        self.price_oracle.get_conversion_rate(chain_id, asset).await
    }

    async fn get_decimals_for_asset(&self, asset: AssetId, chain_id: &DomainId) -> Result<u8, ChainError> {
        self.price_oracle.get_decimals_for_asset(asset, chain_id).await
    }

    async fn calculate_relayer_fee(
        &self,
        origin: &DomainId,
        destination: &DomainId,
    ) -> Result<ScaledPrice, ChainError> {
        self.price_oracle.calculate_relayer_fee(origin, destination).await
    }
}

/// A placeholder [`PriceOracle`] that returns fixed, configured prices.
///
/// Pricing is explicitly out of scope for this core; this exists so the binary has
/// something to boot with locally. Production deployments should supply a real market-
/// data-backed [`PriceOracle`] instead.
pub struct StubPriceOracle {
    pub conversion_rate: ScaledPrice,
    pub decimals: u8,
    pub relayer_fee: ScaledPrice,
}

#[async_trait]
impl PriceOracle for StubPriceOracle {
    async fn get_conversion_rate(&self, _chain_id: &DomainId, _asset: AssetId) -> Result<ScaledPrice, ChainError> {
        Ok(self.conversion_rate)
    }

    async fn get_decimals_for_asset(&self, _asset: AssetId, _chain_id: &DomainId) -> Result<u8, ChainError> {
        Ok(self.decimals)
    }

    async fn calculate_relayer_fee(
        &self,
        _origin: &DomainId,
        _destination: &DomainId,
    ) -> Result<ScaledPrice, ChainError> {
        Ok(self.relayer_fee)
    }
}

/// Minimal ERC-20 `balanceOf(address)` call, encoded by hand since this crate has no
/// generated contract bindings (those are explicitly out of scope, "all blockchain
/// transaction encoding").
async fn erc20_balance_of(provider: &RootProvider, asset: Address, owner: Address) -> Option<Amount> {
    use alloy_rpc_types_eth::TransactionRequest;

    let mut call_data = vec![0x70, 0xa0, 0x82, 0x31]; // balanceOf(address)
    call_data.extend_from_slice(&[0u8; 12]);
    call_data.extend_from_slice(owner.as_slice());

    let request = TransactionRequest::default().to(asset).input(call_data.into());
    let result = retrying_rpc_call(|| provider.call(&request)).await.ok()?;
    Amount::try_from_be_slice(&result)
}

/// Retries a single RPC call with exponential backoff. Router-liquidity reads happen on
/// every executor tick for every candidate, so a transient RPC hiccup should not
/// immediately fall through to "router not found".
async fn retrying_rpc_call<T, E, F, Fut>(call: F) -> Result<T, ChainError>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    let retry_cfg = tryhard::RetryFutureConfig::new(3)
        .exponential_backoff(Duration::from_millis(100))
        .max_delay(Duration::from_secs(2))
        .on_retry(|attempt: u32, next_delay: Option<Duration>, error: &E| {
            let wait_duration = next_delay.map(humantime::format_duration).map(tracing::field::display);
            warn!(attempt, wait_duration, error = error as &dyn std::error::Error, "rpc call failed; retrying");
            futures::future::ready(())
        });

    tryhard::retry_fn(call)
        .with_config(retry_cfg)
        .await
        .map_err(|error| ChainError::Upstream(Box::new(error)))
}
