//! The fee sufficiency checker (C5): decides whether a transfer's paid relayer fee
//! covers an estimated minimum before the executor ever tries to dispatch it.
use std::{
    collections::{
        HashMap,
        HashSet,
    },
    sync::Arc,
};

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

/// The subset of a transfer's fields the fee check reasons about. Everything else about
/// a transfer (amount, recipient, ...) is out of this checker's concern.
pub struct Transfer {
    pub origin: DomainId,
    pub destination: DomainId,
    /// The address that initiated the transfer on the origin domain, used against the
    /// per-origin exemption list.
    pub origin_sender: RouterAddress,
    /// The asset the transfer itself is denominated in.
    pub transacting_asset: AssetId,
    /// Fee amounts the caller paid, keyed by the asset they paid in.
    pub relayer_fees: HashMap<AssetId, Amount>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeCheck {
    pub can_submit: bool,
    pub needed: u128,
}

#[derive(Debug, thiserror::Error)]
pub enum FeeError {
    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// Per-origin-domain set of addresses exempt from the fee check, matched
/// case-insensitively.
pub struct ExemptList {
    by_origin: HashMap<DomainId, HashSet<String>>,
}

impl ExemptList {
    #[must_use]
    pub fn new(by_origin: HashMap<DomainId, HashSet<RouterAddress>>) -> Self {
        Self {
            by_origin: by_origin
                .into_iter()
                .map(|(domain, addresses)| {
                    (
                        domain,
                        addresses
                            .into_iter()
                            .map(|address| address.to_string().to_lowercase())
                            .collect(),
                    )
                })
                .collect(),
        }
    }

    fn contains(&self, origin: &DomainId, address: RouterAddress) -> bool {
        self.by_origin
            .get(origin)
            .is_some_and(|set| set.contains(&address.to_string().to_lowercase()))
    }
}

/// `relayerFeeTolerance`: the integer percent shortfall tolerated against the estimated
/// fee.
#[derive(Debug, Clone, Copy)]
pub struct ToleranceConfig {
    pub tolerance_percent: u8,
}

pub struct FeeChecker<C> {
    chain: Arc<C>,
    exempt: ExemptList,
    tolerance: ToleranceConfig,
}

impl<C: ChainReader> FeeChecker<C> {
    pub fn new(chain: Arc<C>, exempt: ExemptList, tolerance: ToleranceConfig) -> Self {
        Self {
            chain,
            exempt,
            tolerance,
        }
    }

    /// Walks the exemption check, estimated-fee lookup, per-asset USD conversion, and
    /// tolerance-adjusted comparison in order.
    pub async fn can_submit_to_relayer(&self, transfer: &Transfer) -> Result<FeeCheck, FeeError> {
        if self.exempt.contains(&transfer.origin, transfer.origin_sender) {
            return Ok(FeeCheck {
                can_submit: true,
                needed: 0,
            });
        }

        if transfer.relayer_fees.is_empty() {
            return Ok(FeeCheck {
                can_submit: false,
                needed: 0,
            });
        }

        let estimated = self
            .chain
            .calculate_relayer_fee(&transfer.origin, &transfer.destination)
            .await?;

        let mut paid_usd: u128 = 0;
        for (asset, paid_amount) in &transfer.relayer_fees {
            let contribution = if *asset == NATIVE_ASSET {
                let native_price = self.chain.get_conversion_rate(&transfer.origin, *asset).await?;
                scaled_mul(*paid_amount, native_price)
            } else if *asset == transfer.transacting_asset {
                let native_price = self.chain.get_conversion_rate(&transfer.origin, NATIVE_ASSET).await?;
                let asset_price = self.chain.get_conversion_rate(&transfer.origin, *asset).await?;
                if asset_price.0 == 0 {
                    0
                } else {
                    scaled_mul(*paid_amount, native_price) * ScaledPrice::SCALE / asset_price.0
                }
            } else {
                0
            };
            paid_usd = paid_usd.saturating_add(contribution);
        }

        let tolerance = u128::from(self.tolerance.tolerance_percent.min(100));
        let minimum_needed = estimated.0.saturating_mul(100 - tolerance) / 100;

        // paid_usd is plain USD (scaled_mul already divides out the price's ×1000
        // scale); minimum_needed keeps it, since estimated is never divided. Rescale
        // paid_usd by the same factor before comparing so both sides line up.
        let paid_usd_scaled = paid_usd.saturating_mul(ScaledPrice::SCALE);

        Ok(FeeCheck {
            can_submit: paid_usd_scaled >= minimum_needed,
            needed: minimum_needed,
        })
    }
}

/// Multiplies a token `amount` by a 1000-scaled USD price using integer arithmetic
/// throughout: never convert the balance to a float, only the price is pre-scaled.
fn scaled_mul(amount: Amount, price: ScaledPrice) -> u128 {
    let amount: u128 = amount.try_into().unwrap_or(u128::MAX);
    amount.saturating_mul(price.0) / ScaledPrice::SCALE
}
