//! Bid selection strategy: modeled as a swappable interface so the current
//! uniform-random policy can be replaced by a fee-sorted one without touching the
//! executor loop.
use std::sync::Arc;

use rand::seq::SliceRandom as _;

use crate::bid::Bid;

/// Orders a set of round-1-eligible bids into the sequence the executor tries
/// candidates in. The executor stops at the first candidate with sufficient liquidity,
/// so the order returned here is the selection itself.
pub trait BidSelectionStrategy: Send + Sync {
    fn order(&self, bids: Vec<Arc<Bid>>) -> Vec<Arc<Bid>>;
}

/// The current contract: selection order is uniform over eligible bids.
#[derive(Default)]
pub struct UniformRandom;

impl BidSelectionStrategy for UniformRandom {
    fn order(&self, mut bids: Vec<Arc<Bid>>) -> Vec<Arc<Bid>> {
        bids.shuffle(&mut rand::thread_rng());
        bids
    }
}

/// A future policy anticipated by the design but not the current contract:
/// highest-fee-first. Defined so the swap is a one-line change, not wired into the
/// executor by default.
#[derive(Default)]
pub struct FeeSorted;

impl BidSelectionStrategy for FeeSorted {
    fn order(&self, mut bids: Vec<Arc<Bid>>) -> Vec<Arc<Bid>> {
        bids.sort_by(|a, b| b.fee.cmp(&a.fee));
        bids
    }
}
