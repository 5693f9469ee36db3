//! The bid model the auction core reasons about.
//!
//! A [`Bid`] is opaque to the core beyond the fields it needs to run an auction: who bid,
//! how much, and which rounds it carries a signature for. Everything else a router may
//! have attached to its bid envelope is the ingress handler's concern, not this crate's.
use std::collections::BTreeMap;

use serde::{
    Deserialize,
    Serialize,
};
use serde_json::Value;

use crate::types::{
    AssetId,
    Amount,
    RouterAddress,
};

/// The round-1 signature predicate key. This is the only round this core selects on;
/// higher rounds are reserved for a future multi-round policy.
pub const ROUND_ONE: &str = "1";

/// A signed claim by a router that it can fulfill a transfer for a declared fee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bid {
    pub router: RouterAddress,
    pub fee: Amount,
    /// Round number (as a string key, matching the wire format) to signature bytes.
    pub signatures: BTreeMap<String, Vec<u8>>,
}

impl Bid {
    /// Whether this bid carries a signature for round 1, the only round this core acts
    /// on.
    #[must_use]
    pub fn is_round_one_eligible(&self) -> bool {
        self.signatures.contains_key(ROUND_ONE)
    }

    /// The round-1 signature, if present. Used to augment the dispatch payload handed to
    /// the relayer.
    #[must_use]
    pub fn round_one_signature(&self) -> Option<&[u8]> {
        self.signatures.get(ROUND_ONE).map(Vec::as_slice)
    }
}

/// The payload needed to actually submit a transfer, written once per transfer at first
/// bid acceptance and immutable thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BidData {
    pub amount: Amount,
    pub asset: AssetId,
    /// Destination-domain-specific parameters the relayer needs. Left as an opaque JSON
    /// value: the core never interprets these beyond forwarding them to the relayer.
    pub destination_params: Value,
}
