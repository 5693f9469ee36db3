//! Shared domain primitives used throughout the auction core.
use std::fmt;

use alloy_primitives::{
    Address,
    B256,
    U256,
};
use serde::{
    Deserialize,
    Serialize,
};

/// The primary key of an Auction, a Bid, and everything keyed off them.
///
/// Opaque and collision-free by construction: callers supply it, the core never derives
/// or validates its contents beyond treating it as 32 bytes.
pub type TransferId = B256;

/// A router address, used both as the key into a transfer's bid map and into the
/// liquidity cache.
pub type RouterAddress = Address;

/// An asset identifier. The zero address denotes the origin chain's native asset,
/// matching the convention used throughout the fee sufficiency check.
pub type AssetId = Address;

pub const NATIVE_ASSET: AssetId = Address::ZERO;

/// An opaque logical chain/network identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DomainId(String);

impl DomainId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DomainId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for DomainId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// An opaque identifier returned by a relayer on successful dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An amount of an asset, represented with the full width `U256` gives on-chain balances
/// and fees so that no scaling is lost converting in and out of the cache.
pub type Amount = U256;

/// Returns the current unix time in whole seconds.
///
/// The cache's `timestamp` fields are integer seconds since epoch; callers needing
/// sub-second precision (none currently do) should not use this.
pub fn now_unix_seconds() -> u64 {
    jiff::Timestamp::now()
        .as_second()
        .try_into()
        .unwrap_or(0)
}
