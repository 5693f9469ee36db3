//! The sequencer auction core of a cross-domain bridge.
//!
//! Routers broadcast signed bids claiming they can fulfill an in-flight transfer on a
//! destination domain. This crate holds a short auction per transfer, picks a winning
//! router once the wait window elapses, and dispatches the winning execution to one of
//! a configured, ordered set of relayers.
//!
//! # Bid ingestion
//!
//! [`ingestion::BidIngestion::store_bid`] is the entry point a message-broker receiver
//! (out of scope for this crate) calls for every inbound bid. It validates the bid,
//! upserts the transfer's [`cache::auction::Auction`] record, seeds
//! [`bid::BidData`] on first acceptance, and opens the transfer for the executor by
//! setting its status to `Queued`.
//!
//! # The auction executor
//!
//! [`executor::Executor`] ticks on a fixed interval. Each tick it scans every `Queued`
//! transfer whose auction has aged past `auctionWaitTime`, groups the survivors by
//! destination domain, and — sequentially within a domain, concurrently across domains —
//! selects a bid, checks the router's cached liquidity, and dispatches through
//! [`relayer::dispatch_with_backup`]. On success the transfer's status becomes `Sent`
//! and its [`cache::auction::AuctionTask`] is recorded.
//!
//! # External collaborators
//!
//! The on-chain ledger, the liquidity indexer, individual relayer clients, and pricing
//! helpers are modeled as the [`chain::ChainReader`] and [`relayer::Relayer`] traits;
//! this crate calls them but does not own their concrete implementations beyond the
//! reference [`chain_client::RpcChainReader`] for the in-scope half of chain reads.
pub mod bid;
pub mod cache;
pub mod chain;
pub mod chain_client;
pub mod config;
pub mod executor;
pub mod fee;
pub mod ingestion;
pub mod relayer;
pub mod types;

mod build_info;
mod metrics;

pub use build_info::BUILD_INFO;
pub use config::Config;
pub use metrics::Metrics;
