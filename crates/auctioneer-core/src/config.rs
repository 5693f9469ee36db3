use serde::{
    Deserialize,
    Serialize,
};

/// The single config for running the auctioneer service.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Config {
    /// URL of the shared key/value store backing the cache facade.
    pub redis_url: String,

    /// `auctionWaitTime`: milliseconds an auction must sit before it is eligible for
    /// dispatch.
    pub auction_wait_time_ms: u64,
    /// How often the executor ticks, in milliseconds. Should be well under
    /// `auction_wait_time_ms`.
    pub executor_tick_interval_ms: u64,

    /// `relayerFeeTolerance`: integer percent in `[0, 100]`, the shortfall tolerated
    /// against the estimated fee.
    pub relayer_fee_tolerance_percent: u8,
    /// JSON object mapping origin domain id to a list of addresses exempt from the fee
    /// check on that domain.
    pub relayer_fee_exempt_addresses_json: String,

    /// JSON array of `{"endpoint": ..., "api_key": ..., "relayer_type": ...}` objects,
    /// in dispatch order.
    pub relayers_json: String,

    /// Endpoint of the external chain-reader/indexer collaborator.
    pub chain_reader_endpoint: String,

    /// Log level for the service.
    pub log: String,
    /// Forces writing trace data to stdout no matter if connected to a tty or not.
    pub force_stdout: bool,
    /// Disables writing trace data to an opentelemetry endpoint.
    pub no_otel: bool,
    /// Set to true to disable the metrics server.
    pub no_metrics: bool,
    /// The endpoint which will be listened on for serving prometheus metrics.
    pub metrics_http_listener_addr: String,
}

impl config::Config for Config {
    const PREFIX: &'static str = "AUCTIONEER_";
}

#[cfg(test)]
mod tests {
    use super::Config;

    const EXAMPLE_ENV: &str = include_str!("../local.env.example");

    #[test]
    fn example_env_config_is_up_to_date() {
        config::example_env_config_is_up_to_date::<Config>(EXAMPLE_ENV);
    }

    #[test]
    fn config_should_reject_unknown_var() {
        config::config_should_reject_unknown_var::<Config>(EXAMPLE_ENV);
    }
}
