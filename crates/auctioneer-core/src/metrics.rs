use auctioneer_telemetry::{
    metric_names,
    metrics::{
        self,
        Counter,
        RegisteringBuilder,
    },
};

pub struct Metrics {
    transfers_ingested_count: Counter,
    transfers_dispatched_count: Counter,
    transfers_expired_count: Counter,
    relayer_send_failures_count: Counter,
    bid_data_missing_count: Counter,
}

impl Metrics {
    pub(crate) fn increment_transfers_ingested(&self) {
        self.transfers_ingested_count.increment(1);
    }

    pub(crate) fn increment_transfers_dispatched(&self) {
        self.transfers_dispatched_count.increment(1);
    }

    pub(crate) fn increment_transfers_expired(&self) {
        self.transfers_expired_count.increment(1);
    }

    pub(crate) fn increment_relayer_send_failures(&self) {
        self.relayer_send_failures_count.increment(1);
    }

    pub(crate) fn increment_bid_data_missing(&self) {
        self.bid_data_missing_count.increment(1);
    }
}

impl auctioneer_telemetry::metrics::Metrics for Metrics {
    type Config = ();

    fn register(
        builder: &mut RegisteringBuilder,
        _config: &Self::Config,
    ) -> Result<Self, metrics::Error> {
        let transfers_ingested_count = builder
            .new_counter_factory(
                TRANSFERS_INGESTED,
                "the number of bids accepted by bid ingestion",
            )?
            .register()?;

        let transfers_dispatched_count = builder
            .new_counter_factory(
                TRANSFERS_DISPATCHED,
                "the number of transfers successfully dispatched to a relayer",
            )?
            .register()?;

        let transfers_expired_count = builder
            .new_counter_factory(
                TRANSFERS_EXPIRED,
                "the number of bids rejected because their auction had already been dispatched",
            )?
            .register()?;

        let relayer_send_failures_count = builder
            .new_counter_factory(
                RELAYER_SEND_FAILURES,
                "the number of single-relayer send attempts that were rejected",
            )?
            .register()?;

        let bid_data_missing_count = builder
            .new_counter_factory(
                BID_DATA_MISSING,
                "the number of times the executor found an auction with no bid data",
            )?
            .register()?;

        Ok(Self {
            transfers_ingested_count,
            transfers_dispatched_count,
            transfers_expired_count,
            relayer_send_failures_count,
            bid_data_missing_count,
        })
    }
}

metric_names!(const METRICS_NAMES:
    TRANSFERS_INGESTED,
    TRANSFERS_DISPATCHED,
    TRANSFERS_EXPIRED,
    RELAYER_SEND_FAILURES,
    BID_DATA_MISSING,
);
