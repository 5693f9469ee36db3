use std::{
    process::ExitCode,
    sync::Arc,
    time::Duration,
};

use auctioneer_core::{
    cache::{
        auction::AuctionCache,
        liquidity::LiquidityCache,
        RedisStore,
    },
    chain_client::{
        RpcChainReader,
        StubPriceOracle,
    },
    executor::{
        selection::UniformRandom,
        Executor,
        ExecutorConfig,
    },
    Config,
    BUILD_INFO,
};
use auctioneer_eyre::eyre::WrapErr as _;
use tokio::{
    select,
    signal::unix::{
        signal,
        SignalKind,
    },
};
use tokio_util::sync::CancellationToken;
use tracing::{
    error,
    info,
    warn,
};

#[tokio::main]
async fn main() -> ExitCode {
    auctioneer_eyre::install().expect("auctioneer eyre hook must be the first hook installed");

    eprintln!("{}", auctioneer_telemetry::display::json(&BUILD_INFO));

    let cfg: Config = config::get().expect("failed to read configuration");
    eprintln!("{}", auctioneer_telemetry::display::json(&cfg));

    let mut telemetry_conf = auctioneer_telemetry::configure()
        .set_no_otel(cfg.no_otel)
        .set_force_stdout(cfg.force_stdout)
        .set_filter_directives(&cfg.log);

    if !cfg.no_metrics {
        telemetry_conf = telemetry_conf.set_metrics(&cfg.metrics_http_listener_addr, env!("CARGO_PKG_NAME"));
    }

    let (metrics, _telemetry_guard) = match telemetry_conf
        .try_init::<auctioneer_core::Metrics>(&())
        .wrap_err("failed to setup telemetry")
    {
        Err(error) => {
            eprintln!("initializing auctioneer failed:\n{error:?}");
            return ExitCode::FAILURE;
        }
        Ok(metrics_and_guard) => metrics_and_guard,
    };

    info!(
        config = serde_json::to_string(&cfg).expect("serializing to a string cannot fail"),
        "initializing auctioneer"
    );

    let shutdown_token = CancellationToken::new();
    let executor = match build_executor(&cfg, metrics, shutdown_token.child_token()).await {
        Ok(executor) => executor,
        Err(error) => {
            error!(%error, "failed initializing auctioneer");
            return ExitCode::FAILURE;
        }
    };

    let mut sigterm = signal(SignalKind::terminate())
        .expect("setting a SIGTERM listener should always work on Unix");

    let run = tokio::spawn(executor.run());

    select! {
        _ = sigterm.recv() => {
            info!("received SIGTERM; shutting down");
            shutdown_token.cancel();
            let _ = run.await;
            info!("auctioneer stopped");
            ExitCode::SUCCESS
        }
        res = run => {
            error!(error = res.err().map(tracing::field::display), "executor task exited unexpectedly");
            ExitCode::FAILURE
        }
    }
}

/// Wires the in-scope collaborators (the cache facade and the on-chain read side of
/// [`auctioneer_core::chain::ChainReader`]) into a runnable [`Executor`].
///
/// Pricing (`StubPriceOracle`) and the relayer list are explicitly out of scope for this
/// crate: production deployments replace [`StubPriceOracle`] with a real
/// market-data client and populate the relayer list with their own
/// [`auctioneer_core::relayer::Relayer`] implementations.
async fn build_executor(
    cfg: &Config,
    metrics: &'static auctioneer_core::Metrics,
    shutdown_token: CancellationToken,
) -> auctioneer_eyre::eyre::Result<Arc<Executor<RpcChainReader<StubPriceOracle>>>> {
    let store = Arc::new(RedisStore::connect(&cfg.redis_url).await.map_err(|e| {
        auctioneer_eyre::eyre::eyre!("failed connecting to redis: {e}")
    })?);
    let auctions = AuctionCache::new(store.clone());
    let liquidity = LiquidityCache::new(store);

    let price_oracle = Arc::new(StubPriceOracle {
        conversion_rate: auctioneer_core::chain::ScaledPrice(1000),
        decimals: 18,
        relayer_fee: auctioneer_core::chain::ScaledPrice(0),
    });
    let chain = Arc::new(
        RpcChainReader::connect(&cfg.chain_reader_endpoint, price_oracle)
            .map_err(|e| auctioneer_eyre::eyre::eyre!("failed constructing chain reader: {e}"))?,
    );

    let configured_relayers: Vec<serde_json::Value> =
        serde_json::from_str(&cfg.relayers_json).unwrap_or_default();
    if !configured_relayers.is_empty() {
        warn!(
            count = configured_relayers.len(),
            "relayer client construction from configuration is left to integrators; no relayers \
             were wired from `relayers_json`"
        );
    }
    let relayers: Vec<auctioneer_core::relayer::RelayerConfig> = Vec::new();

    Ok(Arc::new(Executor::new(
        auctions,
        liquidity,
        chain,
        relayers,
        Box::new(UniformRandom),
        ExecutorConfig {
            auction_wait_time: Duration::from_millis(cfg.auction_wait_time_ms),
            tick_interval: Duration::from_millis(cfg.executor_tick_interval_ms),
        },
        metrics,
        shutdown_token,
    )))
}
