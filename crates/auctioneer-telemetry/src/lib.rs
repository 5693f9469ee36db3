//! Process bootstrap shared by every binary in this workspace: structured logging via
//! `tracing-subscriber`, an optional OpenTelemetry OTLP trace exporter, and a Prometheus
//! metrics endpoint wired up through [`metrics`].
#[cfg(feature = "display")]
pub mod display;
pub mod metrics;

#[doc(hidden)]
pub mod __private {
    pub use const_format::concatcp;
}

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;
use opentelemetry::KeyValue;
use opentelemetry_sdk::{
    trace::Tracer,
    Resource,
};
use tracing_subscriber::{
    layer::SubscriberExt as _,
    util::SubscriberInitExt as _,
    EnvFilter,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed parsing `{input}` as a metrics listener socket address")]
    InvalidMetricsAddr {
        input: String,
        #[source]
        source: std::net::AddrParseError,
    },
    #[error("failed constructing the EnvFilter from the provided filter directives")]
    InvalidFilterDirectives(#[source] tracing_subscriber::filter::ParseError),
    #[error("failed installing the prometheus metrics recorder")]
    Prometheus(#[source] metrics_exporter_prometheus::BuildError),
    #[error("failed installing the OTLP trace exporter")]
    Otlp(#[source] opentelemetry::trace::TraceError),
    #[error("failed installing the global tracing subscriber")]
    SetGlobalSubscriber(#[source] tracing::subscriber::SetGlobalDefaultError),
    #[error("failed registering application metrics")]
    RegisterMetrics(#[source] metrics::Error),
}

/// Starts building a [`Config`].
#[must_use]
pub fn configure() -> Config {
    Config::default()
}

#[derive(Default)]
pub struct Config {
    no_otel: bool,
    force_stdout: bool,
    pretty_print: bool,
    filter_directives: String,
    metrics: Option<(String, &'static str)>,
}

impl Config {
    #[must_use]
    pub fn set_no_otel(mut self, no_otel: bool) -> Self {
        self.no_otel = no_otel;
        self
    }

    #[must_use]
    pub fn set_force_stdout(mut self, force_stdout: bool) -> Self {
        self.force_stdout = force_stdout;
        self
    }

    #[must_use]
    pub fn set_pretty_print(mut self, pretty_print: bool) -> Self {
        self.pretty_print = pretty_print;
        self
    }

    #[must_use]
    pub fn set_filter_directives(mut self, filter_directives: &str) -> Self {
        self.filter_directives = filter_directives.to_string();
        self
    }

    #[must_use]
    pub fn set_metrics(mut self, listener_addr: &str, service_name: &'static str) -> Self {
        self.metrics = Some((listener_addr.to_string(), service_name));
        self
    }

    /// Installs the global tracing subscriber and, if configured, the Prometheus metrics
    /// recorder, then registers `M` against it.
    ///
    /// # Errors
    /// Returns an error if the filter directives do not parse, the metrics listener
    /// address is invalid, the OTLP exporter cannot be constructed, or `M::register`
    /// fails.
    pub fn try_init<M: metrics::Metrics>(
        self,
        metrics_config: &M::Config,
    ) -> Result<(&'static M, ShutdownGuard), Error> {
        let env_filter = EnvFilter::try_new(&self.filter_directives)
            .map_err(Error::InvalidFilterDirectives)?;

        let is_stdout = self.force_stdout || atty_stdout();
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_ansi(is_stdout)
            .json()
            .flatten_event(true);
        let fmt_layer = if self.pretty_print {
            fmt_layer.pretty().boxed()
        } else {
            fmt_layer.boxed()
        };

        let otel_tracer = if self.no_otel {
            None
        } else {
            Some(init_otel_tracer(metrics_config_service_name(&self.metrics))?)
        };
        let otel_layer = otel_tracer
            .clone()
            .map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer));

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .with(otel_layer)
            .try_init()
            .map_err(Error::SetGlobalSubscriber)?;

        if let Some((addr, _service_name)) = &self.metrics {
            let addr: SocketAddr = addr
                .parse()
                .map_err(|source| Error::InvalidMetricsAddr {
                    input: addr.clone(),
                    source,
                })?;
            PrometheusBuilder::new()
                .with_http_listener(addr)
                .install()
                .map_err(Error::Prometheus)?;
        }

        let mut builder = metrics::RegisteringBuilder::new();
        let registered = M::register(&mut builder, metrics_config).map_err(Error::RegisterMetrics)?;
        let metrics: &'static M = Box::leak(Box::new(registered));

        Ok((
            metrics,
            ShutdownGuard {
                otel_installed: otel_tracer.is_some(),
            },
        ))
    }
}

fn metrics_config_service_name(metrics: &Option<(String, &'static str)>) -> &'static str {
    metrics.as_ref().map_or("service", |(_, name)| *name)
}

fn init_otel_tracer(service_name: &'static str) -> Result<Tracer, Error> {
    use opentelemetry_otlp::WithExportConfig as _;

    opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(opentelemetry_otlp::new_exporter().tonic())
        .with_trace_config(opentelemetry_sdk::trace::config().with_resource(Resource::new(
            vec![KeyValue::new(
                opentelemetry_semantic_conventions::resource::SERVICE_NAME,
                service_name,
            )],
        )))
        .install_batch(opentelemetry_sdk::runtime::Tokio)
        .map_err(Error::Otlp)
}

fn atty_stdout() -> bool {
    use std::io::IsTerminal as _;
    std::io::stdout().is_terminal()
}

/// Flushes any pending OpenTelemetry spans on drop.
///
/// Held by the caller of [`Config::try_init`] for the lifetime of the process; dropping
/// it early will truncate in-flight traces.
pub struct ShutdownGuard {
    otel_installed: bool,
}

impl Drop for ShutdownGuard {
    fn drop(&mut self) {
        if self.otel_installed {
            opentelemetry::global::shutdown_tracer_provider();
        }
    }
}
