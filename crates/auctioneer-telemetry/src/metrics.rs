//! A small typed layer over the `metrics` crate's global recorder.
//!
//! Service crates implement [`Metrics`] on their own metrics struct, registering each
//! counter or gauge once at startup through a [`RegisteringBuilder`]. The returned
//! [`Counter`]/[`Gauge`] handles are cheap to clone and are the only way the rest of
//! the service interacts with metrics; nothing downstream touches the `metrics` crate
//! directly.
use metrics::{
    Key,
    KeyName,
    Label,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("a metric named `{name}` was already registered")]
    AlreadyRegistered { name: &'static str },
}

/// Implemented by a service's metrics struct.
///
/// `Config` carries whatever a particular deployment needs to decide which metrics to
/// register with which labels (most services have no such configuration and use `()`).
pub trait Metrics: Send + Sync + Sized + 'static {
    type Config;

    /// Registers every counter and gauge the implementing metrics struct exposes.
    fn register(builder: &mut RegisteringBuilder, config: &Self::Config) -> Result<Self, Error>;
}

/// Handed to [`Metrics::register`] to create [`Counter`]s and [`Gauge`]s.
#[derive(Default)]
pub struct RegisteringBuilder {
    registered: std::collections::HashSet<&'static str>,
}

impl RegisteringBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Describes a counter and returns a factory that can register one or more
    /// differently-labeled instances of it.
    pub fn new_counter_factory(
        &mut self,
        name: &'static str,
        description: &'static str,
    ) -> Result<CounterFactory, Error> {
        self.mark_registered(name)?;
        metrics::describe_counter!(KeyName::from(name), description);
        Ok(CounterFactory {
            name,
        })
    }

    /// Describes a gauge and returns a factory that can register one or more
    /// differently-labeled instances of it.
    pub fn new_gauge_factory(
        &mut self,
        name: &'static str,
        description: &'static str,
    ) -> Result<GaugeFactory, Error> {
        self.mark_registered(name)?;
        metrics::describe_gauge!(KeyName::from(name), description);
        Ok(GaugeFactory {
            name,
        })
    }

    fn mark_registered(&mut self, name: &'static str) -> Result<(), Error> {
        if !self.registered.insert(name) {
            return Err(Error::AlreadyRegistered {
                name,
            });
        }
        Ok(())
    }
}

pub struct CounterFactory {
    name: &'static str,
}

impl CounterFactory {
    pub fn register(&mut self) -> Result<Counter, Error> {
        Ok(Counter(metrics::counter!(self.name.to_owned())))
    }

    pub fn register_with_labels(&mut self, labels: &[(&'static str, String)]) -> Result<Counter, Error> {
        let key = key_with_labels(self.name, labels);
        Ok(Counter(metrics::Recorder::counter(
            &*metrics::recorder(),
            &key,
        )))
    }
}

pub struct GaugeFactory {
    name: &'static str,
}

impl GaugeFactory {
    pub fn register(&mut self) -> Result<Gauge, Error> {
        Ok(Gauge(metrics::gauge!(self.name.to_owned())))
    }

    pub fn register_with_labels(&mut self, labels: &[(&'static str, String)]) -> Result<Gauge, Error> {
        let key = key_with_labels(self.name, labels);
        Ok(Gauge(metrics::Recorder::gauge(&*metrics::recorder(), &key)))
    }
}

fn key_with_labels(name: &'static str, labels: &[(&'static str, String)]) -> Key {
    let labels: Vec<Label> = labels
        .iter()
        .map(|(key, value)| Label::new(*key, value.clone()))
        .collect();
    Key::from_parts(name, labels)
}

#[derive(Clone)]
pub struct Counter(metrics::Counter);

impl Counter {
    pub fn increment(&self, value: u64) {
        self.0.increment(value);
    }
}

#[derive(Clone)]
pub struct Gauge(metrics::Gauge);

impl Gauge {
    pub fn set(&self, value: impl IntoF64) {
        self.0.set(value.into_f64());
    }

    pub fn increment(&self, value: impl IntoF64) {
        self.0.increment(value.into_f64());
    }
}

/// Converts common numeric types into the `f64` a [`Gauge`] is set/incremented by.
pub trait IntoF64 {
    fn into_f64(self) -> f64;
}

macro_rules! impl_into_f64 {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoF64 for $ty {
                fn into_f64(self) -> f64 {
                    self as f64
                }
            }
        )*
    };
}

impl_into_f64!(f64, f32, i64, i32, u64, u32, usize);

/// Declares a block of `pub const` metric name strings, each prefixed with the crate's
/// package name so that metrics from different services never collide.
#[macro_export]
macro_rules! metric_names {
    (const $array_name:ident: $($name:ident),+ $(,)?) => {
        $(
            pub(crate) const $name: &str = $crate::__private::concatcp!(
                env!("CARGO_PKG_NAME"),
                "_",
                stringify!($name)
            );
        )+

        #[allow(dead_code)]
        pub(crate) const $array_name: &[&str] = &[$($name),+];
    };
}

