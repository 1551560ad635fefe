//! Declaration DSL evaluated inside [`configure`][crate::Registry::configure]
//! blocks.

use std::panic::Location;
use std::sync::Arc;

use crate::builder::MetricBuilder;
use crate::errors::{ConfigurationError, Error};
use crate::kind::MetricKind;
use crate::label::SharedString;
use crate::metrics::{Counter, Gauge, Histogram, Metric, Summary};
use crate::registry::RegistryCore;

/// Declaration context handed to configuration blocks.
///
/// A configurator tracks the ambient group for the block it belongs to.
/// Declarations made while a group is ambient land in that group: the metric
/// name is prefixed with the group name, and the group's default tags apply
/// to every observation.
///
/// Blocks queued before [`Registry::activate`][crate::Registry::activate] are
/// evaluated during activation, in the order they were queued. Blocks added
/// after activation are evaluated immediately.
///
/// ```
/// use telemark::Registry;
///
/// let registry = Registry::new();
/// registry
///     .configure(|c| {
///         c.default_tag("service", "api");
///         c.group("http", |c| {
///             c.default_tag("proto", "h2");
///             c.counter("requests_total", |m| m.comment("Requests served."))?;
///             Ok(())
///         })
///     })
///     .unwrap();
/// registry.activate().unwrap();
///
/// assert!(registry.counter("http_requests_total").is_some());
/// ```
pub struct Configurator<'a> {
    core: &'a Arc<RegistryCore>,
    ambient: Option<SharedString>,
    immediate: bool,
}

impl<'a> Configurator<'a> {
    pub(crate) fn new(core: &'a Arc<RegistryCore>, immediate: bool) -> Self {
        Configurator { core, ambient: None, immediate }
    }

    /// Runs `f` with `name` as the ambient group, then restores whatever
    /// group was ambient before.
    ///
    /// The group is created on first reference.
    pub fn group<F>(&mut self, name: impl Into<SharedString>, f: F) -> Result<(), Error>
    where
        F: FnOnce(&mut Configurator<'_>) -> Result<(), Error>,
    {
        let name = name.into();
        self.core.ensure_group(&name);
        let prior = self.ambient.replace(name);
        let result = f(self);
        self.ambient = prior;
        result
    }

    /// Makes `name` the ambient group for the rest of the block.
    pub fn set_group(&mut self, name: impl Into<SharedString>) {
        let name = name.into();
        self.core.ensure_group(&name);
        self.ambient = Some(name);
    }

    /// Declares a default tag.
    ///
    /// With an ambient group the tag becomes a group default, overriding any
    /// root default for the same key; otherwise it becomes a root default
    /// applied to every metric in the registry.
    pub fn default_tag(&mut self, key: impl Into<SharedString>, value: impl Into<SharedString>) {
        self.core.default_tag_in(self.ambient.as_ref(), key.into(), value.into());
    }

    /// Restricts the ambient group's metrics to the named adapters.
    ///
    /// Fails with [`ConfigurationError::AdapterOutsideGroup`] when no group is
    /// ambient and with [`ConfigurationError::EmptyAdapterList`] when `adapters`
    /// is empty. The names are checked against registered adapters at dispatch
    /// time, so restricting to an adapter that is registered later is fine.
    pub fn restrict_adapters<I, T>(&mut self, adapters: I) -> Result<(), ConfigurationError>
    where
        I: IntoIterator<Item = T>,
        T: Into<SharedString>,
    {
        let names: Vec<SharedString> = adapters.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(ConfigurationError::EmptyAdapterList);
        }
        let group = self.ambient.as_ref().ok_or(ConfigurationError::AdapterOutsideGroup)?;
        self.core.restrict_group(group, names);
        Ok(())
    }

    /// Declares a counter.
    pub fn counter<F>(
        &mut self,
        name: impl Into<SharedString>,
        options: F,
    ) -> Result<(), ConfigurationError>
    where
        F: FnOnce(MetricBuilder) -> MetricBuilder,
    {
        let (meta, _) = options(MetricBuilder::new()).finish(
            MetricKind::Counter,
            name.into(),
            self.ambient.clone(),
        )?;
        let metric = Metric::Counter(Counter::new(meta, Arc::clone(self.core)));
        self.core.declare(metric, self.immediate)
    }

    /// Declares a gauge.
    pub fn gauge<F>(
        &mut self,
        name: impl Into<SharedString>,
        options: F,
    ) -> Result<(), ConfigurationError>
    where
        F: FnOnce(MetricBuilder) -> MetricBuilder,
    {
        let (meta, _) = options(MetricBuilder::new()).finish(
            MetricKind::Gauge,
            name.into(),
            self.ambient.clone(),
        )?;
        let metric = Metric::Gauge(Gauge::new(meta, Arc::clone(self.core)));
        self.core.declare(metric, self.immediate)
    }

    /// Declares a histogram. The [`buckets`][MetricBuilder::buckets] option is
    /// required.
    pub fn histogram<F>(
        &mut self,
        name: impl Into<SharedString>,
        options: F,
    ) -> Result<(), ConfigurationError>
    where
        F: FnOnce(MetricBuilder) -> MetricBuilder,
    {
        let (meta, buckets) = options(MetricBuilder::new()).finish(
            MetricKind::Histogram,
            name.into(),
            self.ambient.clone(),
        )?;
        let metric =
            Metric::Histogram(Histogram::new(meta, buckets.unwrap_or_default(), Arc::clone(self.core)));
        self.core.declare(metric, self.immediate)
    }

    /// Declares a summary.
    pub fn summary<F>(
        &mut self,
        name: impl Into<SharedString>,
        options: F,
    ) -> Result<(), ConfigurationError>
    where
        F: FnOnce(MetricBuilder) -> MetricBuilder,
    {
        let (meta, _) = options(MetricBuilder::new()).finish(
            MetricKind::Summary,
            name.into(),
            self.ambient.clone(),
        )?;
        let metric = Metric::Summary(Summary::new(meta, Arc::clone(self.core)));
        self.core.declare(metric, self.immediate)
    }

    /// Registers a collector callback, to be invoked by
    /// [`collect_once`][crate::Registry::collect_once].
    ///
    /// Collectors are the place to read gauges from the outside world on
    /// demand rather than pushing values continuously. The call site is
    /// recorded; in debug mode each invocation is timed into the
    /// self-instrumentation histogram under a `location = "file:line"` tag.
    #[track_caller]
    pub fn collect<F>(&mut self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.core.add_collector(Box::new(callback), Location::caller());
    }
}
