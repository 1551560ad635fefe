//! The four metric kinds and their shared metadata.
//!
//! Each metric is a cheaply clonable handle around shared state: its
//! metadata, its value store, and the registry it belongs to. Handles can be
//! looked up once at startup, stored, and used from any thread.

use crate::adapter::Adapter;
use crate::errors::AdapterError;
use crate::kind::MetricKind;
use crate::label::SharedString;

mod counter;
mod gauge;
mod histogram;
mod summary;

pub use self::counter::Counter;
pub use self::gauge::Gauge;
pub use self::histogram::Histogram;
pub use self::summary::Summary;

/// Declaration metadata shared by all metric kinds.
///
/// Everything here is passthrough for adapters: the core stores it and hands
/// it out, but never interprets it. `unit`, `per`, and `aggregation` are
/// opaque strings; backends that understand them can use them for rendering
/// or rollups.
#[derive(Clone, Debug)]
pub struct MetricMeta {
    pub(crate) name: SharedString,
    pub(crate) group: Option<SharedString>,
    pub(crate) qualified: SharedString,
    pub(crate) comment: Option<SharedString>,
    pub(crate) declared_tags: Vec<SharedString>,
    pub(crate) unit: Option<SharedString>,
    pub(crate) per: Option<SharedString>,
    pub(crate) aggregation: Option<SharedString>,
    pub(crate) adapter: Vec<SharedString>,
}

impl MetricMeta {
    /// Bare metric name, without the group prefix.
    pub fn name(&self) -> &str {
        self.name.as_ref()
    }

    /// Group this metric belongs to, if any.
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    /// Fully qualified name: `<group>_<name>`, or just the name for
    /// group-less metrics. Qualified names are unique within a registry.
    pub fn qualified_name(&self) -> &str {
        self.qualified.as_ref()
    }

    /// Human-readable description of what the metric measures.
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Tag keys declared for this metric, in declaration order.
    pub fn declared_tags(&self) -> &[SharedString] {
        &self.declared_tags
    }

    /// Unit of the recorded values, e.g. `seconds`.
    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    /// What one recorded value is measured per, e.g. `request`.
    pub fn per(&self) -> Option<&str> {
        self.per.as_deref()
    }

    /// Aggregation hint for backends that roll values up.
    pub fn aggregation(&self) -> Option<&str> {
        self.aggregation.as_deref()
    }

    /// Adapter names this metric is restricted to. Empty means the metric
    /// follows its group's allow-list, or all adapters.
    pub fn adapter_override(&self) -> &[SharedString] {
        &self.adapter
    }
}

/// Any metric, as stored in and returned by the registry.
///
/// This is the closed set of kinds the registry knows how to drive. Adapter
/// registration dispatches over it exactly once, in
/// [`register_with`][Metric::register_with]; everything downstream of that
/// match works with the concrete kind.
#[derive(Clone, Debug)]
pub enum Metric {
    /// A monotonically increasing counter.
    Counter(Counter),
    /// A point-in-time gauge.
    Gauge(Gauge),
    /// A histogram of measured values.
    Histogram(Histogram),
    /// A summary of observed values.
    Summary(Summary),
}

impl Metric {
    /// Kind of this metric.
    pub fn kind(&self) -> MetricKind {
        match self {
            Metric::Counter(_) => MetricKind::Counter,
            Metric::Gauge(_) => MetricKind::Gauge,
            Metric::Histogram(_) => MetricKind::Histogram,
            Metric::Summary(_) => MetricKind::Summary,
        }
    }

    /// Declaration metadata of this metric.
    pub fn meta(&self) -> &MetricMeta {
        match self {
            Metric::Counter(counter) => counter.meta(),
            Metric::Gauge(gauge) => gauge.meta(),
            Metric::Histogram(histogram) => histogram.meta(),
            Metric::Summary(summary) => summary.meta(),
        }
    }

    /// Fully qualified name of this metric.
    pub fn qualified_name(&self) -> &str {
        self.meta().qualified_name()
    }

    /// Registers this metric with a single adapter, by kind.
    pub fn register_with(&self, adapter: &dyn Adapter) -> Result<(), AdapterError> {
        match self {
            Metric::Counter(counter) => adapter.register_counter(counter),
            Metric::Gauge(gauge) => adapter.register_gauge(gauge),
            Metric::Histogram(histogram) => adapter.register_histogram(histogram),
            Metric::Summary(summary) => adapter.register_summary(summary),
        }
    }

    /// Returns the counter handle if this metric is a counter.
    pub fn as_counter(&self) -> Option<&Counter> {
        match self {
            Metric::Counter(counter) => Some(counter),
            _ => None,
        }
    }

    /// Returns the gauge handle if this metric is a gauge.
    pub fn as_gauge(&self) -> Option<&Gauge> {
        match self {
            Metric::Gauge(gauge) => Some(gauge),
            _ => None,
        }
    }

    /// Returns the histogram handle if this metric is a histogram.
    pub fn as_histogram(&self) -> Option<&Histogram> {
        match self {
            Metric::Histogram(histogram) => Some(histogram),
            _ => None,
        }
    }

    /// Returns the summary handle if this metric is a summary.
    pub fn as_summary(&self) -> Option<&Summary> {
        match self {
            Metric::Summary(summary) => Some(summary),
            _ => None,
        }
    }
}
