use std::fmt;
use std::sync::Arc;

use quanta::Instant;

use crate::errors::Error;
use crate::label::SharedString;
use crate::metrics::MetricMeta;
use crate::registry::RegistryCore;
use crate::storage::{SampleCell, ValueStore};
use crate::tags::TagSet;

/// A histogram of measured values.
///
/// Histograms record individual measurements, most commonly durations. The
/// core keeps only the last measurement per tag set; bucketing and percentile
/// math live in the backends, driven by the declared
/// [`buckets`][Histogram::buckets] boundaries, which the core passes through
/// without interpreting.
#[derive(Clone)]
pub struct Histogram {
    inner: Arc<HistogramInner>,
}

struct HistogramInner {
    meta: MetricMeta,
    buckets: Vec<f64>,
    values: ValueStore<SampleCell>,
    registry: Arc<RegistryCore>,
}

impl Histogram {
    pub(crate) fn new(meta: MetricMeta, buckets: Vec<f64>, registry: Arc<RegistryCore>) -> Self {
        Histogram {
            inner: Arc::new(HistogramInner {
                meta,
                buckets,
                values: ValueStore::new(),
                registry,
            }),
        }
    }

    /// Declaration metadata of this histogram.
    pub fn meta(&self) -> &MetricMeta {
        &self.inner.meta
    }

    /// Fully qualified name of this histogram.
    pub fn qualified_name(&self) -> &str {
        self.inner.meta.qualified_name()
    }

    /// Bucket boundaries declared for this histogram.
    pub fn buckets(&self) -> &[f64] {
        &self.inner.buckets
    }

    /// Tag keys an observation of this histogram can carry: the declared
    /// tags plus the default-tag keys of the enclosing scope.
    pub fn tags(&self) -> Vec<SharedString> {
        self.inner.registry.tag_names_for(&self.inner.meta)
    }

    /// Records `value` for the resolved tag set, forwards it to every
    /// adapter in scope, and returns it.
    pub fn measure(&self, tags: impl Into<TagSet>, value: f64) -> Result<f64, Error> {
        let resolved = self.inner.registry.resolve_tags(self.inner.meta.group(), tags.into());
        self.inner.values.get_or_create(&resolved, |cell| cell.set(value));
        for (_, adapter) in self.inner.registry.adapter_scope(&self.inner.meta)? {
            adapter.record_histogram(self, &resolved, value)?;
        }
        Ok(value)
    }

    /// Times `f` on the monotonic clock, records the elapsed seconds as a
    /// measurement, and returns the closure's output.
    ///
    /// Nothing is recorded if `f` panics.
    pub fn measure_with<F, T>(&self, tags: impl Into<TagSet>, f: F) -> Result<T, Error>
    where
        F: FnOnce() -> T,
    {
        let start = Instant::now();
        let output = f();
        self.measure(tags, start.elapsed().as_secs_f64())?;
        Ok(output)
    }

    /// Reads the last measurement for the resolved tag set, without touching
    /// adapters. `None` until the tag set has been measured at least once.
    pub fn get(&self, tags: impl Into<TagSet>) -> Option<f64> {
        let resolved = self.inner.registry.resolve_tags(self.inner.meta.group(), tags.into());
        self.inner.values.get(&resolved, |cell| cell.get())
    }
}

impl fmt::Debug for Histogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Histogram")
            .field("name", &self.inner.meta.qualified)
            .field("buckets", &self.inner.buckets)
            .finish_non_exhaustive()
    }
}
