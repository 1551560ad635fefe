use std::fmt;
use std::sync::Arc;

use quanta::Instant;

use crate::errors::Error;
use crate::label::SharedString;
use crate::metrics::MetricMeta;
use crate::registry::RegistryCore;
use crate::storage::{SampleCell, ValueStore};
use crate::tags::TagSet;

/// A summary of observed values.
///
/// Summaries are histograms without declared buckets: backends compute their
/// own quantiles from the raw observations. The core keeps the last
/// observation per tag set and forwards every observation to the adapters in
/// scope.
#[derive(Clone)]
pub struct Summary {
    inner: Arc<SummaryInner>,
}

struct SummaryInner {
    meta: MetricMeta,
    values: ValueStore<SampleCell>,
    registry: Arc<RegistryCore>,
}

impl Summary {
    pub(crate) fn new(meta: MetricMeta, registry: Arc<RegistryCore>) -> Self {
        Summary { inner: Arc::new(SummaryInner { meta, values: ValueStore::new(), registry }) }
    }

    /// Declaration metadata of this summary.
    pub fn meta(&self) -> &MetricMeta {
        &self.inner.meta
    }

    /// Fully qualified name of this summary.
    pub fn qualified_name(&self) -> &str {
        self.inner.meta.qualified_name()
    }

    /// Tag keys an observation of this summary can carry: the declared tags
    /// plus the default-tag keys of the enclosing scope.
    pub fn tags(&self) -> Vec<SharedString> {
        self.inner.registry.tag_names_for(&self.inner.meta)
    }

    /// Records `value` for the resolved tag set, forwards it to every
    /// adapter in scope, and returns it.
    pub fn observe(&self, tags: impl Into<TagSet>, value: f64) -> Result<f64, Error> {
        let resolved = self.inner.registry.resolve_tags(self.inner.meta.group(), tags.into());
        self.inner.values.get_or_create(&resolved, |cell| cell.set(value));
        for (_, adapter) in self.inner.registry.adapter_scope(&self.inner.meta)? {
            adapter.record_summary(self, &resolved, value)?;
        }
        Ok(value)
    }

    /// Times `f` on the monotonic clock, records the elapsed seconds as an
    /// observation, and returns the closure's output.
    ///
    /// Nothing is recorded if `f` panics.
    pub fn observe_with<F, T>(&self, tags: impl Into<TagSet>, f: F) -> Result<T, Error>
    where
        F: FnOnce() -> T,
    {
        let start = Instant::now();
        let output = f();
        self.observe(tags, start.elapsed().as_secs_f64())?;
        Ok(output)
    }

    /// Reads the last observation for the resolved tag set, without touching
    /// adapters. `None` until the tag set has been observed at least once.
    pub fn get(&self, tags: impl Into<TagSet>) -> Option<f64> {
        let resolved = self.inner.registry.resolve_tags(self.inner.meta.group(), tags.into());
        self.inner.values.get(&resolved, |cell| cell.get())
    }
}

impl fmt::Debug for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Summary").field("name", &self.inner.meta.qualified).finish_non_exhaustive()
    }
}
