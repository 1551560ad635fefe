use std::fmt;
use std::sync::Arc;

use crate::adapter::HookSupport;
use crate::errors::Error;
use crate::label::SharedString;
use crate::metrics::MetricMeta;
use crate::registry::RegistryCore;
use crate::storage::{SampleCell, ValueStore};
use crate::tags::TagSet;

/// A point-in-time gauge.
///
/// Gauges track a level that can go up and down: queue depth, open
/// connections, cache size. [`set`][Gauge::set] replaces the value;
/// [`increment`][Gauge::increment] and [`decrement`][Gauge::decrement] apply
/// a delta on top of whatever was recorded before (zero if nothing was).
#[derive(Clone)]
pub struct Gauge {
    inner: Arc<GaugeInner>,
}

struct GaugeInner {
    meta: MetricMeta,
    values: ValueStore<SampleCell>,
    registry: Arc<RegistryCore>,
}

impl Gauge {
    pub(crate) fn new(meta: MetricMeta, registry: Arc<RegistryCore>) -> Self {
        Gauge { inner: Arc::new(GaugeInner { meta, values: ValueStore::new(), registry }) }
    }

    /// Declaration metadata of this gauge.
    pub fn meta(&self) -> &MetricMeta {
        &self.inner.meta
    }

    /// Fully qualified name of this gauge.
    pub fn qualified_name(&self) -> &str {
        self.inner.meta.qualified_name()
    }

    /// Tag keys an observation of this gauge can carry: the declared tags
    /// plus the default-tag keys of the enclosing scope.
    pub fn tags(&self) -> Vec<SharedString> {
        self.inner.registry.tag_names_for(&self.inner.meta)
    }

    /// Replaces the value for the resolved tag set and forwards it to every
    /// adapter in scope.
    pub fn set(&self, tags: impl Into<TagSet>, value: f64) -> Result<(), Error> {
        let resolved = self.inner.registry.resolve_tags(self.inner.meta.group(), tags.into());
        self.inner.values.get_or_create(&resolved, |cell| cell.set(value));
        for (_, adapter) in self.inner.registry.adapter_scope(&self.inner.meta)? {
            adapter.set_gauge(self, &resolved, value)?;
        }
        Ok(())
    }

    /// Adds `by` to the value for the resolved tag set and returns the new
    /// value.
    ///
    /// Adapters are offered the delta through their
    /// [`increment_gauge`](crate::Adapter::increment_gauge) hook; an adapter
    /// that reports [`HookSupport::Unsupported`] receives a
    /// [`set_gauge`](crate::Adapter::set_gauge) call with the new absolute
    /// value instead.
    pub fn increment(&self, tags: impl Into<TagSet>, by: f64) -> Result<f64, Error> {
        let resolved = self.inner.registry.resolve_tags(self.inner.meta.group(), tags.into());
        let value = self.inner.values.get_or_create(&resolved, |cell| cell.add(by));
        for (_, adapter) in self.inner.registry.adapter_scope(&self.inner.meta)? {
            match adapter.increment_gauge(self, &resolved, by)? {
                HookSupport::Handled => {}
                HookSupport::Unsupported => adapter.set_gauge(self, &resolved, value)?,
            }
        }
        Ok(value)
    }

    /// Subtracts `by` from the value for the resolved tag set and returns
    /// the new value. Adapters see this as an increment by `-by`.
    pub fn decrement(&self, tags: impl Into<TagSet>, by: f64) -> Result<f64, Error> {
        self.increment(tags, -by)
    }

    /// Reads the current value for the resolved tag set, without touching
    /// adapters. `None` until the tag set has been written at least once.
    pub fn get(&self, tags: impl Into<TagSet>) -> Option<f64> {
        let resolved = self.inner.registry.resolve_tags(self.inner.meta.group(), tags.into());
        self.inner.values.get(&resolved, |cell| cell.get())
    }
}

impl fmt::Debug for Gauge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gauge").field("name", &self.inner.meta.qualified).finish_non_exhaustive()
    }
}
