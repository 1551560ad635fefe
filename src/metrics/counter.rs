use std::fmt;
use std::sync::Arc;

use crate::errors::Error;
use crate::label::SharedString;
use crate::metrics::MetricMeta;
use crate::registry::RegistryCore;
use crate::storage::{CounterCell, ValueStore};
use crate::tags::TagSet;

/// A monotonically increasing counter.
///
/// Counters count things: requests served, jobs failed, bytes read. The only
/// write operation is [`increment`][Counter::increment]; there is no set or
/// reset, so backends can derive rates from the totals.
#[derive(Clone)]
pub struct Counter {
    inner: Arc<CounterInner>,
}

struct CounterInner {
    meta: MetricMeta,
    values: ValueStore<CounterCell>,
    registry: Arc<RegistryCore>,
}

impl Counter {
    pub(crate) fn new(meta: MetricMeta, registry: Arc<RegistryCore>) -> Self {
        Counter { inner: Arc::new(CounterInner { meta, values: ValueStore::new(), registry }) }
    }

    /// Declaration metadata of this counter.
    pub fn meta(&self) -> &MetricMeta {
        &self.inner.meta
    }

    /// Fully qualified name of this counter.
    pub fn qualified_name(&self) -> &str {
        self.inner.meta.qualified_name()
    }

    /// Tag keys an observation of this counter can carry: the declared tags
    /// plus the default-tag keys of the enclosing scope.
    pub fn tags(&self) -> Vec<SharedString> {
        self.inner.registry.tag_names_for(&self.inner.meta)
    }

    /// Adds `by` to the value for the resolved tag set and returns the new
    /// total, after forwarding the increment to every adapter in scope.
    ///
    /// The tags passed here are the highest-precedence layer; see
    /// [`Registry::resolve_tags`](crate::Registry::resolve_tags) for the full
    /// resolution order.
    pub fn increment(&self, tags: impl Into<TagSet>, by: u64) -> Result<u64, Error> {
        let resolved = self.inner.registry.resolve_tags(self.inner.meta.group(), tags.into());
        let total = self.inner.values.get_or_create(&resolved, |cell| cell.increment(by));
        for (_, adapter) in self.inner.registry.adapter_scope(&self.inner.meta)? {
            adapter.increment_counter(self, &resolved, by)?;
        }
        Ok(total)
    }

    /// Reads the current total for the resolved tag set, without touching
    /// adapters. `None` until the tag set has been incremented at least once.
    pub fn get(&self, tags: impl Into<TagSet>) -> Option<u64> {
        let resolved = self.inner.registry.resolve_tags(self.inner.meta.group(), tags.into());
        self.inner.values.get(&resolved, |cell| cell.get())
    }
}

impl fmt::Debug for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Counter").field("name", &self.inner.meta.qualified).finish_non_exhaustive()
    }
}
