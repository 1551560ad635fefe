//! Test support for asserting on recorded metric values.

use std::fmt;
use std::sync::Arc;

use hashbrown::HashMap;
use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::adapter::Adapter;
use crate::errors::AdapterError;
use crate::label::SharedString;
use crate::metrics::{Counter, Gauge, Histogram, Summary};
use crate::tags::TagSet;

static GLOBAL: Lazy<TestAdapter> = Lazy::new(TestAdapter::new);

#[derive(Default)]
struct Inner {
    counters: Mutex<HashMap<SharedString, HashMap<TagSet, u64>>>,
    gauges: Mutex<HashMap<SharedString, HashMap<TagSet, f64>>>,
    histograms: Mutex<HashMap<SharedString, HashMap<TagSet, f64>>>,
    summaries: Mutex<HashMap<SharedString, HashMap<TagSet, f64>>>,
}

impl Inner {
    fn registered(&self) -> Vec<SharedString> {
        let mut names: Vec<SharedString> = Vec::new();
        names.extend(self.counters.lock().keys().cloned());
        names.extend(self.gauges.lock().keys().cloned());
        names.extend(self.histograms.lock().keys().cloned());
        names.extend(self.summaries.lock().keys().cloned());
        names.sort();
        names
    }
}

/// An adapter that records everything it is handed, for tests.
///
/// Values are kept per qualified metric name and per fully resolved
/// [`TagSet`]: counters accumulate their increments, while gauges,
/// histograms, and summaries keep the last value written. Clones share
/// storage, so a test can keep one clone for assertions and register the
/// other with the registry.
///
/// The adapter does not implement the relative gauge hook, so gauge
/// increments reach it through the absolute `set_gauge` fallback.
#[derive(Clone, Default)]
pub struct TestAdapter {
    inner: Arc<Inner>,
}

impl TestAdapter {
    /// Creates an adapter with empty storage.
    pub fn new() -> Self {
        TestAdapter { inner: Arc::new(Inner::default()) }
    }

    /// A process-wide instance, for tests that share one registry.
    pub fn global() -> &'static TestAdapter {
        &GLOBAL
    }

    /// Clears recorded values. Metric registrations survive, so the adapter
    /// behaves as freshly registered rather than never registered.
    pub fn reset(&self) {
        for values in self.inner.counters.lock().values_mut() {
            values.clear();
        }
        for values in self.inner.gauges.lock().values_mut() {
            values.clear();
        }
        for values in self.inner.histograms.lock().values_mut() {
            values.clear();
        }
        for values in self.inner.summaries.lock().values_mut() {
            values.clear();
        }
    }

    /// Qualified names of every metric registered with this adapter, sorted.
    pub fn registered(&self) -> Vec<SharedString> {
        self.inner.registered()
    }

    /// Accumulated total for a counter under exactly `tags`.
    pub fn counter_value(&self, qualified: &str, tags: impl Into<TagSet>) -> Option<u64> {
        self.inner.counters.lock().get(qualified)?.get(&tags.into()).copied()
    }

    /// Last value written to a gauge under exactly `tags`.
    pub fn gauge_value(&self, qualified: &str, tags: impl Into<TagSet>) -> Option<f64> {
        self.inner.gauges.lock().get(qualified)?.get(&tags.into()).copied()
    }

    /// Last value recorded to a histogram under exactly `tags`.
    pub fn histogram_value(&self, qualified: &str, tags: impl Into<TagSet>) -> Option<f64> {
        self.inner.histograms.lock().get(qualified)?.get(&tags.into()).copied()
    }

    /// Last value observed by a summary under exactly `tags`.
    pub fn summary_value(&self, qualified: &str, tags: impl Into<TagSet>) -> Option<f64> {
        self.inner.summaries.lock().get(qualified)?.get(&tags.into()).copied()
    }

    /// Snapshot of every recorded counter as `(metric, tags, total)` triples.
    pub fn counters(&self) -> Vec<(SharedString, TagSet, u64)> {
        let mut entries = Vec::new();
        for (name, values) in self.inner.counters.lock().iter() {
            for (tags, value) in values {
                entries.push((name.clone(), tags.clone(), *value));
            }
        }
        entries
    }

    /// Snapshot of every recorded gauge as `(metric, tags, value)` triples.
    pub fn gauges(&self) -> Vec<(SharedString, TagSet, f64)> {
        Self::snapshot(&self.inner.gauges)
    }

    /// Snapshot of every recorded histogram value as `(metric, tags, value)`
    /// triples.
    pub fn histograms(&self) -> Vec<(SharedString, TagSet, f64)> {
        Self::snapshot(&self.inner.histograms)
    }

    /// Snapshot of every recorded summary observation as
    /// `(metric, tags, value)` triples.
    pub fn summaries(&self) -> Vec<(SharedString, TagSet, f64)> {
        Self::snapshot(&self.inner.summaries)
    }

    fn snapshot(
        map: &Mutex<HashMap<SharedString, HashMap<TagSet, f64>>>,
    ) -> Vec<(SharedString, TagSet, f64)> {
        let mut entries = Vec::new();
        for (name, values) in map.lock().iter() {
            for (tags, value) in values {
                entries.push((name.clone(), tags.clone(), *value));
            }
        }
        entries
    }
}

impl Adapter for TestAdapter {
    fn register_counter(&self, counter: &Counter) -> Result<(), AdapterError> {
        self.inner.counters.lock().entry(counter.meta().qualified.clone()).or_default();
        Ok(())
    }

    fn register_gauge(&self, gauge: &Gauge) -> Result<(), AdapterError> {
        self.inner.gauges.lock().entry(gauge.meta().qualified.clone()).or_default();
        Ok(())
    }

    fn register_histogram(&self, histogram: &Histogram) -> Result<(), AdapterError> {
        self.inner.histograms.lock().entry(histogram.meta().qualified.clone()).or_default();
        Ok(())
    }

    fn register_summary(&self, summary: &Summary) -> Result<(), AdapterError> {
        self.inner.summaries.lock().entry(summary.meta().qualified.clone()).or_default();
        Ok(())
    }

    fn increment_counter(
        &self,
        counter: &Counter,
        tags: &TagSet,
        by: u64,
    ) -> Result<(), AdapterError> {
        let mut counters = self.inner.counters.lock();
        let values = counters.entry(counter.meta().qualified.clone()).or_default();
        *values.entry(tags.clone()).or_insert(0) += by;
        Ok(())
    }

    fn set_gauge(&self, gauge: &Gauge, tags: &TagSet, value: f64) -> Result<(), AdapterError> {
        let mut gauges = self.inner.gauges.lock();
        gauges.entry(gauge.meta().qualified.clone()).or_default().insert(tags.clone(), value);
        Ok(())
    }

    fn record_histogram(
        &self,
        histogram: &Histogram,
        tags: &TagSet,
        value: f64,
    ) -> Result<(), AdapterError> {
        let mut histograms = self.inner.histograms.lock();
        histograms
            .entry(histogram.meta().qualified.clone())
            .or_default()
            .insert(tags.clone(), value);
        Ok(())
    }

    fn record_summary(
        &self,
        summary: &Summary,
        tags: &TagSet,
        value: f64,
    ) -> Result<(), AdapterError> {
        let mut summaries = self.inner.summaries.lock();
        summaries.entry(summary.meta().qualified.clone()).or_default().insert(tags.clone(), value);
        Ok(())
    }
}

impl fmt::Debug for TestAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestAdapter")
            .field("registered", &self.inner.registered())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use crate::tags;

    #[test]
    fn counters_accumulate_and_gauges_keep_last() {
        let registry = Registry::new();
        registry
            .configure(|c| {
                c.counter("restarts", |m| m)?;
                c.gauge("depth", |m| m)?;
                Ok(())
            })
            .unwrap();
        registry.activate().unwrap();

        let adapter = TestAdapter::new();
        registry.register_adapter("test", adapter.clone()).unwrap();

        let counter = registry.counter("restarts").unwrap();
        counter.increment(tags! {}, 2).unwrap();
        counter.increment(tags! {}, 3).unwrap();
        assert_eq!(adapter.counter_value("restarts", tags! {}), Some(5));

        let gauge = registry.gauge("depth").unwrap();
        gauge.set(tags! {}, 4.0).unwrap();
        gauge.set(tags! {}, 2.5).unwrap();
        assert_eq!(adapter.gauge_value("depth", tags! {}), Some(2.5));
    }

    #[test]
    fn reset_clears_values_but_keeps_registrations() {
        let registry = Registry::new();
        registry
            .configure(|c| {
                c.counter("restarts", |m| m)?;
                Ok(())
            })
            .unwrap();
        registry.activate().unwrap();

        let adapter = TestAdapter::new();
        registry.register_adapter("test", adapter.clone()).unwrap();
        registry.counter("restarts").unwrap().increment(tags! {}, 1).unwrap();
        assert_eq!(adapter.counter_value("restarts", tags! {}), Some(1));

        adapter.reset();
        assert_eq!(adapter.counter_value("restarts", tags! {}), None);
        assert_eq!(adapter.registered(), vec![SharedString::from("restarts")]);
    }

    #[test]
    fn clones_share_storage() {
        let adapter = TestAdapter::new();
        let clone = adapter.clone();
        assert!(Arc::ptr_eq(&adapter.inner, &clone.inner));
    }

    #[test]
    fn global_returns_the_same_instance() {
        assert!(Arc::ptr_eq(&TestAdapter::global().inner, &TestAdapter::global().inner));
    }
}
