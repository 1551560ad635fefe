use crate::errors::AdapterError;
use crate::metrics::{Counter, Gauge, Histogram, Summary};
use crate::tags::TagSet;

/// Outcome of asking an adapter to apply a relative gauge update.
///
/// Some backends can apply a delta natively; others only accept absolute
/// values. An adapter reports which case it is through this enum rather than
/// through an error: `Unsupported` is an ordinary answer that makes the
/// caller fall back to [`Adapter::set_gauge`] with the new absolute value,
/// while a genuine failure is an `Err` and aborts the write.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HookSupport {
    /// The adapter applied the operation itself.
    Handled,
    /// The adapter does not implement the operation; the caller should use
    /// the documented fallback.
    Unsupported,
}

/// A metrics backend.
///
/// This is the trait that connects the registry to concrete backends. The
/// registry calls the `register_*` hooks once per adapter per metric when a
/// metric becomes known to that adapter, and the write hooks on every value
/// mutation, with the fully resolved [`TagSet`] for the observation.
///
/// Every hook has a default implementation that fails with
/// [`AdapterError::Unsupported`], so a backend that only handles some kinds
/// rejects the others loudly at registration time instead of silently
/// dropping writes. The one exception is [`increment_gauge`][Self::increment_gauge],
/// whose default returns [`HookSupport::Unsupported`] to request the
/// set-based fallback.
///
/// Hooks run synchronously on the instrumented thread, in adapter
/// registration order; the first error aborts delivery to adapters later in
/// the order and propagates to the instrumentation call site.
pub trait Adapter: Send + Sync {
    /// Registers a counter with this adapter.
    fn register_counter(&self, counter: &Counter) -> Result<(), AdapterError> {
        let _ = counter;
        Err(AdapterError::unsupported("register_counter"))
    }

    /// Registers a gauge with this adapter.
    fn register_gauge(&self, gauge: &Gauge) -> Result<(), AdapterError> {
        let _ = gauge;
        Err(AdapterError::unsupported("register_gauge"))
    }

    /// Registers a histogram with this adapter.
    fn register_histogram(&self, histogram: &Histogram) -> Result<(), AdapterError> {
        let _ = histogram;
        Err(AdapterError::unsupported("register_histogram"))
    }

    /// Registers a summary with this adapter.
    fn register_summary(&self, summary: &Summary) -> Result<(), AdapterError> {
        let _ = summary;
        Err(AdapterError::unsupported("register_summary"))
    }

    /// Records a counter increment.
    fn increment_counter(
        &self,
        counter: &Counter,
        tags: &TagSet,
        by: u64,
    ) -> Result<(), AdapterError> {
        let _ = (counter, tags, by);
        Err(AdapterError::unsupported("increment_counter"))
    }

    /// Records an absolute gauge value.
    fn set_gauge(&self, gauge: &Gauge, tags: &TagSet, value: f64) -> Result<(), AdapterError> {
        let _ = (gauge, tags, value);
        Err(AdapterError::unsupported("set_gauge"))
    }

    /// Applies a relative gauge update, if the backend supports deltas.
    ///
    /// Decrements arrive as a negative `by`. Returning
    /// [`HookSupport::Unsupported`] (the default) makes the registry call
    /// [`set_gauge`][Self::set_gauge] with the updated absolute value instead.
    fn increment_gauge(
        &self,
        gauge: &Gauge,
        tags: &TagSet,
        by: f64,
    ) -> Result<HookSupport, AdapterError> {
        let _ = (gauge, tags, by);
        Ok(HookSupport::Unsupported)
    }

    /// Records a histogram measurement.
    fn record_histogram(
        &self,
        histogram: &Histogram,
        tags: &TagSet,
        value: f64,
    ) -> Result<(), AdapterError> {
        let _ = (histogram, tags, value);
        Err(AdapterError::unsupported("record_histogram"))
    }

    /// Records a summary observation.
    fn record_summary(
        &self,
        summary: &Summary,
        tags: &TagSet,
        value: f64,
    ) -> Result<(), AdapterError> {
        let _ = (summary, tags, value);
        Err(AdapterError::unsupported("record_summary"))
    }

    /// Called once when debug instrumentation is enabled.
    ///
    /// Backends can use this to turn on their own verbose paths. The default
    /// does nothing.
    fn enable_debug(&self) {}
}
