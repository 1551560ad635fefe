//! The metric registry: declaration state, activation, and dispatch scope.

use std::fmt;
use std::mem;
use std::panic::Location;
use std::sync::Arc;

use arc_swap::ArcSwap;
use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::adapter::Adapter;
use crate::config::Configurator;
use crate::errors::{AlreadyConfiguredError, ConfigurationError, Error};
use crate::group::Group;
use crate::label::SharedString;
use crate::metrics::{Counter, Gauge, Histogram, Metric, MetricMeta, Summary};
use crate::tags::TagSet;

/// Group holding the registry's own instrumentation in debug mode.
pub(crate) const DEBUG_GROUP: &str = "telemark";

/// Qualified name of the histogram timing collector callbacks in debug mode.
pub(crate) const DEBUG_COLLECT_HISTOGRAM: &str = "telemark_collect_duration";

const COLLECT_BUCKETS: [f64; 9] = [0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0];

type ConfigBlock = Box<dyn FnOnce(&mut Configurator<'_>) -> Result<(), Error> + Send>;

#[derive(Clone, Copy, Debug)]
enum Phase {
    Pending,
    Activating(&'static Location<'static>),
    Configured(&'static Location<'static>),
}

struct ConfigState {
    phase: Phase,
    queue: Vec<ConfigBlock>,
    /// Declared metrics whose register hooks have run, counted in
    /// declaration order. Survives a failed activation so a retry does not
    /// repeat hooks already delivered.
    registered: usize,
    /// Whether the debug self-instrumentation block has been queued.
    /// Unevaluated blocks stay queued across a failed activation, so a
    /// retry must not queue a second copy.
    debug_queued: bool,
}

pub(crate) struct CollectorEntry {
    callback: Box<dyn Fn() + Send + Sync>,
    location: &'static Location<'static>,
}

/// Shared state behind [`Registry`] handles and metric handles.
///
/// The maps read on every observation (metrics, groups, adapters, root
/// default tags) are swapped wholesale so readers never block; structural
/// writers serialize on `structural`. The configuration queue and phase flag
/// live behind their own mutex, off the observation path.
pub(crate) struct RegistryCore {
    metrics: ArcSwap<IndexMap<SharedString, Metric>>,
    groups: ArcSwap<IndexMap<SharedString, Group>>,
    adapters: ArcSwap<IndexMap<SharedString, Arc<dyn Adapter>>>,
    default_tags: ArcSwap<TagSet>,
    collectors: Mutex<Vec<Arc<CollectorEntry>>>,
    state: Mutex<ConfigState>,
    structural: Mutex<()>,
    debug: bool,
}

impl RegistryCore {
    /// Resolves the tags for one observation: root defaults, overridden by
    /// `group`'s defaults, the thread-local overlay, and finally `explicit`.
    pub(crate) fn resolve_tags(&self, group: Option<&str>, explicit: TagSet) -> TagSet {
        let mut resolved = (**self.default_tags.load()).clone();
        if let Some(name) = group {
            if let Some(group) = self.groups.load().get(name) {
                resolved.merge(group.default_tags());
            }
        }
        resolved.merge(crate::tags::local_tags());
        resolved.merge(explicit);
        resolved
    }

    /// Adapters a metric dispatches to, as `(name, adapter)` pairs in
    /// registration order.
    ///
    /// The metric's own adapter override wins over the group allow-list,
    /// which wins over "all registered adapters". Restriction names are
    /// checked against the current adapter map on every call, so an absent
    /// name fails whichever dispatch encounters it.
    pub(crate) fn adapter_scope(
        &self,
        meta: &MetricMeta,
    ) -> Result<Vec<(SharedString, Arc<dyn Adapter>)>, ConfigurationError> {
        let adapters = self.adapters.load();
        let restriction = if !meta.adapter.is_empty() {
            Some(meta.adapter.clone())
        } else {
            match meta.group().and_then(|name| self.groups.load().get(name).cloned()) {
                Some(group) => group.restricted_adapters(),
                None => None,
            }
        };

        match restriction {
            Some(names) => {
                for name in &names {
                    if !adapters.contains_key(name.as_ref()) {
                        return Err(ConfigurationError::InvalidAdapter {
                            adapter: name.to_string(),
                            metric: meta.qualified.to_string(),
                        });
                    }
                }
                Ok(adapters
                    .iter()
                    .filter(|(name, _)| names.iter().any(|wanted| wanted == *name))
                    .map(|(name, adapter)| (name.clone(), Arc::clone(adapter)))
                    .collect())
            }
            None => Ok(adapters
                .iter()
                .map(|(name, adapter)| (name.clone(), Arc::clone(adapter)))
                .collect()),
        }
    }

    /// Tag keys a metric's observations can carry: declared keys first, then
    /// the default-tag keys of the root and group scopes.
    pub(crate) fn tag_names_for(&self, meta: &MetricMeta) -> Vec<SharedString> {
        let mut names: Vec<SharedString> = meta.declared_tags.clone();
        let mut extend = |tags: &TagSet| {
            for label in tags.iter() {
                if !names.iter().any(|name| name.as_ref() == label.key()) {
                    names.push(label.0.clone());
                }
            }
        };
        extend(&self.default_tags.load());
        if let Some(name) = meta.group() {
            if let Some(group) = self.groups.load().get(name) {
                extend(&group.default_tags());
            }
        }
        names
    }

    pub(crate) fn ensure_group(&self, name: &SharedString) -> Group {
        if let Some(group) = self.groups.load().get(name.as_ref()) {
            return group.clone();
        }
        let _structural = self.structural.lock();
        self.ensure_group_locked(name)
    }

    fn ensure_group_locked(&self, name: &SharedString) -> Group {
        let current = self.groups.load();
        if let Some(group) = current.get(name.as_ref()) {
            return group.clone();
        }
        let mut updated = (**current).clone();
        drop(current);
        let group = Group::new(name.clone());
        updated.insert(name.clone(), group.clone());
        self.groups.store(Arc::new(updated));
        trace!(group = %name, "created metric group");
        group
    }

    pub(crate) fn default_tag_in(
        &self,
        group: Option<&SharedString>,
        key: SharedString,
        value: SharedString,
    ) {
        let _structural = self.structural.lock();
        match group {
            Some(name) => self.ensure_group_locked(name).set_default_tag(key, value),
            None => {
                let mut tags = (**self.default_tags.load()).clone();
                tags.insert(key, value);
                self.default_tags.store(Arc::new(tags));
            }
        }
    }

    pub(crate) fn restrict_group(&self, name: &SharedString, adapters: Vec<SharedString>) {
        let _structural = self.structural.lock();
        self.ensure_group_locked(name).restrict(adapters);
    }

    /// Inserts a declared metric, failing on a duplicate qualified name.
    /// `immediate` additionally registers it with its adapter scope, for
    /// declarations made after activation.
    pub(crate) fn declare(&self, metric: Metric, immediate: bool) -> Result<(), ConfigurationError> {
        {
            let _structural = self.structural.lock();
            let current = self.metrics.load();
            if current.contains_key(metric.meta().qualified.as_ref()) {
                return Err(ConfigurationError::DuplicateMetric {
                    name: metric.meta().qualified.to_string(),
                });
            }
            let mut updated = (**current).clone();
            drop(current);
            updated.insert(metric.meta().qualified.clone(), metric.clone());
            self.metrics.store(Arc::new(updated));
            if let Some(name) = metric.meta().group.clone() {
                let group = self.ensure_group_locked(&name);
                group.add_member(metric.meta().name.clone(), metric.clone());
            }
        }
        trace!(metric = %metric.meta().qualified, kind = %metric.kind(), "declared metric");
        if immediate {
            // Counted before the hooks run: the metric is in the map either
            // way, and there is no retry path that could deliver it later.
            self.state.lock().registered += 1;
            self.register_metric(&metric)?;
        }
        Ok(())
    }

    /// Calls the per-kind `register_*` hook on every adapter in the metric's
    /// scope.
    fn register_metric(&self, metric: &Metric) -> Result<(), ConfigurationError> {
        for (name, adapter) in self.adapter_scope(metric.meta())? {
            metric.register_with(&*adapter).map_err(|source| {
                ConfigurationError::AdapterRegistration {
                    adapter: name.to_string(),
                    metric: metric.qualified_name().to_string(),
                    source,
                }
            })?;
        }
        Ok(())
    }

    /// Registers every declared metric past the registration cursor with its
    /// adapter scope, in declaration order. The cursor advances as each
    /// metric's hooks are delivered, so a failed activation never repeats
    /// them on a later attempt.
    fn register_pending(&self) -> Result<(), ConfigurationError> {
        let metrics = self.metrics.load_full();
        let mut index = self.state.lock().registered;
        while let Some((_, metric)) = metrics.get_index(index) {
            self.register_metric(metric)?;
            index += 1;
            self.state.lock().registered = index;
        }
        Ok(())
    }

    pub(crate) fn add_collector(
        &self,
        callback: Box<dyn Fn() + Send + Sync>,
        location: &'static Location<'static>,
    ) {
        trace!(location = %location, "registered collector");
        self.collectors.lock().push(Arc::new(CollectorEntry { callback, location }));
    }
}

/// A process-wide metric registry.
///
/// The registry owns every declared metric, group, adapter, and default tag.
/// It is a cheap clonable handle: clones share state, so one registry can be
/// configured in `main` and handed to every component that records values.
///
/// Configuration is two-phase. [`configure`][Registry::configure] queues
/// declaration blocks without evaluating them; [`activate`][Registry::activate]
/// evaluates the queue in order and registers every declared metric with the
/// adapters in its scope. Because evaluation is deferred, declaration order
/// across modules does not matter: a default tag contributed by one crate
/// applies to metrics declared by another, whichever `configure` ran first.
/// After activation, further `configure` blocks are evaluated immediately.
#[derive(Clone)]
pub struct Registry {
    core: Arc<RegistryCore>,
}

impl Registry {
    /// Creates a registry, reading debug mode from the `TELEMARK_DEBUG`
    /// environment variable (`1`, `true`, `yes`, or `y`, case-insensitive).
    pub fn new() -> Self {
        let debug = match std::env::var("TELEMARK_DEBUG") {
            Ok(value) => debug_env_enabled(&value),
            Err(_) => false,
        };
        Self::with_debug(debug)
    }

    /// Creates a registry with debug self-instrumentation explicitly on or
    /// off, ignoring the environment.
    pub fn with_debug(debug: bool) -> Self {
        Registry {
            core: Arc::new(RegistryCore {
                metrics: ArcSwap::new(Arc::new(IndexMap::new())),
                groups: ArcSwap::new(Arc::new(IndexMap::new())),
                adapters: ArcSwap::new(Arc::new(IndexMap::new())),
                default_tags: ArcSwap::new(Arc::new(TagSet::new())),
                collectors: Mutex::new(Vec::new()),
                state: Mutex::new(ConfigState {
                    phase: Phase::Pending,
                    queue: Vec::new(),
                    registered: 0,
                    debug_queued: false,
                }),
                structural: Mutex::new(()),
                debug,
            }),
        }
    }

    /// Queues a configuration block, or evaluates it immediately if the
    /// registry is already activated.
    ///
    /// Queued blocks only run during [`activate`][Registry::activate], so
    /// errors inside them (unknown options, duplicate names) surface there,
    /// not here.
    pub fn configure<F>(&self, f: F) -> Result<(), Error>
    where
        F: FnOnce(&mut Configurator<'_>) -> Result<(), Error> + Send + 'static,
    {
        {
            let mut state = self.core.state.lock();
            match state.phase {
                Phase::Pending | Phase::Activating(_) => {
                    state.queue.push(Box::new(f));
                    trace!("queued configuration block");
                    return Ok(());
                }
                Phase::Configured(_) => {}
            }
        }
        let mut configurator = Configurator::new(&self.core, true);
        f(&mut configurator)
    }

    /// Evaluates all queued configuration blocks and registers every declared
    /// metric with the adapters in its scope.
    ///
    /// Blocks run in the order they were queued; blocks queued by a running
    /// block are picked up in the same drain. A second activation fails with
    /// [`AlreadyConfiguredError`] carrying the location of the first. If any
    /// block or adapter registration fails, the registry returns to the
    /// unconfigured state. Blocks evaluated before the failure stay
    /// consumed; blocks never evaluated remain queued for the next attempt.
    /// Metrics whose register hooks already ran are not re-registered by a
    /// retry.
    #[track_caller]
    pub fn activate(&self) -> Result<(), Error> {
        let origin = Location::caller();
        {
            let mut state = self.core.state.lock();
            match state.phase {
                Phase::Pending => state.phase = Phase::Activating(origin),
                Phase::Activating(first) | Phase::Configured(first) => {
                    return Err(AlreadyConfiguredError::new(first).into());
                }
            }
            if self.core.debug
                && !state.debug_queued
                && !self.core.metrics.load().contains_key(DEBUG_COLLECT_HISTOGRAM)
            {
                state.queue.push(Box::new(declare_self_instrumentation));
                state.debug_queued = true;
            }
        }

        debug!("activating metrics registry");
        let result = loop {
            let blocks = mem::take(&mut self.core.state.lock().queue);
            if !blocks.is_empty() {
                if let Err(error) = self.run_blocks(blocks) {
                    break Err(error);
                }
                continue;
            }
            if let Err(error) = self.core.register_pending() {
                break Err(Error::from(error));
            }
            let mut state = self.core.state.lock();
            if state.queue.is_empty() {
                state.phase = Phase::Configured(origin);
                break Ok(());
            }
        };

        match result {
            Ok(()) => {
                let metrics = self.core.metrics.load().len();
                debug!(origin = %origin, metrics, "metrics registry configured");
                Ok(())
            }
            Err(error) => {
                self.core.state.lock().phase = Phase::Pending;
                Err(error)
            }
        }
    }

    /// Evaluates `blocks` in order with a deferred-mode configurator. On
    /// failure, blocks that never ran go back to the front of the queue,
    /// ahead of anything queued while the batch was running.
    fn run_blocks(&self, blocks: Vec<ConfigBlock>) -> Result<(), Error> {
        let mut blocks = blocks.into_iter();
        while let Some(block) = blocks.next() {
            let mut configurator = Configurator::new(&self.core, false);
            if let Err(error) = block(&mut configurator) {
                let mut state = self.core.state.lock();
                let trailing = mem::take(&mut state.queue);
                state.queue = blocks.chain(trailing).collect();
                return Err(error);
            }
        }
        Ok(())
    }

    /// Registers `adapter` under `name`, overwriting any previous adapter
    /// with that name.
    ///
    /// Metrics whose register hooks have already run are registered with
    /// the new adapter retroactively when it is in their scope, so adapters
    /// can be wired up after activation. Metrics still waiting on
    /// activation reach the adapter through activation itself. In debug
    /// mode the adapter's [`enable_debug`][Adapter::enable_debug] hook runs
    /// once, here.
    pub fn register_adapter<A>(&self, name: impl Into<SharedString>, adapter: A) -> Result<(), Error>
    where
        A: Adapter + 'static,
    {
        let name = name.into();
        let adapter: Arc<dyn Adapter> = Arc::new(adapter);
        {
            let _structural = self.core.structural.lock();
            let mut adapters = (**self.core.adapters.load()).clone();
            adapters.insert(name.clone(), Arc::clone(&adapter));
            self.core.adapters.store(Arc::new(adapters));
        }
        if self.core.debug {
            adapter.enable_debug();
        }

        let metrics = self.core.metrics.load_full();
        let announced = self.core.state.lock().registered;
        for metric in metrics.values().take(announced) {
            let scope = self.core.adapter_scope(metric.meta())?;
            if scope.iter().any(|(in_scope, _)| *in_scope == name) {
                metric.register_with(&*adapter).map_err(|source| {
                    ConfigurationError::AdapterRegistration {
                        adapter: name.to_string(),
                        metric: metric.qualified_name().to_string(),
                        source,
                    }
                })?;
            }
        }
        debug!(adapter = %name, "registered adapter");
        Ok(())
    }

    /// Invokes every registered collector callback once.
    ///
    /// In debug mode each invocation is timed into the
    /// `telemark_collect_duration` histogram, tagged with the collector's
    /// registration site as `location = "file:line"`.
    pub fn collect_once(&self) -> Result<(), Error> {
        let collectors: Vec<Arc<CollectorEntry>> = self.core.collectors.lock().clone();
        trace!(collectors = collectors.len(), "running collectors");
        let timing =
            if self.core.debug { self.histogram(DEBUG_COLLECT_HISTOGRAM) } else { None };
        for entry in collectors {
            match &timing {
                Some(histogram) => {
                    let location = format!("{}:{}", entry.location.file(), entry.location.line());
                    histogram
                        .measure_with(crate::tags! { "location" => location }, || {
                            (entry.callback)()
                        })?;
                }
                None => (entry.callback)(),
            }
        }
        Ok(())
    }

    /// Clears every metric, group, adapter, default tag, collector, and
    /// queued configuration block, returning the registry to the
    /// unconfigured state.
    ///
    /// Intended for tests that need a clean slate between cases. Recorded
    /// [`TestAdapter`][crate::TestAdapter] state is owned by the adapter and
    /// has its own `reset`.
    pub fn reset_all(&self) {
        let _structural = self.core.structural.lock();
        let mut state = self.core.state.lock();
        self.core.metrics.store(Arc::new(IndexMap::new()));
        self.core.groups.store(Arc::new(IndexMap::new()));
        self.core.adapters.store(Arc::new(IndexMap::new()));
        self.core.default_tags.store(Arc::new(TagSet::new()));
        self.core.collectors.lock().clear();
        state.queue.clear();
        state.registered = 0;
        state.debug_queued = false;
        state.phase = Phase::Pending;
        debug!("metrics registry reset");
    }

    /// Declares a root-level default tag immediately, outside any
    /// configuration block.
    pub fn default_tag(&self, key: impl Into<SharedString>, value: impl Into<SharedString>) {
        self.core.default_tag_in(None, key.into(), value.into());
    }

    /// Resolves the tags an observation would carry: root defaults, `group`'s
    /// defaults, the thread-local overlay, then `tags`, later layers winning.
    pub fn resolve_tags(&self, group: Option<&str>, tags: impl Into<TagSet>) -> TagSet {
        self.core.resolve_tags(group, tags.into())
    }

    /// Looks up a metric of any kind by qualified name.
    pub fn metric(&self, qualified: &str) -> Option<Metric> {
        self.core.metrics.load().get(qualified).cloned()
    }

    /// Looks up a counter by qualified name. `None` if the name is unknown or
    /// names a different kind.
    pub fn counter(&self, qualified: &str) -> Option<Counter> {
        match self.metric(qualified)? {
            Metric::Counter(counter) => Some(counter),
            _ => None,
        }
    }

    /// Looks up a gauge by qualified name. `None` if the name is unknown or
    /// names a different kind.
    pub fn gauge(&self, qualified: &str) -> Option<Gauge> {
        match self.metric(qualified)? {
            Metric::Gauge(gauge) => Some(gauge),
            _ => None,
        }
    }

    /// Looks up a histogram by qualified name. `None` if the name is unknown
    /// or names a different kind.
    pub fn histogram(&self, qualified: &str) -> Option<Histogram> {
        match self.metric(qualified)? {
            Metric::Histogram(histogram) => Some(histogram),
            _ => None,
        }
    }

    /// Looks up a summary by qualified name. `None` if the name is unknown or
    /// names a different kind.
    pub fn summary(&self, qualified: &str) -> Option<Summary> {
        match self.metric(qualified)? {
            Metric::Summary(summary) => Some(summary),
            _ => None,
        }
    }

    /// Looks up a group by name.
    pub fn group(&self, name: &str) -> Option<Group> {
        self.core.groups.load().get(name).cloned()
    }

    /// Whether [`activate`][Registry::activate] has completed.
    pub fn configured(&self) -> bool {
        matches!(self.core.state.lock().phase, Phase::Configured(_))
    }

    /// Snapshot of the root default tags.
    pub fn default_tags(&self) -> TagSet {
        (**self.core.default_tags.load()).clone()
    }

    /// Qualified names of all declared metrics, in declaration order.
    pub fn metric_names(&self) -> Vec<SharedString> {
        self.core.metrics.load().keys().cloned().collect()
    }

    /// Names of all registered adapters, in registration order.
    pub fn adapter_names(&self) -> Vec<SharedString> {
        self.core.adapters.load().keys().cloned().collect()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("configured", &self.configured())
            .field("metrics", &self.metric_names())
            .field("adapters", &self.adapter_names())
            .finish_non_exhaustive()
    }
}

fn debug_env_enabled(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "y")
}

fn declare_self_instrumentation(c: &mut Configurator<'_>) -> Result<(), Error> {
    c.group(DEBUG_GROUP, |c| {
        c.histogram("collect_duration", |m| {
            m.comment("Time spent in each collector callback.")
                .unit("seconds")
                .per("collector")
                .tags(["location"])
                .buckets(COLLECT_BUCKETS)
        })?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::debugging::TestAdapter;
    use crate::errors::AdapterError;
    use crate::tags;
    use crate::tags::with_tags;

    #[test]
    fn tag_resolution_layers_scopes() {
        let registry = Registry::new();
        registry
            .configure(|c| {
                c.default_tag("env", "prod");
                c.default_tag("region", "us-east");
                c.group("http", |c| {
                    c.default_tag("env", "staging");
                    Ok(())
                })
            })
            .unwrap();
        registry.activate().unwrap();

        let resolved = with_tags(tags! { "build" => "42" }, || {
            registry.resolve_tags(Some("http"), tags! { "region" => "eu-west" })
        });
        assert_eq!(resolved.get("env"), Some("staging"));
        assert_eq!(resolved.get("region"), Some("eu-west"));
        assert_eq!(resolved.get("build"), Some("42"));
    }

    #[test]
    fn duplicate_declarations_fail_activation() {
        let registry = Registry::new();
        registry
            .configure(|c| {
                c.counter("restarts", |m| m)?;
                c.counter("restarts", |m| m)?;
                Ok(())
            })
            .unwrap();
        let error = registry.activate().unwrap_err();
        assert!(matches!(
            error,
            Error::Configuration(ConfigurationError::DuplicateMetric { .. })
        ));
        assert!(!registry.configured());
    }

    #[test]
    fn second_activation_reports_first_origin() {
        let registry = Registry::new();
        registry.activate().unwrap();
        match registry.activate().unwrap_err() {
            Error::Configuration(ConfigurationError::AlreadyConfigured(inner)) => {
                assert!(inner.origin().file().ends_with("registry.rs"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn failed_activation_reverts_to_pending() {
        let registry = Registry::new();
        registry
            .configure(|c| {
                c.histogram("latency", |m| m)?;
                Ok(())
            })
            .unwrap();
        assert!(registry.activate().is_err());
        assert!(!registry.configured());

        registry
            .configure(|c| {
                c.histogram("latency", |m| m.buckets([0.1, 1.0]))?;
                Ok(())
            })
            .unwrap();
        registry.activate().unwrap();
        assert!(registry.configured());
        assert!(registry.histogram("latency").is_some());
    }

    #[test]
    fn failed_activation_preserves_unevaluated_blocks() {
        let registry = Registry::new();
        registry
            .configure(|c| {
                c.histogram("latency", |m| m)?;
                Ok(())
            })
            .unwrap();
        registry
            .configure(|c| {
                c.counter("healthy", |m| m)?;
                Ok(())
            })
            .unwrap();

        // The bucket-less histogram fails before the second block runs.
        assert!(registry.activate().is_err());
        assert!(registry.counter("healthy").is_none());

        registry
            .configure(|c| {
                c.histogram("latency", |m| m.buckets([0.1, 1.0]))?;
                Ok(())
            })
            .unwrap();
        registry.activate().unwrap();
        assert!(registry.counter("healthy").is_some());
        assert!(registry.histogram("latency").is_some());
    }

    #[test]
    fn retried_activation_does_not_repeat_register_hooks() {
        struct CountingAdapter {
            registrations: Arc<AtomicUsize>,
        }

        impl Adapter for CountingAdapter {
            fn register_counter(&self, _: &Counter) -> Result<(), AdapterError> {
                self.registrations.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }

        let registrations = Arc::new(AtomicUsize::new(0));
        let registry = Registry::new();
        registry
            .register_adapter(
                "counting",
                CountingAdapter { registrations: Arc::clone(&registrations) },
            )
            .unwrap();
        registry
            .configure(|c| {
                c.counter("tracked", |m| m)?;
                c.counter("rejected", |m| m.adapter("later"))?;
                Ok(())
            })
            .unwrap();

        // The override naming an absent adapter fails the first attempt,
        // after the tracked counter's hook has already run.
        assert!(registry.activate().is_err());
        assert_eq!(registrations.load(Ordering::SeqCst), 1);

        registry.register_adapter("later", TestAdapter::new()).unwrap();
        registry.activate().unwrap();
        assert!(registry.configured());
        assert_eq!(registrations.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn blocks_queued_by_running_blocks_are_drained() {
        let registry = Registry::new();
        let reentrant = registry.clone();
        registry
            .configure(move |c| {
                c.counter("outer", |m| m)?;
                reentrant.configure(|c| {
                    c.counter("inner", |m| m)?;
                    Ok(())
                })?;
                Ok(())
            })
            .unwrap();
        registry.activate().unwrap();
        assert!(registry.counter("outer").is_some());
        assert!(registry.counter("inner").is_some());
    }

    #[test]
    fn debug_mode_declares_the_collect_histogram() {
        let registry = Registry::with_debug(true);
        let adapter = TestAdapter::new();
        registry.register_adapter("test", adapter.clone()).unwrap();
        registry
            .configure(|c| {
                c.collect(|| {});
                Ok(())
            })
            .unwrap();
        registry.activate().unwrap();

        let histogram = registry.histogram(DEBUG_COLLECT_HISTOGRAM).unwrap();
        assert_eq!(histogram.buckets(), &COLLECT_BUCKETS);
        assert_eq!(histogram.meta().group(), Some(DEBUG_GROUP));

        registry.collect_once().unwrap();
        let recorded = adapter.histograms();
        assert!(recorded.iter().any(|(name, tags, _)| {
            name.as_ref() == DEBUG_COLLECT_HISTOGRAM && tags.get("location").is_some()
        }));
    }

    #[test]
    fn debug_instrumentation_survives_a_failed_activation() {
        let registry = Registry::with_debug(true);
        registry
            .configure(|c| {
                c.histogram("latency", |m| m)?;
                Ok(())
            })
            .unwrap();
        assert!(registry.activate().is_err());

        registry
            .configure(|c| {
                c.histogram("latency", |m| m.buckets([0.1, 1.0]))?;
                Ok(())
            })
            .unwrap();
        registry.activate().unwrap();
        assert!(registry.histogram(DEBUG_COLLECT_HISTOGRAM).is_some());
        assert!(registry.histogram("latency").is_some());
    }

    #[test]
    fn reset_clears_everything() {
        let registry = Registry::new();
        registry.default_tag("env", "prod");
        registry
            .configure(|c| {
                c.counter("restarts", |m| m)?;
                Ok(())
            })
            .unwrap();
        registry.activate().unwrap();
        assert!(registry.configured());
        assert!(registry.counter("restarts").is_some());

        registry.reset_all();
        assert!(!registry.configured());
        assert!(registry.metric_names().is_empty());
        assert!(registry.adapter_names().is_empty());
        assert!(registry.default_tags().is_empty());

        registry.activate().unwrap();
        assert!(registry.configured());
    }

    #[test]
    fn debug_env_values_parse() {
        assert!(debug_env_enabled("1"));
        assert!(debug_env_enabled("TRUE"));
        assert!(debug_env_enabled("Yes"));
        assert!(debug_env_enabled("y"));
        assert!(!debug_env_enabled("0"));
        assert!(!debug_env_enabled("off"));
        assert!(!debug_env_enabled(""));
    }
}
