//! A metrics instrumentation core with tagged metrics, groups, and pluggable
//! adapter backends.
//!
//! `telemark` keeps one process-wide catalog of metrics and fans every
//! recorded value out to a set of backends, called adapters. Instrumented
//! code declares its metrics once, up front, with names, descriptions, and
//! tags; recording is then a cheap call on a typed handle, safe from any
//! thread.
//!
//! # Overview
//!
//! ## Metric kinds
//!
//! Four kinds are supported:
//!
//! - [`Counter`]: a monotonically increasing unsigned 64-bit total, such as
//!   requests served or jobs processed.
//! - [`Gauge`]: a floating-point value that goes up and down, such as queue
//!   depth or memory in use. Gauges can be set absolutely or moved by a
//!   delta; backends that only accept absolute values still work, because
//!   the core tracks the current value and falls back to an absolute write.
//! - [`Histogram`]: observations of a measurement, declared with the bucket
//!   bounds backends should use. A closure form times a block of code on the
//!   monotonic clock.
//! - [`Summary`]: like a histogram but without declared buckets; backends
//!   compute their own quantiles.
//!
//! ## Declaring metrics
//!
//! Declarations go through [`Registry::configure`], which accepts a block and
//! queues it without evaluating anything:
//!
//! ```
//! use telemark::Registry;
//!
//! let registry = Registry::new();
//! registry.configure(|c| {
//!     c.group("http", |c| {
//!         c.counter("requests_total", |m| m.comment("Requests served.").tags(["method"]))?;
//!         Ok(())
//!     })
//! }).unwrap();
//! ```
//!
//! Nothing exists until [`Registry::activate`] evaluates the queued blocks,
//! in order, and registers every declared metric with the adapters in its
//! scope. Deferring evaluation means declaration order across modules does
//! not matter: a default tag contributed by one crate's `configure` block
//! applies to metrics declared by another's, whichever ran first. After
//! activation, new `configure` blocks take effect immediately.
//!
//! Metrics declared inside a [`group`][Configurator::group] get the group
//! name as a prefix (`http_requests_total` above) and inherit the group's
//! default tags.
//!
//! ## Tags
//!
//! Every recorded value carries a [`TagSet`], resolved from four layers:
//! root default tags, the group's default tags, a thread-local overlay
//! installed by [`with_tags`], and the tags passed at the call site. Later
//! layers win on key conflicts. The resolved set is the identity of the
//! stored value and is what adapters receive.
//!
//! ## Adapters
//!
//! An [`Adapter`] is a backend: it gets a registration hook when a metric
//! becomes known to it and a write hook for every recorded value, in
//! registration order, synchronously. Hooks default to failing with
//! [`AdapterError::Unsupported`], so wiring a counter into a backend that
//! cannot handle counters fails loudly at registration instead of dropping
//! writes. Metrics can be scoped to particular adapters per group
//! ([`restrict_adapters`][Configurator::restrict_adapters]) or per metric
//! ([`adapter`][MetricBuilder::adapter]).
//!
//! The built-in [`TestAdapter`] records everything for assertions in tests.
//!
//! ## Collectors and debug mode
//!
//! [`collect`][Configurator::collect] registers callbacks that read values
//! on demand, typically to refresh gauges before an export;
//! [`Registry::collect_once`] runs them. With debug mode on (the
//! `TELEMARK_DEBUG` environment variable, or [`Registry::with_debug`]), the
//! registry times each collector into its own `telemark_collect_duration`
//! histogram, tagged with the collector's registration site.
//!
//! # Examples
//!
//! ```
//! use telemark::{tags, Registry, TestAdapter};
//!
//! let registry = Registry::new();
//!
//! registry.configure(|c| {
//!     c.default_tag("service", "worker");
//!     c.group("jobs", |c| {
//!         c.counter("processed_total", |m| {
//!             m.comment("Jobs pulled off the queue.").tags(["queue"])
//!         })?;
//!         c.histogram("run_duration", |m| {
//!             m.unit("seconds").buckets([0.01, 0.1, 1.0, 10.0])
//!         })?;
//!         Ok(())
//!     })
//! })?;
//!
//! let adapter = TestAdapter::new();
//! registry.register_adapter("test", adapter.clone())?;
//! registry.activate()?;
//!
//! let processed = registry.counter("jobs_processed_total").unwrap();
//! processed.increment(tags! { "queue" => "default" }, 1)?;
//!
//! let expected = tags! { "queue" => "default", "service" => "worker" };
//! assert_eq!(adapter.counter_value("jobs_processed_total", expected), Some(1));
//! # Ok::<(), telemark::Error>(())
//! ```
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg), deny(rustdoc::broken_intra_doc_links))]

mod adapter;
pub use self::adapter::{Adapter, HookSupport};

mod builder;
pub use self::builder::MetricBuilder;

mod config;
pub use self::config::Configurator;

mod debugging;
pub use self::debugging::TestAdapter;

mod errors;
pub use self::errors::{AdapterError, AlreadyConfiguredError, ConfigurationError, Error};

mod group;
pub use self::group::Group;

mod kind;
pub use self::kind::MetricKind;

mod label;
pub use self::label::{Label, SharedString};

mod macros;

mod metrics;
pub use self::metrics::{Counter, Gauge, Histogram, Metric, MetricMeta, Summary};

mod registry;
pub use self::registry::Registry;

mod storage;

mod tags;
pub use self::tags::{set_local_tags, with_tags, LocalTagsGuard, TagSet};
