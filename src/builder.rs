//! Declaration-time option bag for metrics.

use crate::errors::ConfigurationError;
use crate::kind::MetricKind;
use crate::label::SharedString;
use crate::metrics::MetricMeta;

/// Options attached to a metric declaration.
///
/// All four kinds share one bag; each kind validates it against its own
/// catalog when the declaration is evaluated. Calling an option twice
/// overwrites the earlier value, except [`adapter`][MetricBuilder::adapter],
/// which accumulates into the override set.
///
/// ```
/// # use telemark::Registry;
/// let registry = Registry::new();
/// registry
///     .configure(|c| {
///         c.histogram("request_duration", |m| {
///             m.comment("Time spent serving a request.")
///                 .tags(["method", "status"])
///                 .unit("seconds")
///                 .buckets([0.005, 0.05, 0.5, 5.0])
///         })?;
///         Ok(())
///     })
///     .unwrap();
/// # registry.activate().unwrap();
/// ```
#[derive(Debug, Default)]
pub struct MetricBuilder {
    comment: Option<SharedString>,
    tags: Vec<SharedString>,
    unit: Option<SharedString>,
    per: Option<SharedString>,
    aggregation: Option<SharedString>,
    adapter: Vec<SharedString>,
    group: Option<SharedString>,
    buckets: Option<Vec<f64>>,
}

impl MetricBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Human-readable description of what the metric measures.
    pub fn comment(mut self, comment: impl Into<SharedString>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Tag keys observations of this metric are expected to carry.
    ///
    /// Declared tags are advisory: observations may always carry additional
    /// tags, and default tags of the enclosing scope are reported alongside
    /// the declared ones.
    pub fn tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<SharedString>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Unit the measured values are expressed in, such as `"seconds"`.
    pub fn unit(mut self, unit: impl Into<SharedString>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Denominator unit for rate-like metrics, such as `"request"`.
    pub fn per(mut self, per: impl Into<SharedString>) -> Self {
        self.per = Some(per.into());
        self
    }

    /// Hint for aggregating values reported by multiple processes.
    ///
    /// Passed through to adapters verbatim; the core does not interpret it.
    pub fn aggregation(mut self, aggregation: impl Into<SharedString>) -> Self {
        self.aggregation = Some(aggregation.into());
        self
    }

    /// Restricts this metric to the named adapter.
    ///
    /// Repeatable; each call appends to the override set. A non-empty
    /// override set takes precedence over any group-level restriction. The
    /// names are checked against registered adapters at dispatch time, not at
    /// declaration time, so adapters may be registered afterwards.
    pub fn adapter(mut self, adapter: impl Into<SharedString>) -> Self {
        self.adapter.push(adapter.into());
        self
    }

    /// Places the metric in `group`, overriding the ambient group of the
    /// enclosing configuration block.
    pub fn group(mut self, group: impl Into<SharedString>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Upper bounds of the histogram buckets.
    ///
    /// Required for histograms and not accepted by any other kind. The core
    /// does not bucket values itself; the bounds are metadata handed to
    /// adapters at registration time.
    pub fn buckets<I>(mut self, buckets: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        self.buckets = Some(buckets.into_iter().collect());
        self
    }

    /// Validates the bag against `kind`'s option catalog and splits it into
    /// declaration metadata plus the histogram buckets, if any.
    pub(crate) fn finish(
        self,
        kind: MetricKind,
        name: SharedString,
        ambient_group: Option<SharedString>,
    ) -> Result<(MetricMeta, Option<Vec<f64>>), ConfigurationError> {
        let group = self.group.or(ambient_group);
        let qualified = match &group {
            Some(group) => SharedString::from(format!("{group}_{name}")),
            None => name.clone(),
        };

        match kind {
            MetricKind::Histogram => {
                if self.buckets.is_none() {
                    return Err(ConfigurationError::MissingOption {
                        option: "buckets",
                        kind,
                        metric: qualified.into_owned(),
                    });
                }
            }
            _ => {
                if self.buckets.is_some() {
                    return Err(ConfigurationError::UnknownOption {
                        option: "buckets",
                        kind,
                        metric: qualified.into_owned(),
                    });
                }
            }
        }

        let meta = MetricMeta {
            name,
            group,
            qualified,
            comment: self.comment,
            declared_tags: self.tags,
            unit: self.unit,
            per: self.per,
            aggregation: self.aggregation,
            adapter: self.adapter,
        };
        Ok((meta, self.buckets))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buckets_rejected_for_non_histograms() {
        let result = MetricBuilder::new().buckets([1.0]).finish(
            MetricKind::Counter,
            "requests".into(),
            None,
        );
        assert!(matches!(
            result,
            Err(ConfigurationError::UnknownOption { option: "buckets", kind: MetricKind::Counter, .. })
        ));
    }

    #[test]
    fn histograms_require_buckets() {
        let result =
            MetricBuilder::new().finish(MetricKind::Histogram, "duration".into(), None);
        match result {
            Err(ConfigurationError::MissingOption { option, kind, metric }) => {
                assert_eq!(option, "buckets");
                assert_eq!(kind, MetricKind::Histogram);
                assert_eq!(metric, "duration");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn explicit_group_overrides_ambient() {
        let (meta, _) = MetricBuilder::new()
            .group("http")
            .finish(MetricKind::Counter, "requests".into(), Some("jobs".into()))
            .unwrap();
        assert_eq!(meta.group(), Some("http"));
        assert_eq!(meta.qualified_name(), "http_requests");
    }

    #[test]
    fn ambient_group_qualifies_the_name() {
        let (meta, _) = MetricBuilder::new()
            .finish(MetricKind::Gauge, "depth".into(), Some("queue".into()))
            .unwrap();
        assert_eq!(meta.qualified_name(), "queue_depth");
    }

    #[test]
    fn ungrouped_names_stay_bare() {
        let (meta, _) =
            MetricBuilder::new().finish(MetricKind::Counter, "restarts".into(), None).unwrap();
        assert_eq!(meta.group(), None);
        assert_eq!(meta.qualified_name(), "restarts");
    }

    #[test]
    fn adapter_calls_accumulate() {
        let (meta, _) = MetricBuilder::new()
            .adapter("prometheus")
            .adapter("statsd")
            .finish(MetricKind::Counter, "requests".into(), None)
            .unwrap();
        assert_eq!(meta.adapter_override(), &["prometheus", "statsd"]);
    }

    #[test]
    fn later_writes_win() {
        let (meta, buckets) = MetricBuilder::new()
            .comment("first")
            .comment("second")
            .buckets([1.0])
            .buckets([2.0, 3.0])
            .finish(MetricKind::Histogram, "duration".into(), None)
            .unwrap();
        assert_eq!(meta.comment(), Some("second"));
        assert_eq!(buckets.unwrap(), vec![2.0, 3.0]);
    }
}
