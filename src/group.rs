use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use indexmap::IndexMap;

use crate::label::SharedString;
use crate::metrics::Metric;
use crate::tags::TagSet;

/// A named namespace of metrics.
///
/// Groups contribute two things to the metrics declared inside them: their
/// name prefixes the qualified metric name (`{group}_{name}`), and their
/// default tags are merged over the root default tags whenever one of their
/// metrics resolves an observation. A group can also restrict its metrics to
/// a subset of the registered adapters.
///
/// `Group` is a cheap read-only handle; groups are created and mutated
/// through the configuration DSL.
#[derive(Clone)]
pub struct Group {
    inner: Arc<GroupInner>,
}

struct GroupInner {
    name: SharedString,
    default_tags: ArcSwap<TagSet>,
    restriction: ArcSwap<Option<Vec<SharedString>>>,
    members: ArcSwap<IndexMap<SharedString, Metric>>,
}

impl Group {
    pub(crate) fn new(name: SharedString) -> Self {
        Group {
            inner: Arc::new(GroupInner {
                name,
                default_tags: ArcSwap::new(Arc::new(TagSet::new())),
                restriction: ArcSwap::new(Arc::new(None)),
                members: ArcSwap::new(Arc::new(IndexMap::new())),
            }),
        }
    }

    /// Name of this group.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Snapshot of the group's default tags.
    pub fn default_tags(&self) -> TagSet {
        (**self.inner.default_tags.load()).clone()
    }

    /// Adapter names this group is restricted to, or `None` when its metrics
    /// go to every registered adapter.
    pub fn restricted_adapters(&self) -> Option<Vec<SharedString>> {
        (**self.inner.restriction.load()).clone()
    }

    /// Looks up a member metric by its bare (unqualified) name.
    pub fn metric(&self, name: &str) -> Option<Metric> {
        self.inner.members.load().get(name).cloned()
    }

    /// Bare names of the group's metrics, in declaration order.
    pub fn metric_names(&self) -> Vec<SharedString> {
        self.inner.members.load().keys().cloned().collect()
    }

    // Writers are serialized by the registry's structural lock.

    pub(crate) fn set_default_tag(&self, key: SharedString, value: SharedString) {
        let mut tags = (**self.inner.default_tags.load()).clone();
        tags.insert(key, value);
        self.inner.default_tags.store(Arc::new(tags));
    }

    pub(crate) fn restrict(&self, adapters: Vec<SharedString>) {
        self.inner.restriction.store(Arc::new(Some(adapters)));
    }

    pub(crate) fn add_member(&self, name: SharedString, metric: Metric) {
        let mut members = (**self.inner.members.load()).clone();
        members.insert(name, metric);
        self.inner.members.store(Arc::new(members));
    }
}

impl fmt::Debug for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("name", &self.inner.name)
            .field("default_tags", &self.inner.default_tags.load())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tags_accumulate() {
        let group = Group::new("http".into());
        assert!(group.default_tags().is_empty());

        group.set_default_tag("env".into(), "prod".into());
        group.set_default_tag("region".into(), "us-east".into());
        assert_eq!(group.default_tags(), TagSet::from([("env", "prod"), ("region", "us-east")]));

        group.set_default_tag("env".into(), "staging".into());
        assert_eq!(group.default_tags().get("env"), Some("staging"));
    }

    #[test]
    fn restriction_starts_unset() {
        let group = Group::new("http".into());
        assert_eq!(group.restricted_adapters(), None);

        group.restrict(vec!["prometheus".into()]);
        assert_eq!(group.restricted_adapters(), Some(vec!["prometheus".into()]));
    }
}
