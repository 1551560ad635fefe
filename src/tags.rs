use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::slice::Iter;

use crate::label::{Label, SharedString};

thread_local! {
    static LOCAL_TAGS: RefCell<TagSet> = RefCell::new(TagSet::new());
}

/// A resolved set of tags attached to an observation.
///
/// A `TagSet` maps string keys to string values. It is the unit of identity
/// for recorded values: every metric keeps one cell per distinct `TagSet`, and
/// adapters receive the fully resolved `TagSet` alongside every write.
///
/// Equality and hashing are independent of insertion order: the set is kept
/// canonical (sorted by key, one entry per key), so two sets built from the
/// same pairs in different orders compare equal and hash identically.
/// Inserting a key that is already present replaces its value.
#[derive(PartialEq, Eq, Hash, Clone, Default, Debug)]
pub struct TagSet {
    labels: Vec<Label>,
}

impl TagSet {
    /// Creates an empty `TagSet`.
    pub const fn new() -> Self {
        TagSet { labels: Vec::new() }
    }

    /// Inserts a tag, replacing any existing value for the same key.
    pub fn insert<K, V>(&mut self, key: K, value: V)
    where
        K: Into<SharedString>,
        V: Into<SharedString>,
    {
        self.insert_label(Label::new(key, value));
    }

    /// Returns the value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.labels
            .binary_search_by(|probe| probe.key().cmp(key))
            .ok()
            .map(|idx| self.labels[idx].value())
    }

    /// Number of tags in the set.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Iterates the tags in key order.
    pub fn iter(&self) -> Iter<'_, Label> {
        self.labels.iter()
    }

    /// Iterates the tag keys in key order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(|label| label.key())
    }

    /// Merges `other` into this set, with `other` winning on key conflicts.
    pub fn merge(&mut self, other: TagSet) {
        if self.labels.is_empty() {
            self.labels = other.labels;
            return;
        }
        for label in other.labels {
            self.insert_label(label);
        }
    }

    fn insert_label(&mut self, label: Label) {
        match self.labels.binary_search_by(|probe| probe.key().cmp(label.key())) {
            Ok(idx) => self.labels[idx] = label,
            Err(idx) => self.labels.insert(idx, label),
        }
    }
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs = self
            .labels
            .iter()
            .map(|label| format!("{} = {}", label.key(), label.value()))
            .collect::<Vec<_>>();
        write!(f, "{{{}}}", pairs.join(", "))
    }
}

impl<L> FromIterator<L> for TagSet
where
    L: Into<Label>,
{
    fn from_iter<T: IntoIterator<Item = L>>(iter: T) -> Self {
        let mut tags = TagSet::new();
        for label in iter {
            tags.insert_label(label.into());
        }
        tags
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for TagSet
where
    K: Into<SharedString>,
    V: Into<SharedString>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl From<Vec<Label>> for TagSet {
    fn from(labels: Vec<Label>) -> Self {
        labels.into_iter().collect()
    }
}

impl<'a> IntoIterator for &'a TagSet {
    type Item = &'a Label;
    type IntoIter = Iter<'a, Label>;

    fn into_iter(self) -> Self::IntoIter {
        self.labels.iter()
    }
}

impl IntoIterator for TagSet {
    type Item = Label;
    type IntoIter = std::vec::IntoIter<Label>;

    fn into_iter(self) -> Self::IntoIter {
        self.labels.into_iter()
    }
}

/// Guard that restores the prior thread-local tag overlay when dropped.
///
/// Returned by [`set_local_tags`]. While the guard lives, every tag resolution
/// on the current thread sees the overlay it installed. Dropping the guard
/// restores whatever overlay was in place before, including during unwinding,
/// so a panic inside a [`with_tags`] scope cannot leak tags into unrelated
/// code running on the same thread afterwards.
pub struct LocalTagsGuard {
    prior: TagSet,
    // `PhantomData<*const ()>` makes this `!Send`, as the guard must restore
    // the overlay on the thread that installed it.
    _not_send: PhantomData<*const ()>,
}

impl LocalTagsGuard {
    fn new(tags: TagSet) -> Self {
        let prior = LOCAL_TAGS.with(|local| {
            let mut current = local.borrow_mut();
            let prior = current.clone();
            current.merge(tags);
            prior
        });
        LocalTagsGuard { prior, _not_send: PhantomData }
    }
}

impl Drop for LocalTagsGuard {
    fn drop(&mut self) {
        LOCAL_TAGS.with(|local| {
            *local.borrow_mut() = mem::take(&mut self.prior);
        });
    }
}

/// Merges `tags` into the thread-local overlay until the guard is dropped.
///
/// Prefer [`with_tags`] for block-scoped overrides; the guard form exists for
/// scopes that do not nest cleanly into a closure.
pub fn set_local_tags(tags: impl Into<TagSet>) -> LocalTagsGuard {
    LocalTagsGuard::new(tags.into())
}

/// Runs `f` with `tags` merged into the thread-local tag overlay.
///
/// The overlay applies to every tag resolution performed by the current thread
/// while `f` runs, and sits between group default tags and explicit call-site
/// tags in precedence. Calls nest: an inner `with_tags` merges onto whatever
/// the enclosing call established, and each scope restores the prior overlay
/// on exit, panic included.
///
/// ```
/// use telemark::{tags, with_tags, Registry};
///
/// let registry = Registry::new();
/// let resolved = with_tags(tags! { "request_id" => "42" }, || {
///     registry.resolve_tags(None, tags! { "path" => "/" })
/// });
/// assert_eq!(resolved.get("request_id"), Some("42"));
/// assert_eq!(resolved.get("path"), Some("/"));
/// ```
pub fn with_tags<F, R>(tags: impl Into<TagSet>, f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = LocalTagsGuard::new(tags.into());
    f()
}

/// Snapshot of the current thread's tag overlay.
pub(crate) fn local_tags() -> TagSet {
    LOCAL_TAGS.with(|local| local.borrow().clone())
}

#[cfg(test)]
mod tests {
    use super::{local_tags, set_local_tags, with_tags, TagSet};
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    fn hash_of(tags: &TagSet) -> u64 {
        let mut hasher = DefaultHasher::new();
        tags.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn equality_ignores_insertion_order() {
        let a = TagSet::from([("env", "prod"), ("region", "us-east"), ("zone", "b")]);
        let b = TagSet::from([("zone", "b"), ("env", "prod"), ("region", "us-east")]);
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn insert_replaces_existing_key() {
        let mut tags = TagSet::from([("env", "prod")]);
        tags.insert("env", "staging");
        assert_eq!(tags.len(), 1);
        assert_eq!(tags.get("env"), Some("staging"));
    }

    #[test]
    fn merge_prefers_other_on_conflict() {
        let mut base = TagSet::from([("env", "prod"), ("region", "us-east")]);
        base.merge(TagSet::from([("env", "staging"), ("build", "42")]));
        assert_eq!(base, TagSet::from([("env", "staging"), ("region", "us-east"), ("build", "42")]));
    }

    #[test]
    fn local_tags_nest_and_restore() {
        assert!(local_tags().is_empty());
        with_tags([("outer", "1")], || {
            assert_eq!(local_tags(), TagSet::from([("outer", "1")]));
            with_tags([("inner", "2")], || {
                assert_eq!(local_tags(), TagSet::from([("outer", "1"), ("inner", "2")]));
            });
            assert_eq!(local_tags(), TagSet::from([("outer", "1")]));
        });
        assert!(local_tags().is_empty());
    }

    #[test]
    fn local_tags_restore_on_panic() {
        let result = std::panic::catch_unwind(|| {
            with_tags([("doomed", "yes")], || {
                panic!("boom");
            })
        });
        assert!(result.is_err());
        assert!(local_tags().is_empty());
    }

    #[test]
    fn guard_form_restores_on_drop() {
        let guard = set_local_tags([("scoped", "1")]);
        assert_eq!(local_tags(), TagSet::from([("scoped", "1")]));
        drop(guard);
        assert!(local_tags().is_empty());
    }

    #[test]
    fn display_renders_sorted_pairs() {
        let tags = TagSet::from([("b", "2"), ("a", "1")]);
        assert_eq!(tags.to_string(), "{a = 1, b = 2}");
        assert_eq!(TagSet::new().to_string(), "{}");
    }

    mod properties {
        use super::super::TagSet;
        use quickcheck_macros::quickcheck;

        #[quickcheck]
        fn reversed_insertion_order_is_equal(pairs: Vec<(String, String)>) -> bool {
            let forward: TagSet = pairs.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            let backward: TagSet = pairs.iter().rev().map(|(k, v)| (k.clone(), v.clone())).collect();
            // Duplicate keys legitimately differ between orders (last write
            // wins), so only compare when keys are unique.
            let mut keys: Vec<_> = pairs.iter().map(|(k, _)| k.clone()).collect();
            keys.sort();
            keys.dedup();
            keys.len() != pairs.len() || forward == backward
        }
    }
}
