use std::borrow::Cow;

/// An allocation-optimized string.
///
/// Tag keys, tag values, metric names, and the rest of the string metadata in
/// this crate are either `&'static str` literals or owned strings built at
/// declaration time, so they are stored as clone-on-write strings to avoid
/// copying static data.
pub type SharedString = Cow<'static, str>;

/// A single tag in the form of a key/value pair.
///
/// Every observation recorded through a metric carries a set of labels that
/// describe the context it was recorded in: the endpoint that handled a
/// request, the queue a job came from, the response code of an upstream call.
/// Labels are resolved from several layers (registry defaults, group defaults,
/// thread-local overrides, and call-site tags) before an observation is handed
/// to adapters; see [`TagSet`](crate::TagSet).
#[derive(PartialEq, Eq, Hash, Clone, Debug)]
pub struct Label(pub(crate) SharedString, pub(crate) SharedString);

impl Label {
    /// Creates a [`Label`] from a key and value.
    pub fn new<K, V>(key: K, value: V) -> Self
    where
        K: Into<SharedString>,
        V: Into<SharedString>,
    {
        Label(key.into(), value.into())
    }

    /// Creates a [`Label`] from a static key and value.
    pub const fn from_static_parts(key: &'static str, value: &'static str) -> Self {
        Label(Cow::Borrowed(key), Cow::Borrowed(value))
    }

    /// Key of this label.
    pub fn key(&self) -> &str {
        self.0.as_ref()
    }

    /// Value of this label.
    pub fn value(&self) -> &str {
        self.1.as_ref()
    }

    /// Consumes this [`Label`], returning the key and value.
    pub fn into_parts(self) -> (SharedString, SharedString) {
        (self.0, self.1)
    }
}

impl<K, V> From<(K, V)> for Label
where
    K: Into<SharedString>,
    V: Into<SharedString>,
{
    fn from(pair: (K, V)) -> Label {
        Label::new(pair.0, pair.1)
    }
}

impl<K, V> From<&(K, V)> for Label
where
    K: Into<SharedString> + Clone,
    V: Into<SharedString> + Clone,
{
    fn from(pair: &(K, V)) -> Label {
        Label::new(pair.0.clone(), pair.1.clone())
    }
}
