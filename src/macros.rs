/// Builds a [`TagSet`][crate::TagSet] from `key => value` pairs.
///
/// Keys and values accept anything convertible into
/// [`SharedString`][crate::SharedString]; string literals are kept borrowed.
/// Later pairs overwrite earlier ones with the same key.
///
/// ```
/// use telemark::tags;
///
/// let tags = tags! { "method" => "GET", "status" => "200" };
/// assert_eq!(tags.get("method"), Some("GET"));
/// assert_eq!(tags.len(), 2);
/// assert!(tags! {}.is_empty());
/// ```
#[macro_export]
macro_rules! tags {
    () => {
        $crate::TagSet::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut tags = $crate::TagSet::new();
        $(
            tags.insert($key, $value);
        )+
        tags
    }};
}
