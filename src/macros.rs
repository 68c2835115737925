//! Literal construction of [`Value`](crate::Value) trees.

/// Builds a [`Value`](crate::Value) from JSON-like syntax.
///
/// Keys are string literals; any Rust expression implementing
/// `serde::Serialize` can appear in value position and is converted
/// through [`to_value`](crate::to_value).
///
/// ```rust
/// use laxjson::{json, write_value};
///
/// let v = json!({
///     "id": 7,
///     "tags": ["a", "b"],
///     "active": true,
/// });
/// assert_eq!(
///     write_value(&v).unwrap(),
///     r#"{"id":7,"tags":["a","b"],"active":true}"#
/// );
/// ```
#[macro_export]
macro_rules! json {
    (null) => {
        $crate::Value::Null
    };
    ([ $($elem:tt),* $(,)? ]) => {
        $crate::Value::Array(vec![$($crate::json!($elem)),*])
    };
    ({ $($key:literal : $value:tt),* $(,)? }) => {{
        #[allow(unused_mut)]
        let mut object = $crate::JsonMap::new();
        $(object.insert($key.to_string(), $crate::json!($value));)*
        $crate::Value::Object(object)
    }};
    ($other:expr) => {
        $crate::to_value(&$other).unwrap_or($crate::Value::Null)
    };
}
