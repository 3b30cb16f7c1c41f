//! [`AnyValue`] is the tagged input type behind [`Value::make`](super::Value::make):
//! Rust has no runtime type introspection, so rather than a universal
//! `make(anything)` entry point this crate asks the caller to build one of
//! these (directly, or via the provided `From` impls) and hands it to
//! `make`, which then dispatches on the tag.

/// A host-side value the caller assembles before handing it to
/// [`Value::make`](super::Value::make). Mirrors the six JSON kinds, plus a
/// recursive `Array`/`Object` shape so whole trees can be built in one call.
#[derive(Clone, Debug)]
pub enum AnyValue {
    /// Becomes a `null` value.
    Null,
    /// Becomes a `bool` value.
    Bool(bool),
    /// Becomes an integer-kind `number` value.
    Int(i64),
    /// Becomes a float-kind `number` value.
    Float(f64),
    /// Becomes a `string` value.
    Str(String),
    /// Becomes an `array` value; elements are converted recursively.
    Array(Vec<AnyValue>),
    /// Becomes an `object` value; entries are converted recursively.
    /// Duplicate keys keep the last occurrence, matching `set`'s
    /// replace-on-existing-key semantics.
    Object(Vec<(String, AnyValue)>),
}

impl From<bool> for AnyValue {
    fn from(b: bool) -> Self {
        AnyValue::Bool(b)
    }
}

impl From<i64> for AnyValue {
    fn from(i: i64) -> Self {
        AnyValue::Int(i)
    }
}

impl From<i32> for AnyValue {
    fn from(i: i32) -> Self {
        AnyValue::Int(i as i64)
    }
}

impl From<f64> for AnyValue {
    fn from(f: f64) -> Self {
        AnyValue::Float(f)
    }
}

impl From<&str> for AnyValue {
    fn from(s: &str) -> Self {
        AnyValue::Str(s.to_owned())
    }
}

impl From<String> for AnyValue {
    fn from(s: String) -> Self {
        AnyValue::Str(s)
    }
}

impl<T: Into<AnyValue>> From<Vec<T>> for AnyValue {
    fn from(items: Vec<T>) -> Self {
        AnyValue::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<AnyValue>> From<Option<T>> for AnyValue {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => AnyValue::Null,
        }
    }
}

impl<K: Into<String>, V: Into<AnyValue>> FromIterator<(K, V)> for AnyValue {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        AnyValue::Object(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
