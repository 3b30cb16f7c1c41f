//! RFC 6901 JSON Pointer evaluation against a [`Value`] tree.
//!
//! Token splitting, `~0`/`~1` unescaping, and traversal are all hand-rolled
//! here rather than routed through an external pointer crate: the grammar
//! is a five-line split-and-unescape, and traversal has to walk this
//! crate's own `Value` rather than a tree an external crate already knows
//! how to index.

use thiserror::Error;

use crate::value::Value;

/// An error encountered while resolving a JSON Pointer against a `Value`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PointerError {
    /// A segment named an object key that does not exist.
    #[error("no such member {0:?} at pointer segment {1}")]
    NoSuchKey(String, usize),
    /// A segment named an array index that is out of range, or was not a
    /// valid non-negative decimal integer.
    #[error("invalid or out-of-range array index {0:?} at pointer segment {1}")]
    BadIndex(String, usize),
    /// The cursor reached a scalar (null/bool/number/string) with more
    /// pointer segments still to traverse.
    #[error("cannot traverse into a {0} value at pointer segment {1}")]
    NotAContainer(&'static str, usize),
}

/// Splits a JSON Pointer string into its unescaped reference tokens.
/// The empty string yields zero tokens (pointer to the whole document);
/// a leading `/` is required for any non-empty pointer and is not itself
/// a token.
pub fn tokens(pointer: &str) -> Vec<String> {
    if pointer.is_empty() {
        return Vec::new();
    }
    let body = pointer.strip_prefix('/').unwrap_or(pointer);
    body.split('/').map(unescape_token).collect()
}

/// Reassembles tokens into an external pointer string (escaping `~` and
/// `/`), the inverse of [`tokens`].
pub fn from_tokens(tokens: &[String]) -> String {
    tokens.iter().map(|t| format!("/{}", escape_token(t))).collect()
}

pub(crate) fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

fn unescape_token(token: &str) -> String {
    // Order matters: unescape ~1 before ~0 would be wrong if done the other
    // way on a token like "~01" (must stay "~1", not become "/").
    let mut out = String::with_capacity(token.len());
    let mut chars = token.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '~' {
            match chars.peek() {
                Some('0') => {
                    out.push('~');
                    chars.next();
                }
                Some('1') => {
                    out.push('/');
                    chars.next();
                }
                _ => out.push('~'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Resolves `pointer` against `root`, returning the value at that path.
pub fn resolve(root: &Value, pointer: &str) -> Result<Value, PointerError> {
    let mut cursor = root.clone();
    for (i, token) in tokens(pointer).into_iter().enumerate() {
        cursor = step(&cursor, &token, i)?;
    }
    Ok(cursor)
}

fn step(cursor: &Value, token: &str, segment_index: usize) -> Result<Value, PointerError> {
    if cursor.is_object() {
        cursor
            .get(token)
            .ok_or_else(|| PointerError::NoSuchKey(token.to_string(), segment_index))
    } else if cursor.is_array() {
        let index: usize = token
            .parse()
            .map_err(|_| PointerError::BadIndex(token.to_string(), segment_index))?;
        if index >= cursor.len() {
            return Err(PointerError::BadIndex(token.to_string(), segment_index));
        }
        Ok(cursor.at(index))
    } else {
        Err(PointerError::NotAContainer(cursor.kind_name(), segment_index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_pointer_is_whole_document() {
        let doc = Value::object();
        doc.set("a", 1i64);
        assert_eq!(resolve(&doc, "").unwrap(), doc);
    }

    #[test]
    fn unescapes_tilde_and_slash() {
        let doc = Value::object();
        doc.set("a/b", 1i64);
        doc.set("c~d", 2i64);
        assert_eq!(resolve(&doc, "/a~1b").unwrap(), Value::number(1i64));
        assert_eq!(resolve(&doc, "/c~0d").unwrap(), Value::number(2i64));
    }

    #[test]
    fn traverses_arrays_by_decimal_index() {
        let arr = Value::array();
        arr.push("x");
        arr.push("y");
        assert_eq!(resolve(&arr, "/1").unwrap(), Value::string("y"));
    }

    #[test]
    fn out_of_range_index_is_an_error() {
        let arr = Value::array();
        arr.push("x");
        assert!(matches!(resolve(&arr, "/5"), Err(PointerError::BadIndex(_, 0))));
    }

    #[test]
    fn traversal_into_scalar_errors() {
        let doc = Value::object();
        doc.set("a", "scalar");
        assert!(matches!(resolve(&doc, "/a/b"), Err(PointerError::NotAContainer("string", 1))));
    }

    #[test]
    fn tokens_and_from_tokens_round_trip() {
        let p = "/a~1b/c~0d/3";
        let toks = tokens(p);
        assert_eq!(toks, vec!["a/b".to_string(), "c~d".to_string(), "3".to_string()]);
        assert_eq!(from_tokens(&toks), p);
    }
}
