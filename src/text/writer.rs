//! Compact JSON serialization, plus a length-bounded variant for
//! logging/diagnostics.

use crate::value::Value;

const MAX_BMP: u32 = 0xFFFF;

/// Whether `c` must be escaped on output, beyond the mandatory `"` and `\`.
fn needs_escape(c: char) -> bool {
    let cp = c as u32;
    cp < 0x20
        || c == '/'
        || matches!(cp, 0x2028 | 0x2029)
        || (0x7F..=0x9F).contains(&cp)
        || cp > MAX_BMP
}

fn write_escaped_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '/' => out.push_str("\\/"),
            '\u{0008}' => out.push_str("\\b"),
            '\u{000C}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if needs_escape(c) => push_unicode_escape(out, c),
            c => out.push(c),
        }
    }
    out.push('"');
}

fn push_unicode_escape(out: &mut String, c: char) {
    let cp = c as u32;
    if cp <= MAX_BMP {
        out.push_str(&format!("\\u{cp:04x}"));
    } else {
        // Supplementary plane: re-split into the UTF-16 surrogate pair the
        // writer is required to emit explicitly.
        let v = cp - 0x10000;
        let high = 0xD800 + (v >> 10);
        let low = 0xDC00 + (v & 0x3FF);
        out.push_str(&format!("\\u{high:04x}\\u{low:04x}"));
    }
}

/// Compact serialization: no insignificant whitespace.
pub fn write_compact(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

fn write_value(out: &mut String, value: &Value) {
    if value.is_null() {
        out.push_str("null");
    } else if value.is_bool() {
        out.push_str(if value.as_bool_internal().unwrap() { "true" } else { "false" });
    } else if value.is_number() {
        out.push_str(&value.as_num_internal().unwrap().to_string());
    } else if value.is_string() {
        write_escaped_string(out, &value.as_str_internal().unwrap());
    } else if value.is_array() {
        out.push('[');
        for (i, item) in value.array_snapshot().unwrap().iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            write_value(out, item);
        }
        out.push(']');
    } else if value.is_object() {
        out.push('{');
        for (i, (key, val)) in value.object_snapshot().unwrap().iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            write_escaped_string(out, key);
            out.push(':');
            write_value(out, val);
        }
        out.push('}');
    }
}

/// Serialization truncated once the running length would exceed
/// `max_chars`: remaining elements of the array/object being emitted at
/// the truncation point are dropped and `...` is appended in their place.
pub fn write_bounded(value: &Value, max_chars: usize) -> String {
    let mut w = BoundedWriter { out: String::new(), max: max_chars, truncated: false };
    w.write(value);
    w.out
}

struct BoundedWriter {
    out: String,
    max: usize,
    truncated: bool,
}

impl BoundedWriter {
    fn over_budget(&self) -> bool {
        self.out.chars().count() > self.max
    }

    fn truncate(&mut self) {
        if !self.truncated {
            self.truncated = true;
            self.out.push_str("...");
        }
    }

    fn write(&mut self, value: &Value) {
        if self.truncated {
            return;
        }
        if self.over_budget() {
            self.truncate();
            return;
        }
        if value.is_array() {
            self.out.push('[');
            for (i, item) in value.array_snapshot().unwrap().iter().enumerate() {
                if self.truncated {
                    break;
                }
                if self.over_budget() {
                    self.truncate();
                    break;
                }
                if i > 0 {
                    self.out.push(',');
                }
                self.write(item);
            }
            if !self.truncated {
                self.out.push(']');
            }
        } else if value.is_object() {
            self.out.push('{');
            for (i, (key, val)) in value.object_snapshot().unwrap().iter().enumerate() {
                if self.truncated {
                    break;
                }
                if self.over_budget() {
                    self.truncate();
                    break;
                }
                if i > 0 {
                    self.out.push(',');
                }
                write_escaped_string(&mut self.out, key);
                self.out.push(':');
                self.write(val);
            }
            if !self.truncated {
                self.out.push('}');
            }
        } else {
            write_value(&mut self.out, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_forward_slash_and_control_chars() {
        let v = Value::string("a/b\nc");
        assert_eq!(write_compact(&v), r#""a\/b\nc""#);
    }

    #[test]
    fn escapes_line_and_paragraph_separators() {
        let v = Value::string("\u{2028}\u{2029}");
        assert_eq!(write_compact(&v), "\"\\u2028\\u2029\"");
    }

    #[test]
    fn supplementary_code_point_round_trips_as_surrogate_pair() {
        let v = Value::string("\u{1F600}");
        let text = write_compact(&v);
        assert_eq!(text, "\"\\ud83d\\ude00\"");
        let parsed = crate::text::reader::parse(&text).unwrap();
        assert_eq!(parsed, v);
    }

    #[test]
    fn object_members_serialize_in_stable_key_order() {
        let obj = Value::object();
        obj.set("b", 2i64);
        obj.set("a", 1i64);
        assert_eq!(write_compact(&obj), r#"{"a":1,"b":2}"#);
    }

    #[test]
    fn bounded_output_truncates_with_ellipsis() {
        let arr = Value::array();
        for i in 0..50i64 {
            arr.push(i);
        }
        let text = write_bounded(&arr, 10);
        assert!(text.ends_with("..."));
        assert!(text.len() < write_compact(&arr).len());
    }

    #[test]
    fn bounded_output_under_budget_is_unaffected() {
        let v = Value::number(42i64);
        assert_eq!(write_bounded(&v, 100), "42");
    }
}
