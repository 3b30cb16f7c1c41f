//! The structural merge engine behind [`Value::with`](super::Value::with).
//!
//! Merging two values of mismatched kind is a programmer error (there is
//! no sensible combination of a string and an array) and panics. Merging
//! two objects or two arrays combines them according to a set of per-path
//! policies: by default, objects overwrite member-by-member and arrays
//! append, but either can be switched to recursive merging, sorted/deduped
//! combination, and deep-copying of the incoming side.

use std::collections::BTreeMap;

use super::Value;

/// A single global flag, shorthand for a root-scoped [`PathPolicy`] that
/// sets only the one matching field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeFlag {
    /// Recurse into matching-kind object members instead of overwriting
    /// them wholesale.
    Merge,
    /// Deep-copy values taken from the `other` side instead of re-parenting
    /// them directly.
    Dup,
    /// Combine arrays by sorted union instead of plain append.
    Sort,
}

/// One option passed to [`Value::with`](super::Value::with): either a bare
/// global flag, or a policy scoped to specific paths.
#[derive(Clone, Debug)]
pub enum MergeOption {
    /// A root-scoped flag.
    Flag(MergeFlag),
    /// A policy scoped to one or more JSON-Pointer-style paths.
    Path(PathPolicy),
}

/// A merge policy that applies only at the given paths (JSON-Pointer
/// strings, relative to the value `with` was called on).
#[derive(Clone, Debug, Default)]
pub struct PathPolicy {
    /// The paths this policy applies to, e.g. `["/tags", "/children/0"]`.
    pub for_paths: Vec<String>,
    /// Recurse into matching-kind containers at this path rather than
    /// overwriting them wholesale.
    pub merge: bool,
    /// Deep-copy incoming values at this path.
    pub dup: bool,
    /// Combine arrays at this path by sorted union rather than append.
    pub sort: bool,
    /// When combining arrays by union (`sort`, or plain dedup), compare
    /// elements by the values at these pointers (relative to each element)
    /// rather than full structural equality.
    pub compare_by: Option<Vec<String>>,
}

#[derive(Default)]
struct CompiledPolicy {
    merge: bool,
    dup: bool,
    sort: bool,
    compare_by: Option<Vec<String>>,
}

fn compile(options: &[MergeOption]) -> BTreeMap<String, CompiledPolicy> {
    let mut map: BTreeMap<String, CompiledPolicy> = BTreeMap::new();
    let mut apply = |path: String, merge: bool, dup: bool, sort: bool, compare_by: Option<Vec<String>>| {
        let entry = map.entry(path).or_default();
        entry.merge |= merge;
        entry.dup |= dup;
        entry.sort |= sort;
        if compare_by.is_some() {
            entry.compare_by = compare_by;
        }
    };
    for option in options {
        match option {
            MergeOption::Flag(MergeFlag::Merge) => apply(String::new(), true, false, false, None),
            MergeOption::Flag(MergeFlag::Dup) => apply(String::new(), false, true, false, None),
            MergeOption::Flag(MergeFlag::Sort) => apply(String::new(), false, false, true, None),
            MergeOption::Path(policy) => {
                for path in &policy.for_paths {
                    apply(path.clone(), policy.merge, policy.dup, policy.sort, policy.compare_by.clone());
                }
            }
        }
    }
    map
}

pub(super) fn with(receiver: &Value, other: &Value, options: &[MergeOption]) -> Value {
    if receiver.kind_name() != other.kind_name() {
        panic!(
            "Value::with: mismatched kinds ({} vs {})",
            receiver.kind_name(),
            other.kind_name()
        );
    }
    let policies = compile(options);
    if receiver.is_object() {
        merge_objects(receiver, other, "", &policies);
    } else if receiver.is_array() {
        merge_arrays(receiver, other, "", &policies);
    } else {
        panic!("Value::with: kind {} has no merge behavior", receiver.kind_name());
    }
    receiver.clone()
}

fn merge_objects(a: &Value, b: &Value, path: &str, policies: &BTreeMap<String, CompiledPolicy>) {
    let policy = policies.get(path);
    let do_merge = policy.map_or(false, |p| p.merge);
    let do_dup = policy.map_or(false, |p| p.dup);

    for (key, b_val) in b.object_snapshot().expect("checked object kind above") {
        let child_path = format!("{path}/{}", crate::pointer::escape_token(&key));
        if do_merge {
            if let Some(a_val) = a.get(&key) {
                if a_val.kind_name() == b_val.kind_name() && a_val.is_object() {
                    merge_objects(&a_val, &b_val, &child_path, policies);
                    continue;
                }
                if a_val.kind_name() == b_val.kind_name() && a_val.is_array() {
                    merge_arrays(&a_val, &b_val, &child_path, policies);
                    continue;
                }
            }
        }
        let inserted = if do_dup { b_val.dup() } else { b_val };
        a.set(key, inserted);
    }
}

fn merge_arrays(a: &Value, b: &Value, path: &str, policies: &BTreeMap<String, CompiledPolicy>) {
    let policy = policies.get(path);
    let do_dup = policy.map_or(false, |p| p.dup);
    let do_sort = policy.map_or(false, |p| p.sort);
    let compare_by = policy.and_then(|p| p.compare_by.clone());

    let incoming = b.array_snapshot().expect("checked array kind above");

    if !do_sort && compare_by.is_none() {
        for item in incoming {
            a.push(if do_dup { item.dup() } else { item });
        }
        return;
    }

    for item in incoming {
        let already_present = a
            .array_snapshot()
            .expect("a is an array")
            .iter()
            .any(|existing| elements_equal(existing, &item, compare_by.as_deref()));
        if !already_present {
            a.push(if do_dup { item.dup() } else { item });
        }
    }

    if do_sort {
        sort_in_place(a, compare_by.as_deref());
    }
}

fn elements_equal(a: &Value, b: &Value, compare_by: Option<&[String]>) -> bool {
    match compare_by {
        None => a == b,
        Some(pointers) => pointers.iter().all(|p| sub(a, p) == sub(b, p)),
    }
}

fn sub(item: &Value, pointer: &str) -> Value {
    crate::pointer::resolve(item, pointer).unwrap_or_else(|_| Value::null())
}

fn sort_in_place(a: &Value, compare_by: Option<&[String]>) {
    let mut items = a.array_snapshot().expect("a is an array");
    items.sort_by_key(|item| sort_key(item, compare_by));
    for (i, item) in items.into_iter().enumerate() {
        a.set_at(i, item);
    }
}

fn sort_key(item: &Value, compare_by: Option<&[String]>) -> Vec<String> {
    match compare_by {
        None => vec![item.to_compact_string()],
        Some(pointers) => pointers.iter().map(|p| sub(item, p).to_compact_string()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_object_merge_overwrites_members() {
        let a = Value::object();
        a.set("x", 1i64);
        a.set("y", 1i64);
        let b = Value::object();
        b.set("y", 2i64);
        b.set("z", 3i64);
        a.with(&b, &[]);
        assert_eq!(a.get("x").unwrap(), Value::number(1i64));
        assert_eq!(a.get("y").unwrap(), Value::number(2i64));
        assert_eq!(a.get("z").unwrap(), Value::number(3i64));
    }

    #[test]
    fn default_array_merge_appends() {
        let a = Value::array();
        a.push(1i64);
        let b = Value::array();
        b.push(2i64);
        a.with(&b, &[]);
        assert_eq!(a.len(), 2);
        assert_eq!(a.at(1), Value::number(2i64));
    }

    #[test]
    fn merge_flag_recurses_into_nested_objects() {
        let a = Value::object();
        let inner_a = Value::object();
        inner_a.set("p", 1i64);
        a.set("inner", inner_a);

        let b = Value::object();
        let inner_b = Value::object();
        inner_b.set("q", 2i64);
        b.set("inner", inner_b);

        a.with(&b, &[MergeOption::Flag(MergeFlag::Merge)]);
        let inner = a.get("inner").unwrap();
        assert_eq!(inner.get("p").unwrap(), Value::number(1i64));
        assert_eq!(inner.get("q").unwrap(), Value::number(2i64));
    }

    #[test]
    fn mismatched_kinds_panic() {
        let a = Value::object();
        let b = Value::array();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| a.with(&b, &[])));
        assert!(result.is_err());
    }

    #[test]
    fn path_scoped_policy_only_applies_at_that_path() {
        let a = Value::object();
        let tags_a = Value::array();
        tags_a.push("x");
        a.set("tags", tags_a);
        let other_a = Value::array();
        other_a.push("p");
        a.set("other", other_a);

        let b = Value::object();
        let tags_b = Value::array();
        tags_b.push("x");
        tags_b.push("y");
        b.set("tags", tags_b);
        let other_b = Value::array();
        other_b.push("p");
        b.set("other", other_b);

        a.with(
            &b,
            &[MergeOption::Path(PathPolicy {
                for_paths: vec!["/tags".to_string()],
                sort: true,
                ..Default::default()
            })],
        );

        // "/tags" deduplicated under sort; "/other" fell back to plain
        // append since it wasn't named by any policy.
        assert_eq!(a.get("tags").unwrap().len(), 2);
        assert_eq!(a.get("other").unwrap().len(), 2);
    }

    #[test]
    fn dup_flag_deep_copies_incoming_values() {
        let a = Value::object();
        let b = Value::object();
        let nested = Value::object();
        nested.set("n", 1i64);
        b.set("child", nested.clone());

        a.with(&b, &[MergeOption::Flag(MergeFlag::Dup)]);
        let copied = a.get("child").unwrap();
        copied.set("n", 99i64);
        assert_eq!(nested.get("n").unwrap(), Value::number(1i64));
    }
}
