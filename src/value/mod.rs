//! The dynamic JSON value: a single, uniformly-typed handle that can be any
//! of the six JSON kinds, with a mutable-container contract (arrays and
//! objects can be built up in place) and a non-owning parent back-pointer.
//!
//! A [`Value`] is a cheap-to-clone handle (`Rc`-backed) around a shared,
//! interior-mutable node. Cloning a `Value` clones the handle, not the
//! tree — use [`Value::dup`] for a real deep copy.

mod any;
mod factory;
mod merge;
pub(crate) mod number;

pub use any::AnyValue;
pub use factory::{
    current_factory, set_global_factory, with_thread_local_factory, DefaultFactory, Factory,
};
pub use merge::{MergeFlag, MergeOption, PathPolicy};
pub use number::Num;

use std::cell::{Ref, RefCell, RefMut};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

thread_local! {
    static NULL_SINGLETON: Rc<Node> = Rc::new(Node {
        parent: RefCell::new(None),
        kind: RefCell::new(Kind::Null),
    });
}

struct Node {
    parent: RefCell<Option<Weak<Node>>>,
    kind: RefCell<Kind>,
}

/// The runtime tag and payload of a [`Value`].
///
/// `pub(crate)` rather than public: external callers interact with `Value`
/// through its navigation/mutation methods, not by matching on the
/// representation directly.
pub(crate) enum Kind {
    Null,
    Bool(bool),
    Number(Num),
    String(String),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

impl Kind {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Kind::Null => "null",
            Kind::Bool(_) => "boolean",
            Kind::Number(_) => "number",
            Kind::String(_) => "string",
            Kind::Array(_) => "array",
            Kind::Object(_) => "object",
        }
    }
}

/// A handle to a JSON value of exactly one of the six kinds.
#[derive(Clone)]
pub struct Value(Rc<Node>);

/// Opaque identity of a `Value`'s underlying node, suitable as a hash-map
/// key for identity-keyed caches (schema compilation, `$ref` expansion).
/// Two `Value` handles produce the same `ValueId` iff they are clones of
/// the same handle — never merely structurally equal.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ValueId(usize);

impl Value {
    fn new(kind: Kind) -> Value {
        Value(Rc::new(Node {
            parent: RefCell::new(None),
            kind: RefCell::new(kind),
        }))
    }

    /// The shared `null` value. All `null`s in a thread are the same
    /// handle; `null` never reports a parent, since the same handle may
    /// simultaneously sit in many containers.
    pub fn null() -> Value {
        Value(NULL_SINGLETON.with(Rc::clone))
    }

    /// Builds a `bool` value.
    pub fn bool(b: bool) -> Value {
        Value::new(Kind::Bool(b))
    }

    /// Builds a `number` value from anything that converts to [`Num`]
    /// (`i64`, `u64`, `i32`, `f64`, or a [`Num`] itself).
    pub fn number(n: impl Into<Num>) -> Value {
        Value::new(Kind::Number(n.into()))
    }

    /// Builds a `string` value.
    pub fn string(s: impl Into<String>) -> Value {
        Value::new(Kind::String(s.into()))
    }

    /// Builds an empty `array` value.
    pub fn array() -> Value {
        Value::new(Kind::Array(Vec::new()))
    }

    /// Builds an empty `object` value.
    pub fn object() -> Value {
        Value::new(Kind::Object(BTreeMap::new()))
    }

    /// The construction seam: builds a value from a host-assembled
    /// [`AnyValue`], dispatching through the currently active [`Factory`]
    /// (thread-local override, else the process-wide factory, else
    /// [`DefaultFactory`]).
    pub fn make(x: impl Into<AnyValue>) -> Value {
        factory::make(x.into())
    }

    /// Opaque per-node identity, for identity-keyed caches.
    pub fn identity(&self) -> ValueId {
        ValueId(Rc::as_ptr(&self.0) as usize)
    }

    /// The name of this value's kind: `"null"`, `"boolean"`, `"number"`,
    /// `"string"`, `"array"`, or `"object"`.
    pub fn kind_name(&self) -> &'static str {
        self.borrow_kind().name()
    }

    /// True iff this is the `null` kind.
    pub fn is_null(&self) -> bool {
        matches!(*self.borrow_kind(), Kind::Null)
    }

    /// True iff this is the `bool` kind.
    pub fn is_bool(&self) -> bool {
        matches!(*self.borrow_kind(), Kind::Bool(_))
    }

    /// True iff this is the `number` kind.
    pub fn is_number(&self) -> bool {
        matches!(*self.borrow_kind(), Kind::Number(_))
    }

    /// True iff this is the `string` kind.
    pub fn is_string(&self) -> bool {
        matches!(*self.borrow_kind(), Kind::String(_))
    }

    /// True iff this is the `array` kind.
    pub fn is_array(&self) -> bool {
        matches!(*self.borrow_kind(), Kind::Array(_))
    }

    /// True iff this is the `object` kind.
    pub fn is_object(&self) -> bool {
        matches!(*self.borrow_kind(), Kind::Object(_))
    }

    /// The enclosing container, if this value currently sits in one.
    /// Always `None` for `null` (see [`Value::null`]).
    pub fn up(&self) -> Option<Value> {
        self.0
            .parent
            .borrow()
            .as_ref()
            .and_then(Weak::upgrade)
            .map(Value)
    }

    /// Number of elements (array) or members (object). Panics for other
    /// kinds, since "length" is not meaningful for a scalar.
    pub fn len(&self) -> usize {
        match &*self.borrow_kind() {
            Kind::Array(items) => items.len(),
            Kind::Object(map) => map.len(),
            other => panic!("Value::len: not an array or object (found {})", other.name()),
        }
    }

    /// True iff `len() == 0`.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // -- array navigation/mutation -----------------------------------

    /// The element at `index`. Panics if this is not an array, or if
    /// `index` is out of range (mirrors `Vec`/slice indexing panics).
    pub fn at(&self, index: usize) -> Value {
        match &*self.borrow_kind() {
            Kind::Array(items) => items.get(index).cloned().unwrap_or_else(|| {
                panic!("Value::at({index}): index out of range (len {})", items.len())
            }),
            other => panic!("Value::at({index}): not an array (found {})", other.name()),
        }
    }

    /// Appends `value` to the end of this array, re-parenting it.
    /// Panics if this is not an array.
    pub fn push(&self, value: impl Into<Value>) -> &Value {
        let value = value.into();
        match &mut *self.borrow_kind_mut() {
            Kind::Array(items) => items.push(value.clone()),
            other => panic!("Value::push: not an array (found {})", other.name()),
        }
        attach_child(&self.0, &value);
        self
    }

    /// Replaces the element at `index`, re-parenting the new value and
    /// detaching the old one. Panics if this is not an array or `index`
    /// is out of range.
    pub fn set_at(&self, index: usize, value: impl Into<Value>) -> &Value {
        let value = value.into();
        let old = match &mut *self.borrow_kind_mut() {
            Kind::Array(items) => {
                if index >= items.len() {
                    panic!("Value::set_at({index}): index out of range (len {})", items.len());
                }
                std::mem::replace(&mut items[index], value.clone())
            }
            other => panic!("Value::set_at({index}): not an array (found {})", other.name()),
        };
        detach_child(&old);
        attach_child(&self.0, &value);
        self
    }

    /// Removes the first element structurally equal to `value`. Returns
    /// `true` if an element was removed. Panics if this is not an array.
    pub fn remove_eq(&self, value: &Value) -> bool {
        let removed = match &mut *self.borrow_kind_mut() {
            Kind::Array(items) => {
                if let Some(pos) = items.iter().position(|v| v == value) {
                    Some(items.remove(pos))
                } else {
                    None
                }
            }
            other => panic!("Value::remove_eq: not an array (found {})", other.name()),
        };
        if let Some(removed) = &removed {
            detach_child(removed);
        }
        removed.is_some()
    }

    /// Removes the element at `index` without returning it. Panics if this
    /// is not an array or `index` is out of range.
    pub fn delete_at(&self, index: usize) {
        self.take_at(index);
    }

    /// Removes and returns the element at `index`. Panics if this is not
    /// an array or `index` is out of range.
    pub fn take_at(&self, index: usize) -> Value {
        let removed = match &mut *self.borrow_kind_mut() {
            Kind::Array(items) => {
                if index >= items.len() {
                    panic!("Value::take_at({index}): index out of range (len {})", items.len());
                }
                items.remove(index)
            }
            other => panic!("Value::take_at({index}): not an array (found {})", other.name()),
        };
        detach_child(&removed);
        removed
    }

    // -- object navigation/mutation ------------------------------------

    /// The value stored under `key`, or `None` if absent. Never panics for
    /// a missing key; panics if this is not an object.
    pub fn get(&self, key: &str) -> Option<Value> {
        match &*self.borrow_kind() {
            Kind::Object(map) => map.get(key).cloned(),
            other => panic!("Value::get({key:?}): not an object (found {})", other.name()),
        }
    }

    /// Whether `key` is present. Panics if this is not an object.
    pub fn has(&self, key: &str) -> bool {
        match &*self.borrow_kind() {
            Kind::Object(map) => map.contains_key(key),
            other => panic!("Value::has({key:?}): not an object (found {})", other.name()),
        }
    }

    /// Inserts or replaces the value under `key`, re-parenting it and
    /// detaching whatever value it replaced. Panics if this is not an
    /// object.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> &Value {
        let key = key.into();
        let value = value.into();
        let old = match &mut *self.borrow_kind_mut() {
            Kind::Object(map) => map.insert(key, value.clone()),
            other => panic!("Value::set: not an object (found {})", other.name()),
        };
        if let Some(old) = &old {
            detach_child(old);
        }
        attach_child(&self.0, &value);
        self
    }

    /// Removes `key` without returning its value. Panics if this is not
    /// an object.
    pub fn delete(&self, key: &str) {
        self.take(key);
    }

    /// Removes and returns the value under `key`, if present. Panics if
    /// this is not an object.
    pub fn take(&self, key: &str) -> Option<Value> {
        let removed = match &mut *self.borrow_kind_mut() {
            Kind::Object(map) => map.remove(key),
            other => panic!("Value::take({key:?}): not an object (found {})", other.name()),
        };
        if let Some(removed) = &removed {
            detach_child(removed);
        }
        removed
    }

    /// Returns the value under `key`, inserting `default` first if absent.
    /// A mutating read: calling this twice with the same `default` returns
    /// the same stored value both times. Panics if this is not an object.
    pub fn get_or_insert(&self, key: impl Into<String>, default: impl Into<Value>) -> Value {
        let key = key.into();
        if let Some(existing) = self.get(&key) {
            return existing;
        }
        let default = default.into();
        self.set(key, default.clone());
        default
    }

    // -- bulk ------------------------------------------------------------

    /// Deep-copies this value. The copy shares no nodes with the
    /// original, has no parent anywhere in it, and may be freely inserted
    /// into any container (including one already holding the original).
    pub fn dup(&self) -> Value {
        match &*self.borrow_kind() {
            Kind::Null => Value::null(),
            Kind::Bool(b) => Value::bool(*b),
            Kind::Number(n) => Value::number(n.clone()),
            Kind::String(s) => Value::string(s.clone()),
            Kind::Array(items) => {
                let out = Value::array();
                for item in items {
                    out.push(item.dup());
                }
                out
            }
            Kind::Object(map) => {
                let out = Value::object();
                for (k, v) in map {
                    out.set(k.clone(), v.dup());
                }
                out
            }
        }
    }

    /// Structural merge with `other`; see [`merge::with`](merge) for the
    /// full per-path policy semantics.
    pub fn with(&self, other: &Value, options: &[MergeOption]) -> Value {
        merge::with(self, other, options)
    }

    // -- crate-internal accessors for the reader/writer/pointer/schema --

    pub(crate) fn borrow_kind(&self) -> Ref<'_, Kind> {
        self.0.kind.borrow()
    }

    pub(crate) fn borrow_kind_mut(&self) -> RefMut<'_, Kind> {
        self.0.kind.borrow_mut()
    }

    pub(crate) fn as_bool_internal(&self) -> Option<bool> {
        match &*self.borrow_kind() {
            Kind::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub(crate) fn as_num_internal(&self) -> Option<Num> {
        match &*self.borrow_kind() {
            Kind::Number(n) => Some(n.clone()),
            _ => None,
        }
    }

    pub(crate) fn as_str_internal(&self) -> Option<String> {
        match &*self.borrow_kind() {
            Kind::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    pub(crate) fn array_snapshot(&self) -> Option<Vec<Value>> {
        match &*self.borrow_kind() {
            Kind::Array(items) => Some(items.clone()),
            _ => None,
        }
    }

    pub(crate) fn object_snapshot(&self) -> Option<BTreeMap<String, Value>> {
        match &*self.borrow_kind() {
            Kind::Object(map) => Some(map.clone()),
            _ => None,
        }
    }

    /// Compact serialization (no insignificant whitespace).
    pub fn to_compact_string(&self) -> String {
        crate::text::writer::write_compact(self)
    }

    /// Serialization truncated once the running length would exceed
    /// `max_chars`, with `...` appended at the truncation point.
    pub fn to_bounded_string(&self, max_chars: usize) -> String {
        crate::text::writer::write_bounded(self, max_chars)
    }

    /// JSON-with-padding: `"name(" + to_compact_string() + ");"`, or just
    /// the plain serialization when `name` is empty.
    pub fn to_padded_string(&self, name: &str) -> String {
        if name.is_empty() {
            self.to_compact_string()
        } else {
            format!("{name}({});", self.to_compact_string())
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Value {
        Value::bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Value {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Value {
        Value::string(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Value {
        Value::number(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Value {
        Value::number(f)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (&*self.borrow_kind(), &*other.borrow_kind()) {
            (Kind::Null, Kind::Null) => true,
            (Kind::Bool(a), Kind::Bool(b)) => a == b,
            (Kind::Number(a), Kind::Number(b)) => a == b,
            (Kind::String(a), Kind::String(b)) => a == b,
            (Kind::Array(a), Kind::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x == y)
            }
            (Kind::Object(a), Kind::Object(b)) => {
                a.len() == b.len() && a.iter().all(|(k, v)| b.get(k).as_ref() == Some(v))
            }
            _ => false,
        }
    }
}

impl Eq for Value {}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value({})", self.to_compact_string())
    }
}

fn attach_child(parent: &Rc<Node>, child: &Value) {
    if matches!(*child.borrow_kind(), Kind::Null) {
        return;
    }
    *child.0.parent.borrow_mut() = Some(Rc::downgrade(parent));
}

fn detach_child(child: &Value) {
    if matches!(*child.borrow_kind(), Kind::Null) {
        return;
    }
    *child.0.parent.borrow_mut() = None;
}
