//! The construction factory seam: a pluggable allocator for fresh
//! [`Value`]s, so a caller can substitute an alternative concrete
//! representation (e.g. case-insensitive object keys) without touching
//! every call site that builds values.
//!
//! Two slots hold the active factory: a process-wide one (an `RwLock` so
//! it may be replaced at any point in the program's lifetime, not only at
//! start-up) and a thread-local override that takes precedence for the
//! calling thread. Both default to [`DefaultFactory`], which simply
//! forwards to `Value`'s own constructors.

use std::cell::RefCell;
use std::sync::RwLock;

use once_cell::sync::Lazy;

use super::{AnyValue, Num, Value};

/// A pluggable allocator for fresh [`Value`]s. Implement this to have
/// [`Value::make`] (and anything built on top of it) produce an
/// alternative concrete representation.
///
/// Object-safe by construction: every method is non-generic, and `make`'s
/// default implementation dispatches on [`AnyValue`]'s tag rather than
/// requiring monomorphization.
pub trait Factory: Send + Sync {
    /// Produces a `null` value.
    fn nil(&self) -> Value;
    /// Produces a `bool` value.
    fn bool_value(&self, b: bool) -> Value;
    /// Produces a `number` value.
    fn number_value(&self, n: Num) -> Value;
    /// Produces a `string` value.
    fn string_value(&self, s: String) -> Value;
    /// Produces a fresh empty `object` value.
    fn object_value(&self) -> Value;
    /// Produces a fresh empty `array` value.
    fn array_value(&self) -> Value;

    /// Builds a value from a host-assembled [`AnyValue`], recursing through
    /// this same factory for nested arrays/objects. Override only if the
    /// alternative representation needs different recursive behavior;
    /// the default composes the six primitives above.
    fn make(&self, any: AnyValue) -> Value {
        match any {
            AnyValue::Null => self.nil(),
            AnyValue::Bool(b) => self.bool_value(b),
            AnyValue::Int(i) => self.number_value(Num::from(i)),
            AnyValue::Float(f) => self.number_value(Num::from(f)),
            AnyValue::Str(s) => self.string_value(s),
            AnyValue::Array(items) => {
                let arr = self.array_value();
                for item in items {
                    arr.push(self.make(item));
                }
                arr
            }
            AnyValue::Object(entries) => {
                let obj = self.object_value();
                for (k, v) in entries {
                    obj.set(k, self.make(v));
                }
                obj
            }
        }
    }
}

/// The factory used when no process-wide or thread-local override has
/// been installed: builds plain in-crate [`Value`]s.
pub struct DefaultFactory;

impl Factory for DefaultFactory {
    fn nil(&self) -> Value {
        Value::null()
    }
    fn bool_value(&self, b: bool) -> Value {
        Value::bool(b)
    }
    fn number_value(&self, n: Num) -> Value {
        Value::number(n)
    }
    fn string_value(&self, s: String) -> Value {
        Value::string(s)
    }
    fn object_value(&self) -> Value {
        Value::object()
    }
    fn array_value(&self) -> Value {
        Value::array()
    }
}

static GLOBAL_FACTORY: Lazy<RwLock<Box<dyn Factory>>> =
    Lazy::new(|| RwLock::new(Box::new(DefaultFactory)));

thread_local! {
    static LOCAL_FACTORY: RefCell<Option<Box<dyn Factory>>> = RefCell::new(None);
}

/// Replaces the process-wide factory. Affects every thread that has not
/// installed its own thread-local override. Intended to run once during
/// process initialization, though nothing prevents replacing it later.
pub fn set_global_factory(factory: impl Factory + 'static) {
    *GLOBAL_FACTORY.write().expect("factory lock poisoned") = Box::new(factory);
}

/// Installs `factory` as this thread's override for the duration of
/// `body`, then restores the previous (possibly absent) override.
pub fn with_thread_local_factory<R>(factory: impl Factory + 'static, body: impl FnOnce() -> R) -> R {
    let previous = LOCAL_FACTORY.with(|slot| slot.borrow_mut().replace(Box::new(factory)));
    let result = body();
    LOCAL_FACTORY.with(|slot| *slot.borrow_mut() = previous);
    result
}

/// Whether a thread-local factory override is currently installed.
pub fn current_factory() -> &'static str {
    let has_local = LOCAL_FACTORY.with(|slot| slot.borrow().is_some());
    if has_local {
        "thread-local"
    } else {
        "process-wide"
    }
}

pub(super) fn make(any: AnyValue) -> Value {
    let from_local = LOCAL_FACTORY.with(|slot| slot.borrow().as_ref().map(|f| f.make(any.clone())));
    match from_local {
        Some(v) => v,
        None => GLOBAL_FACTORY.read().expect("factory lock poisoned").make(any),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct UppercasingFactory;
    impl Factory for UppercasingFactory {
        fn nil(&self) -> Value {
            Value::null()
        }
        fn bool_value(&self, b: bool) -> Value {
            Value::bool(b)
        }
        fn number_value(&self, n: Num) -> Value {
            Value::number(n)
        }
        fn string_value(&self, s: String) -> Value {
            Value::string(s.to_uppercase())
        }
        fn object_value(&self) -> Value {
            Value::object()
        }
        fn array_value(&self) -> Value {
            Value::array()
        }
    }

    #[test]
    fn thread_local_factory_overrides_default() {
        let v = with_thread_local_factory(UppercasingFactory, || Value::make("hi"));
        assert_eq!(v.as_str_internal().unwrap(), "HI");
        // Override is scoped: outside the closure, behavior reverts.
        let v2 = Value::make("hi");
        assert_eq!(v2.as_str_internal().unwrap(), "hi");
    }

    #[test]
    fn current_factory_reports_scope() {
        assert_eq!(current_factory(), "process-wide");
        with_thread_local_factory(UppercasingFactory, || {
            assert_eq!(current_factory(), "thread-local");
        });
        assert_eq!(current_factory(), "process-wide");
    }
}
