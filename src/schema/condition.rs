//! The compiled instruction tree: the data side of the schema compiler.
//! Each [`Condition`] is one recognised keyword's compiled form; an
//! [`Instruction`] is a cell holding a sequence of them, shared by `Rc` so
//! that a recursive schema's self-reference can point at the very
//! sequence still being built.

use std::cell::RefCell;
use std::rc::Rc;

use either::Either;
use regex::Regex;

use crate::value::Value;

/// A shared, mutable sequence of compiled conditions. Cheap to clone (an
/// `Rc` bump); cloning does not copy the underlying sequence.
#[derive(Clone)]
pub struct Instruction(Rc<RefCell<Vec<Condition>>>);

impl Instruction {
    /// An empty placeholder, inserted into the compiler's cache before a
    /// node's keywords are compiled so that self-references resolve to
    /// this same cell rather than recursing forever.
    pub(crate) fn placeholder() -> Instruction {
        Instruction(Rc::new(RefCell::new(Vec::new())))
    }

    /// Replaces the placeholder's contents once compilation of this node
    /// has finished.
    pub(crate) fn fill(&self, conditions: Vec<Condition>) {
        *self.0.borrow_mut() = conditions;
    }

    pub(crate) fn conditions(&self) -> std::cell::Ref<'_, Vec<Condition>> {
        self.0.borrow()
    }
}

/// The JSON Schema primitive type names, as accepted by the `type`
/// keyword. `Integer` is not a distinct value kind — it matches a
/// `number` whose value happens to be integral.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeName {
    Null,
    Boolean,
    Number,
    Integer,
    String,
    Array,
    Object,
}

impl TypeName {
    pub(crate) fn parse(name: &str) -> Option<TypeName> {
        match name {
            "null" => Some(TypeName::Null),
            "boolean" => Some(TypeName::Boolean),
            "number" => Some(TypeName::Number),
            "integer" => Some(TypeName::Integer),
            "string" => Some(TypeName::String),
            "array" => Some(TypeName::Array),
            "object" => Some(TypeName::Object),
            _ => None,
        }
    }

    pub(crate) fn matches(self, value: &Value) -> bool {
        match self {
            TypeName::Null => value.is_null(),
            TypeName::Boolean => value.is_bool(),
            TypeName::Number => value.is_number(),
            TypeName::Integer => {
                value.is_number() && value.as_num_internal().expect("checked is_number").is_integral()
            }
            TypeName::String => value.is_string(),
            TypeName::Array => value.is_array(),
            TypeName::Object => value.is_object(),
        }
    }
}

/// How `additionalProperties`/`additionalItems` treats members or
/// elements not already accounted for by a more specific keyword.
pub(crate) enum Additional {
    /// `true` (the default): no-op.
    Allow,
    /// `false`: any unaccounted-for member/element is an error.
    Deny,
    /// A schema applies to every unaccounted-for member/element.
    Schema(Instruction),
}

/// The compiled form of `properties`/`patternProperties`/
/// `additionalProperties`/`minProperties`/`maxProperties`.
pub(crate) struct PropertiesCheck {
    pub properties: Vec<(String, Instruction)>,
    pub pattern_properties: Vec<(Regex, Instruction)>,
    pub additional: Additional,
    pub min_properties: Option<usize>,
    pub max_properties: Option<usize>,
}

/// What `items` compiles to: one schema for every element, or a
/// positional schema per index.
pub(crate) enum ItemsSpec {
    Single(Instruction),
    Positional(Vec<Instruction>),
}

/// The compiled form of `items`/`additionalItems`/`uniqueItems`/
/// `minItems`/`maxItems`.
pub(crate) struct ItemsCheck {
    pub items: Option<ItemsSpec>,
    pub additional_items: Additional,
    pub unique_items: bool,
    pub min_items: Option<usize>,
    pub max_items: Option<usize>,
}

/// The compiled form of `minimum`/`maximum`/`exclusiveMinimum`/
/// `exclusiveMaximum`/`multipleOf`.
pub(crate) struct NumericCheck {
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub exclusive_minimum: bool,
    pub exclusive_maximum: bool,
    pub multiple_of: Option<f64>,
}

/// The compiled form of `minLength`/`maxLength`/`pattern`.
pub(crate) struct StringCheck {
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<Regex>,
}

/// One entry of a compiled `dependencies` keyword: either a schema that
/// must hold for the whole document when the named property is present,
/// or a list of property names that must also be present.
pub(crate) type DependencyRule = Either<Instruction, Vec<String>>;

/// One compiled keyword, ready to run against a document.
pub(crate) enum Condition {
    Type(Vec<TypeName>),
    Enum(Vec<Value>),
    AllOf(Vec<Instruction>),
    AnyOf(Vec<Instruction>),
    OneOf(Vec<Instruction>),
    Not(Instruction),
    Required(Vec<String>),
    Properties(PropertiesCheck),
    Items(ItemsCheck),
    Numeric(NumericCheck),
    StringShape(StringCheck),
    Dependencies(Vec<(String, DependencyRule)>),
}
