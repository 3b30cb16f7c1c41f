//! Converts an expanded schema value into an [`Instruction`] tree.
//!
//! The compiler maintains an identity-keyed cache: on entering a schema
//! node, a placeholder instruction is inserted before its keywords are
//! compiled, and the placeholder is filled in once compilation of that
//! node finishes. A self-referential schema (expanded so that a `$ref`
//! subtree *is* an ancestor node, by `Rc` identity) is handled because the
//! cycle is encountered as a reference to the still-empty placeholder,
//! which is populated by the time validation actually runs it.

use std::cell::RefCell;
use std::collections::HashMap;

use either::Either;
use regex::Regex;
use thiserror::Error;

use crate::value::{Value, ValueId};

use super::condition::{
    Additional, Condition, Instruction, ItemsCheck, ItemsSpec, NumericCheck, PropertiesCheck,
    StringCheck, TypeName,
};

/// Everything that can go wrong turning a schema value into an
/// instruction tree. These are all structural problems with the schema
/// itself — a programmer error in the sense of §7 of the design notes,
/// not a validation failure.
#[derive(Debug, Error, Clone)]
pub enum CompileError {
    /// A schema node (the root, or a subschema reached through a
    /// keyword like `properties` or `allOf`) was not a JSON object.
    #[error("schema node at {path} is not an object")]
    NotAnObject {
        /// A slash-separated path to the offending node, for diagnostics.
        path: String,
    },
    /// A keyword's value was not the kind the draft requires.
    #[error("keyword {keyword:?} at {path} must be a {expected}")]
    BadKeywordType {
        /// A slash-separated path to the schema node carrying the keyword.
        path: String,
        /// The keyword whose value was malformed.
        keyword: &'static str,
        /// A human-readable description of the expected shape.
        expected: &'static str,
    },
    /// The `type` keyword named something other than one of the six JSON
    /// primitive type names (or `"integer"`).
    #[error("keyword {keyword:?} at {path} named an unrecognised type {found:?}")]
    BadTypeName {
        /// A slash-separated path to the schema node carrying the keyword.
        path: String,
        /// The keyword whose value named the bad type (`"type"`, always).
        keyword: &'static str,
        /// The unrecognised type name.
        found: String,
    },
    /// A `pattern` or `patternProperties` key was not a valid regular
    /// expression.
    #[error("pattern at {path} is not a valid regular expression: {source}")]
    BadPattern {
        /// A slash-separated path to the offending pattern.
        path: String,
        /// The underlying regex compilation error.
        source: regex::Error,
    },
    /// The schema document itself failed the built-in metaschema check
    /// (only reachable with the `metaschema` feature enabled).
    #[error("schema failed its own metaschema check: {}", problems.join("; "))]
    FailedMetaschema {
        /// The accumulated validation error messages from the metaschema
        /// check.
        problems: Vec<String>,
    },
}

/// The draft-4 keywords this compiler recognises, used to flag unrecognised
/// ones when [`super::CompileOptions::log_unknown_keywords`] is set.
/// Annotation-only keywords (`title`, `description`, `default`) and the
/// identity keywords (`id`, `$ref`, `$schema`) are included even though they
/// compile to no [`Condition`], since they are still recognised draft-4
/// vocabulary rather than unknown extensions.
const KNOWN_KEYWORDS: &[&str] = &[
    "type", "enum", "allOf", "anyOf", "oneOf", "not", "required",
    "properties", "patternProperties", "additionalProperties", "minProperties", "maxProperties",
    "items", "additionalItems", "uniqueItems", "minItems", "maxItems",
    "minimum", "maximum", "exclusiveMinimum", "exclusiveMaximum", "multipleOf",
    "minLength", "maxLength", "pattern", "dependencies",
    "id", "$ref", "$schema", "title", "description", "default",
];

/// Compiles an already-`$ref`-expanded schema value into an instruction.
pub fn compile(schema: &Value) -> Result<Instruction, CompileError> {
    compile_with(schema, false)
}

/// Compiles `schema`, optionally logging schema object members whose key
/// isn't one of [`KNOWN_KEYWORDS`].
pub fn compile_with(schema: &Value, log_unknown_keywords: bool) -> Result<Instruction, CompileError> {
    let compiler = Compiler { cache: RefCell::new(HashMap::new()), log_unknown_keywords };
    compiler.compile_node(schema, "")
}

struct Compiler {
    cache: RefCell<HashMap<ValueId, Instruction>>,
    log_unknown_keywords: bool,
}

impl Compiler {
    fn compile_node(&self, schema: &Value, path: &str) -> Result<Instruction, CompileError> {
        if !schema.is_object() {
            return Err(CompileError::NotAnObject { path: path.to_string() });
        }
        let id = schema.identity();
        if let Some(existing) = self.cache.borrow().get(&id) {
            return Ok(existing.clone());
        }
        let placeholder = Instruction::placeholder();
        self.cache.borrow_mut().insert(id, placeholder.clone());

        if self.log_unknown_keywords {
            for key in schema.object_snapshot().expect("checked is_object above").keys() {
                if !KNOWN_KEYWORDS.contains(&key.as_str()) {
                    tracing::warn!(keyword = %key, path = %path, "schema object has an unrecognised keyword");
                }
            }
        }

        let mut conditions = Vec::new();
        self.compile_type(schema, path, &mut conditions)?;
        self.compile_enum(schema, &mut conditions);
        self.compile_combinators(schema, path, &mut conditions)?;
        self.compile_required(schema, &mut conditions);
        self.compile_properties(schema, path, &mut conditions)?;
        self.compile_items(schema, path, &mut conditions)?;
        self.compile_numeric(schema, path, &mut conditions)?;
        self.compile_string(schema, path, &mut conditions)?;
        self.compile_dependencies(schema, path, &mut conditions)?;

        placeholder.fill(conditions);
        Ok(placeholder)
    }

    fn compile_type(&self, schema: &Value, path: &str, out: &mut Vec<Condition>) -> Result<(), CompileError> {
        let Some(keyword) = schema.get("type") else { return Ok(()) };
        let names = if keyword.is_string() {
            vec![keyword.as_str_internal().expect("checked is_string")]
        } else if keyword.is_array() {
            keyword
                .array_snapshot()
                .expect("checked is_array")
                .iter()
                .map(|v| v.as_str_internal().ok_or_else(|| CompileError::BadKeywordType {
                    path: path.to_string(),
                    keyword: "type",
                    expected: "string or array of strings",
                }))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            return Err(CompileError::BadKeywordType {
                path: path.to_string(),
                keyword: "type",
                expected: "string or array of strings",
            });
        };
        let parsed = names
            .into_iter()
            .map(|name| {
                TypeName::parse(&name).ok_or_else(|| CompileError::BadTypeName {
                    path: path.to_string(),
                    keyword: "type",
                    found: name,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        out.push(Condition::Type(parsed));
        Ok(())
    }

    fn compile_enum(&self, schema: &Value, out: &mut Vec<Condition>) {
        if let Some(keyword) = schema.get("enum") {
            if let Some(options) = keyword.array_snapshot() {
                out.push(Condition::Enum(options));
            }
        }
    }

    fn compile_combinators(
        &self,
        schema: &Value,
        path: &str,
        out: &mut Vec<Condition>,
    ) -> Result<(), CompileError> {
        if let Some(list) = schema.get("allOf") {
            out.push(Condition::AllOf(self.compile_schema_list(&list, path, "allOf")?));
        }
        if let Some(list) = schema.get("anyOf") {
            out.push(Condition::AnyOf(self.compile_schema_list(&list, path, "anyOf")?));
        }
        if let Some(list) = schema.get("oneOf") {
            out.push(Condition::OneOf(self.compile_schema_list(&list, path, "oneOf")?));
        }
        if let Some(inner) = schema.get("not") {
            let compiled = self.compile_node(&inner, &format!("{path}/not"))?;
            out.push(Condition::Not(compiled));
        }
        Ok(())
    }

    fn compile_schema_list(
        &self,
        list: &Value,
        path: &str,
        keyword: &'static str,
    ) -> Result<Vec<Instruction>, CompileError> {
        let items = list.array_snapshot().ok_or_else(|| CompileError::BadKeywordType {
            path: path.to_string(),
            keyword,
            expected: "array of schemas",
        })?;
        items
            .iter()
            .enumerate()
            .map(|(i, sub)| self.compile_node(sub, &format!("{path}/{keyword}/{i}")))
            .collect()
    }

    fn compile_required(&self, schema: &Value, out: &mut Vec<Condition>) {
        if let Some(keyword) = schema.get("required") {
            if let Some(items) = keyword.array_snapshot() {
                let names: Vec<String> = items.iter().filter_map(|v| v.as_str_internal()).collect();
                out.push(Condition::Required(names));
            }
        }
    }

    fn compile_properties(
        &self,
        schema: &Value,
        path: &str,
        out: &mut Vec<Condition>,
    ) -> Result<(), CompileError> {
        let has_any = schema.has("properties")
            || schema.has("patternProperties")
            || schema.has("additionalProperties")
            || schema.has("minProperties")
            || schema.has("maxProperties");
        if !has_any {
            return Ok(());
        }

        let mut properties = Vec::new();
        if let Some(map) = schema.get("properties") {
            for (name, sub) in map.object_snapshot().into_iter().flatten() {
                let compiled = self.compile_node(&sub, &format!("{path}/properties/{name}"))?;
                properties.push((name, compiled));
            }
        }

        let mut pattern_properties = Vec::new();
        if let Some(map) = schema.get("patternProperties") {
            for (pattern, sub) in map.object_snapshot().into_iter().flatten() {
                let regex = Regex::new(&pattern).map_err(|source| CompileError::BadPattern {
                    path: format!("{path}/patternProperties/{pattern}"),
                    source,
                })?;
                let compiled = self.compile_node(&sub, &format!("{path}/patternProperties/{pattern}"))?;
                pattern_properties.push((regex, compiled));
            }
        }

        let additional = match schema.get("additionalProperties") {
            None => Additional::Allow,
            Some(v) if v.is_bool() => {
                if v.as_bool_internal().expect("checked is_bool") {
                    Additional::Allow
                } else {
                    Additional::Deny
                }
            }
            Some(v) => Additional::Schema(self.compile_node(&v, &format!("{path}/additionalProperties"))?),
        };

        let min_properties = schema.get("minProperties").and_then(|v| v.as_num_internal()).map(|n| n.as_f64() as usize);
        let max_properties = schema.get("maxProperties").and_then(|v| v.as_num_internal()).map(|n| n.as_f64() as usize);

        out.push(Condition::Properties(PropertiesCheck {
            properties,
            pattern_properties,
            additional,
            min_properties,
            max_properties,
        }));
        Ok(())
    }

    fn compile_items(&self, schema: &Value, path: &str, out: &mut Vec<Condition>) -> Result<(), CompileError> {
        let has_any = schema.has("items")
            || schema.has("additionalItems")
            || schema.has("uniqueItems")
            || schema.has("minItems")
            || schema.has("maxItems");
        if !has_any {
            return Ok(());
        }

        let items = match schema.get("items") {
            None => None,
            Some(v) if v.is_array() => {
                let schemas = v.array_snapshot().expect("checked is_array");
                let compiled = schemas
                    .iter()
                    .enumerate()
                    .map(|(i, sub)| self.compile_node(sub, &format!("{path}/items/{i}")))
                    .collect::<Result<Vec<_>, _>>()?;
                Some(ItemsSpec::Positional(compiled))
            }
            Some(v) => Some(ItemsSpec::Single(self.compile_node(&v, &format!("{path}/items"))?)),
        };

        let additional_items = match schema.get("additionalItems") {
            None => Additional::Allow,
            Some(v) if v.is_bool() => {
                if v.as_bool_internal().expect("checked is_bool") {
                    Additional::Allow
                } else {
                    Additional::Deny
                }
            }
            Some(v) => Additional::Schema(self.compile_node(&v, &format!("{path}/additionalItems"))?),
        };

        let unique_items = schema.get("uniqueItems").and_then(|v| v.as_bool_internal()).unwrap_or(false);
        let min_items = schema.get("minItems").and_then(|v| v.as_num_internal()).map(|n| n.as_f64() as usize);
        let max_items = schema.get("maxItems").and_then(|v| v.as_num_internal()).map(|n| n.as_f64() as usize);

        out.push(Condition::Items(ItemsCheck {
            items,
            additional_items,
            unique_items,
            min_items,
            max_items,
        }));
        Ok(())
    }

    fn compile_numeric(&self, schema: &Value, _path: &str, out: &mut Vec<Condition>) -> Result<(), CompileError> {
        let has_any = schema.has("minimum")
            || schema.has("maximum")
            || schema.has("multipleOf");
        if !has_any {
            return Ok(());
        }
        let minimum = schema.get("minimum").and_then(|v| v.as_num_internal()).map(|n| n.as_f64());
        let maximum = schema.get("maximum").and_then(|v| v.as_num_internal()).map(|n| n.as_f64());
        let exclusive_minimum = schema.get("exclusiveMinimum").and_then(|v| v.as_bool_internal()).unwrap_or(false);
        let exclusive_maximum = schema.get("exclusiveMaximum").and_then(|v| v.as_bool_internal()).unwrap_or(false);
        let multiple_of = schema.get("multipleOf").and_then(|v| v.as_num_internal()).map(|n| n.as_f64());
        out.push(Condition::Numeric(NumericCheck {
            minimum,
            maximum,
            exclusive_minimum,
            exclusive_maximum,
            multiple_of,
        }));
        Ok(())
    }

    fn compile_string(&self, schema: &Value, path: &str, out: &mut Vec<Condition>) -> Result<(), CompileError> {
        let has_any = schema.has("minLength") || schema.has("maxLength") || schema.has("pattern");
        if !has_any {
            return Ok(());
        }
        let min_length = schema.get("minLength").and_then(|v| v.as_num_internal()).map(|n| n.as_f64() as usize);
        let max_length = schema.get("maxLength").and_then(|v| v.as_num_internal()).map(|n| n.as_f64() as usize);
        let pattern = match schema.get("pattern") {
            None => None,
            Some(v) => {
                let text = v.as_str_internal().ok_or_else(|| CompileError::BadKeywordType {
                    path: path.to_string(),
                    keyword: "pattern",
                    expected: "string",
                })?;
                Some(Regex::new(&text).map_err(|source| CompileError::BadPattern {
                    path: format!("{path}/pattern"),
                    source,
                })?)
            }
        };
        out.push(Condition::StringShape(StringCheck { min_length, max_length, pattern }));
        Ok(())
    }

    fn compile_dependencies(
        &self,
        schema: &Value,
        path: &str,
        out: &mut Vec<Condition>,
    ) -> Result<(), CompileError> {
        let Some(map) = schema.get("dependencies") else { return Ok(()) };
        let mut rules = Vec::new();
        for (name, rule) in map.object_snapshot().into_iter().flatten() {
            let compiled = if rule.is_array() {
                let names = rule
                    .array_snapshot()
                    .expect("checked is_array")
                    .iter()
                    .filter_map(|v| v.as_str_internal())
                    .collect();
                Either::Right(names)
            } else {
                Either::Left(self.compile_node(&rule, &format!("{path}/dependencies/{name}"))?)
            };
            rules.push((name, compiled));
        }
        out.push(Condition::Dependencies(rules));
        Ok(())
    }
}
