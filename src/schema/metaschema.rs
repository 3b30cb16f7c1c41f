//! Self-validation: before a schema is compiled, check the schema
//! document itself against a draft-4-shaped metaschema, gated behind the
//! `metaschema` feature (on by default). Covers the keyword subset this
//! crate actually compiles, rather than reproducing the full upstream
//! metaschema text.

use once_cell::sync::Lazy;

use crate::text;
use crate::value::Value;

use super::compiler;
use super::condition::Instruction;

const METASCHEMA_TEXT: &str = r#"
{
    "type": "object",
    "properties": {
        "type": {},
        "enum": { "type": "array" },
        "allOf": { "type": "array" },
        "anyOf": { "type": "array" },
        "oneOf": { "type": "array" },
        "not": { "type": "object" },
        "required": { "type": "array" },
        "properties": { "type": "object" },
        "patternProperties": { "type": "object" },
        "additionalProperties": {},
        "minProperties": { "type": "integer", "minimum": 0 },
        "maxProperties": { "type": "integer", "minimum": 0 },
        "items": {},
        "additionalItems": {},
        "uniqueItems": { "type": "boolean" },
        "minItems": { "type": "integer", "minimum": 0 },
        "maxItems": { "type": "integer", "minimum": 0 },
        "minimum": { "type": "number" },
        "maximum": { "type": "number" },
        "exclusiveMinimum": { "type": "boolean" },
        "exclusiveMaximum": { "type": "boolean" },
        "multipleOf": { "type": "number" },
        "minLength": { "type": "integer", "minimum": 0 },
        "maxLength": { "type": "integer", "minimum": 0 },
        "pattern": { "type": "string" },
        "dependencies": { "type": "object" },
        "id": { "type": "string" },
        "$ref": { "type": "string" }
    }
}
"#;

static METASCHEMA_INSTRUCTION: Lazy<Instruction> = Lazy::new(|| {
    let value = text::parse(METASCHEMA_TEXT).expect("built-in metaschema text is valid JSON");
    compiler::compile(&value).expect("built-in metaschema is itself schema-shaped")
});

/// Validates `schema` against the built-in metaschema, returning the
/// accumulated error strings (empty means it passed).
pub fn check(schema: &Value) -> Vec<String> {
    let report = super::runtime::validate(&METASCHEMA_INSTRUCTION, schema);
    report
        .get("errors")
        .and_then(|e| e.array_snapshot())
        .map(|items| items.iter().filter_map(|v| v.as_str_internal()).collect())
        .unwrap_or_default()
}
