//! Draft-4 JSON Schema compilation and validation.
//!
//! A schema [`Value`] must already be `$ref`-expanded (see
//! [`crate::expand`]) before it reaches [`compile`]: the compiler has no
//! notion of fetching remote documents, only of turning keywords into
//! [`Instruction`]s.

mod compiler;
pub(crate) mod condition;
#[cfg(feature = "metaschema")]
mod metaschema;
mod options;
mod runtime;

pub use compiler::CompileError;
pub use condition::Instruction;
pub use options::CompileOptions;
pub use runtime::validate;

use crate::value::Value;

/// Compiles `schema` with default options (metaschema self-check enabled
/// iff the `metaschema` feature is). Equivalent to
/// `compile_with_options(schema, CompileOptions::default())`.
pub fn compile(schema: &Value) -> Result<Instruction, CompileError> {
    compile_with_options(schema, CompileOptions::default())
}

/// Compiles `schema` into an [`Instruction`], honoring `options`.
pub fn compile_with_options(schema: &Value, options: CompileOptions) -> Result<Instruction, CompileError> {
    if options.check_metaschema {
        #[cfg(feature = "metaschema")]
        {
            let problems = metaschema::check(schema);
            if !problems.is_empty() {
                tracing::warn!(count = problems.len(), "schema failed metaschema check");
                return Err(CompileError::FailedMetaschema { problems });
            }
        }
    }
    tracing::debug!("compiling schema");
    compiler::compile_with(schema, options.log_unknown_keywords)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_check_scenario() {
        let schema_text = r#"{"type":"integer"}"#;
        let schema = crate::text::parse(schema_text).unwrap();
        let instruction = compile(&schema).unwrap();

        let ok = validate(&instruction, &Value::number(5i64));
        assert_eq!(ok.get("ok").unwrap(), Value::bool(true));

        let bad_float = validate(&instruction, &Value::number(5.5f64));
        assert_eq!(bad_float.get("ok").unwrap(), Value::bool(false));

        let bad_string = validate(&instruction, &Value::string("5"));
        assert_eq!(bad_string.get("ok").unwrap(), Value::bool(false));
    }

    #[test]
    fn required_scenario_names_the_missing_property() {
        let schema = crate::text::parse(r#"{"type":"object","required":["a","b"]}"#).unwrap();
        let instruction = compile(&schema).unwrap();
        let doc = Value::object();
        doc.set("a", 1i64);
        let report = validate(&instruction, &doc);
        assert_eq!(report.get("ok").unwrap(), Value::bool(false));
        let errors = report.get("errors").unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors.at(0).as_str_internal().unwrap().contains('b'));
    }

    #[test]
    fn one_of_scenario() {
        let schema = crate::text::parse(r#"{"oneOf":[{"type":"string"},{"type":"number"}]}"#).unwrap();
        let instruction = compile(&schema).unwrap();
        assert_eq!(validate(&instruction, &Value::string("a")).get("ok").unwrap(), Value::bool(true));
        assert_eq!(validate(&instruction, &Value::number(3i64)).get("ok").unwrap(), Value::bool(true));
        assert_eq!(validate(&instruction, &Value::bool(true)).get("ok").unwrap(), Value::bool(false));
        assert_eq!(validate(&instruction, &Value::null()).get("ok").unwrap(), Value::bool(false));
    }

    #[test]
    fn unique_items_scenario_reports_one_duplicate() {
        let schema = crate::text::parse(r#"{"type":"array","uniqueItems":true}"#).unwrap();
        let instruction = compile(&schema).unwrap();
        let doc = Value::array();
        doc.push(1i64);
        doc.push(2i64);
        doc.push(2i64);
        let report = validate(&instruction, &doc);
        assert_eq!(report.get("ok").unwrap(), Value::bool(false));
        assert_eq!(report.get("errors").unwrap().len(), 1);
    }

    #[test]
    fn pattern_properties_with_additional_properties_false() {
        let schema = crate::text::parse(
            r#"{"patternProperties":{"^x":{"type":"number"}},"additionalProperties":false}"#,
        )
        .unwrap();
        let instruction = compile(&schema).unwrap();
        let doc = Value::object();
        doc.set("x1", 1i64);
        doc.set("y", 2i64);
        let report = validate(&instruction, &doc);
        assert_eq!(report.get("ok").unwrap(), Value::bool(false));
        let errors = report.get("errors").unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors.at(0).as_str_internal().unwrap().contains('y'));
    }

    #[test]
    fn unknown_keyword_is_ignored_not_rejected() {
        let schema = crate::text::parse(r#"{"type":"string","unknownKeyword":true}"#).unwrap();
        let options = CompileOptions { check_metaschema: false, log_unknown_keywords: true };
        let instruction = compile_with_options(&schema, options).unwrap();
        assert_eq!(validate(&instruction, &Value::string("ok")).get("ok").unwrap(), Value::bool(true));
    }

    #[test]
    fn recursive_schema_via_self_referential_id() {
        use crate::expand;
        use crate::resolver::{Resolver, StaticFetcher};
        use url::Url;

        let schema = crate::text::parse(
            r#"{"id":"urn:t","type":"object","properties":{"child":{"$ref":"urn:t"}}}"#,
        )
        .unwrap();
        let base: Url = "urn:t".parse().unwrap();
        let resolver = Resolver::new();
        resolver.seed(&base, schema.clone());
        let fetcher = StaticFetcher::new();
        expand::expand(&schema, &base, &resolver, &fetcher).unwrap();

        let instruction = compile(&schema).unwrap();

        let nested_ok = crate::text::parse(r#"{"child":{"child":{}}}"#).unwrap();
        assert_eq!(validate(&instruction, &nested_ok).get("ok").unwrap(), Value::bool(true));

        let nested_bad = crate::text::parse(r#"{"child":{"child":"x"}}"#).unwrap();
        assert_eq!(validate(&instruction, &nested_bad).get("ok").unwrap(), Value::bool(false));
    }
}
