//! End-to-end tests exercising the full pipeline through the public API:
//! parse -> expand -> compile -> validate.

use valjson::{compile, expand, parse, validate, Resolver, StaticFetcher, Value};

fn run(schema_text: &str, base: &str, doc_text: &str) -> Value {
    let schema = parse(schema_text).expect("schema parses");
    let base: url::Url = base.parse().expect("base is a valid URI");
    let resolver = Resolver::new();
    let fetcher = StaticFetcher::new();
    expand(&schema, &base, &resolver, &fetcher).expect("expand succeeds");
    let instruction = compile(&schema).expect("schema compiles");
    let doc = parse(doc_text).expect("document parses");
    validate(&instruction, &doc)
}

#[test]
fn simple_object_schema_accepts_a_conforming_document() {
    let report = run(
        r#"{"type":"object","required":["name"],"properties":{"name":{"type":"string"}}}"#,
        "urn:example:simple",
        r#"{"name":"ok"}"#,
    );
    assert_eq!(report.get("ok").unwrap(), Value::bool(true));
}

#[test]
fn simple_object_schema_rejects_a_missing_required_property() {
    let report = run(
        r#"{"type":"object","required":["name"],"properties":{"name":{"type":"string"}}}"#,
        "urn:example:simple",
        r#"{}"#,
    );
    assert_eq!(report.get("ok").unwrap(), Value::bool(false));
    assert!(report.get("errors").unwrap().len() >= 1);
}

#[test]
fn nested_allof_and_items_schema() {
    let schema_text = r#"{
        "type": "object",
        "properties": {
            "tags": {
                "type": "array",
                "items": { "type": "string" },
                "uniqueItems": true
            }
        },
        "allOf": [
            { "required": ["tags"] }
        ]
    }"#;
    let ok = run(schema_text, "urn:example:allof", r#"{"tags":["a","b"]}"#);
    assert_eq!(ok.get("ok").unwrap(), Value::bool(true));

    let dup = run(schema_text, "urn:example:allof", r#"{"tags":["a","a"]}"#);
    assert_eq!(dup.get("ok").unwrap(), Value::bool(false));

    let missing = run(schema_text, "urn:example:allof", r#"{"tags":[]}"#);
    assert_eq!(missing.get("ok").unwrap(), Value::bool(true));
}

#[test]
fn cross_document_ref_is_resolved_through_a_custom_fetcher() {
    let schema = parse(
        r#"{"type":"object","properties":{"address":{"$ref":"https://example.com/address.json"}}}"#,
    )
    .unwrap();
    let base = "https://example.com/root.json".parse().unwrap();
    let resolver = Resolver::new();
    let fetcher = StaticFetcher::new().register(
        "https://example.com/address.json",
        r#"{"type":"object","required":["city"]}"#,
    );
    expand(&schema, &base, &resolver, &fetcher).unwrap();
    let instruction = compile(&schema).unwrap();

    let good = parse(r#"{"address":{"city":"here"}}"#).unwrap();
    assert_eq!(validate(&instruction, &good).get("ok").unwrap(), Value::bool(true));

    let bad = parse(r#"{"address":{}}"#).unwrap();
    assert_eq!(validate(&instruction, &bad).get("ok").unwrap(), Value::bool(false));
}

#[test]
fn malformed_schema_document_is_rejected_before_validation() {
    let schema = parse(r#"{"type":123}"#).unwrap();
    let err = compile(&schema).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("type"));
}

#[test]
fn round_trips_through_the_tolerant_reader_and_compact_writer() {
    let doc = parse(r#"{"a": 1, "b": [true, null, "x"] /* trailing comment */}"#).unwrap();
    let text = doc.to_compact_string();
    let reparsed = parse(&text).unwrap();
    assert_eq!(doc, reparsed);
}
