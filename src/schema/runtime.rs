//! Executes a compiled [`Instruction`] tree against a document, producing
//! the `{ok, errors}` report described by the value model's error-report
//! shape. Validation never short-circuits except within `anyOf`/`oneOf`,
//! which by construction only need to know how many branches passed.

use std::collections::HashSet;

use either::Either;

use crate::value::Value;

use super::condition::{
    Additional, Condition, DependencyRule, ItemsCheck, ItemsSpec, NumericCheck, PropertiesCheck,
    StringCheck,
};
use super::Instruction;

/// Runs `instruction` against `document`, returning a value shaped
/// `{"ok": true}` or `{"ok": false, "errors": [...]}`.
pub fn validate(instruction: &Instruction, document: &Value) -> Value {
    let mut errors = Vec::new();
    run(instruction, document, &mut errors);
    let report = Value::object();
    if errors.is_empty() {
        report.set("ok", true);
    } else {
        report.set("ok", false);
        let list = Value::array();
        for error in errors {
            list.push(error);
        }
        report.set("errors", list);
    }
    report
}

fn run(instruction: &Instruction, value: &Value, errors: &mut Vec<String>) {
    for condition in instruction.conditions().iter() {
        run_condition(condition, value, errors);
    }
}

fn run_condition(condition: &Condition, value: &Value, errors: &mut Vec<String>) {
    match condition {
        Condition::Type(names) => {
            if !names.iter().any(|name| name.matches(value)) {
                let wanted: Vec<&str> = names.iter().map(type_label).collect();
                errors.push(format!(
                    "value of kind {} does not match type {}",
                    value.kind_name(),
                    wanted.join(" or ")
                ));
            }
        }
        Condition::Enum(options) => {
            if !options.iter().any(|option| option == value) {
                errors.push(format!(
                    "value {} is not one of the allowed enum values",
                    value.to_bounded_string(80)
                ));
            }
        }
        Condition::AllOf(list) => {
            for sub in list {
                run(sub, value, errors);
            }
        }
        Condition::AnyOf(list) => {
            let passed = list.iter().any(|sub| {
                let mut sub_errors = Vec::new();
                run(sub, value, &mut sub_errors);
                sub_errors.is_empty()
            });
            if !passed {
                errors.push("value must conform to at least one of the listed schemas".to_string());
            }
        }
        Condition::OneOf(list) => {
            let pass_count = list
                .iter()
                .filter(|sub| {
                    let mut sub_errors = Vec::new();
                    run(sub, value, &mut sub_errors);
                    sub_errors.is_empty()
                })
                .count();
            if pass_count != 1 {
                errors.push(format!(
                    "value must conform to exactly one of the listed schemas (matched {pass_count})"
                ));
            }
        }
        Condition::Not(inner) => {
            let mut sub_errors = Vec::new();
            run(inner, value, &mut sub_errors);
            if sub_errors.is_empty() {
                errors.push("value must not conform to the schema under \"not\"".to_string());
            }
        }
        Condition::Required(names) => {
            if value.is_object() {
                for name in names {
                    if !value.has(name) {
                        errors.push(format!("missing required property {name:?}"));
                    }
                }
            }
        }
        Condition::Properties(check) => run_properties(check, value, errors),
        Condition::Items(check) => run_items(check, value, errors),
        Condition::Numeric(check) => run_numeric(check, value, errors),
        Condition::StringShape(check) => run_string(check, value, errors),
        Condition::Dependencies(rules) => run_dependencies(rules, value, errors),
    }
}

fn type_label(name: &super::condition::TypeName) -> &'static str {
    use super::condition::TypeName::*;
    match name {
        Null => "null",
        Boolean => "boolean",
        Number => "number",
        Integer => "integer",
        String => "string",
        Array => "array",
        Object => "object",
    }
}

fn run_properties(check: &PropertiesCheck, value: &Value, errors: &mut Vec<String>) {
    if !value.is_object() {
        return;
    }
    let mut checked: HashSet<String> = HashSet::new();

    for (name, sub) in &check.properties {
        if let Some(member) = value.get(name) {
            run(sub, &member, errors);
            checked.insert(name.clone());
        }
    }

    for (pattern, sub) in &check.pattern_properties {
        for (name, member) in value.object_snapshot().expect("checked is_object above") {
            if pattern.is_match(&name) {
                run(sub, &member, errors);
                checked.insert(name);
            }
        }
    }

    match &check.additional {
        Additional::Allow => {}
        Additional::Deny => {
            for name in value.object_snapshot().expect("checked is_object above").keys() {
                if !checked.contains(name) {
                    errors.push(format!("unexpected additional property {name:?}"));
                }
            }
        }
        Additional::Schema(sub) => {
            for (name, member) in value.object_snapshot().expect("checked is_object above") {
                if !checked.contains(&name) {
                    run(sub, &member, errors);
                }
            }
        }
    }

    let count = value.len();
    if let Some(min) = check.min_properties {
        if count < min {
            errors.push(format!(
                "object has {count} properties, fewer than the required minimum of {min}"
            ));
        }
    }
    if let Some(max) = check.max_properties {
        if count > max {
            errors.push(format!(
                "object has {count} properties, more than the permitted maximum of {max}"
            ));
        }
    }
}

fn run_items(check: &ItemsCheck, value: &Value, errors: &mut Vec<String>) {
    if !value.is_array() {
        return;
    }
    let elements = value.array_snapshot().expect("checked is_array above");

    match &check.items {
        None => {}
        Some(ItemsSpec::Single(sub)) => {
            for element in &elements {
                run(sub, element, errors);
            }
        }
        Some(ItemsSpec::Positional(schemas)) => {
            for (i, element) in elements.iter().enumerate() {
                if let Some(sub) = schemas.get(i) {
                    run(sub, element, errors);
                } else {
                    match &check.additional_items {
                        Additional::Allow => {}
                        Additional::Deny => errors.push(format!(
                            "array element {i} is not permitted beyond the positional item schemas"
                        )),
                        Additional::Schema(sub) => run(sub, element, errors),
                    }
                }
            }
        }
    }

    if check.unique_items {
        for i in 0..elements.len() {
            for j in (i + 1)..elements.len() {
                if elements[i] == elements[j] {
                    errors.push(format!("array elements at indices {i} and {j} are duplicates"));
                }
            }
        }
    }

    let count = elements.len();
    if let Some(min) = check.min_items {
        if count < min {
            errors.push(format!("array has {count} elements, fewer than the required minimum of {min}"));
        }
    }
    if let Some(max) = check.max_items {
        if count > max {
            errors.push(format!("array has {count} elements, more than the permitted maximum of {max}"));
        }
    }
}

fn run_numeric(check: &NumericCheck, value: &Value, errors: &mut Vec<String>) {
    let Some(num) = value.as_num_internal() else { return };
    let v = num.as_f64();
    if let Some(min) = check.minimum {
        let ok = if check.exclusive_minimum { v > min } else { v >= min };
        if !ok {
            let qualifier = if check.exclusive_minimum { "exclusive " } else { "" };
            errors.push(format!("value {v} is less than the {qualifier}minimum {min}"));
        }
    }
    if let Some(max) = check.maximum {
        let ok = if check.exclusive_maximum { v < max } else { v <= max };
        if !ok {
            let qualifier = if check.exclusive_maximum { "exclusive " } else { "" };
            errors.push(format!("value {v} is greater than the {qualifier}maximum {max}"));
        }
    }
    if let Some(step) = check.multiple_of {
        if step != 0.0 {
            let quotient = v / step;
            let nearest = quotient.round();
            let tolerance = (quotient.abs().max(1.0)) * f64::EPSILON * 8.0;
            if (quotient - nearest).abs() > tolerance {
                errors.push(format!("value {v} is not a multiple of {step}"));
            }
        }
    }
}

fn run_string(check: &StringCheck, value: &Value, errors: &mut Vec<String>) {
    let Some(s) = value.as_str_internal() else { return };
    let len = s.chars().count();
    if let Some(min) = check.min_length {
        if len < min {
            errors.push(format!("string has {len} characters, fewer than the required minimum of {min}"));
        }
    }
    if let Some(max) = check.max_length {
        if len > max {
            errors.push(format!("string has {len} characters, more than the permitted maximum of {max}"));
        }
    }
    if let Some(pattern) = &check.pattern {
        if !pattern.is_match(&s) {
            errors.push(format!("string does not match pattern /{}/", pattern.as_str()));
        }
    }
}

fn run_dependencies(rules: &[(String, DependencyRule)], value: &Value, errors: &mut Vec<String>) {
    if !value.is_object() {
        return;
    }
    for (name, rule) in rules {
        if !value.has(name) {
            continue;
        }
        match rule {
            Either::Left(schema) => run(schema, value, errors),
            Either::Right(required) => {
                for req in required {
                    if !value.has(req) {
                        errors.push(format!(
                            "property {name:?} requires property {req:?} to also be present"
                        ));
                    }
                }
            }
        }
    }
}
