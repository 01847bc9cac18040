//! Structural check of tool arguments against the tool's input schema.
//!
//! Only the top level is checked: object shape, required fields, declared
//! property types (including `["integer", "null"]` unions), enums and
//! `additionalProperties: false`. Nested `$ref`s are left to deserialization.

use serde_json::Value;

/// Returns the first violation found, or `Ok(())`.
pub fn validate_arguments(args: &Value, schema: &Value) -> Result<(), String> {
    if let Some(types) = schema.get("type") {
        if !matches_any_type(args, types) {
            return Err(format!(
                "expected {} arguments, got {}",
                describe_types(types),
                json_type_name(args)
            ));
        }
    }

    let Some(obj) = args.as_object() else {
        return Ok(());
    };

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        if let Some(name) = required
            .iter()
            .filter_map(Value::as_str)
            .find(|name| !obj.contains_key(*name))
        {
            return Err(format!("missing required field '{name}'"));
        }
    }

    let properties = schema.get("properties").and_then(Value::as_object);
    let closed = schema.get("additionalProperties") == Some(&Value::Bool(false));

    for (key, value) in obj {
        let Some(prop_schema) = properties.and_then(|props| props.get(key)) else {
            if closed {
                return Err(format!("unexpected field '{key}'"));
            }
            continue;
        };

        if let Some(types) = prop_schema.get("type") {
            if !matches_any_type(value, types) {
                return Err(format!(
                    "field '{key}' expected type '{}', got {}",
                    describe_types(types),
                    json_type_name(value)
                ));
            }
        }

        if let Some(allowed) = prop_schema.get("enum").and_then(Value::as_array) {
            if !allowed.contains(value) {
                return Err(format!("field '{key}' is not one of the allowed values"));
            }
        }
    }

    Ok(())
}

fn matches_any_type(value: &Value, types: &Value) -> bool {
    match types {
        Value::String(expected) => value_matches_type(value, expected),
        Value::Array(options) => options
            .iter()
            .filter_map(Value::as_str)
            .any(|expected| value_matches_type(value, expected)),
        _ => true,
    }
}

fn value_matches_type(value: &Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn describe_types(types: &Value) -> String {
    match types {
        Value::Array(options) => options
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(" | "),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
