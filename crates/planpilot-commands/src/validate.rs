//! Pre-dispatch validation of command arguments.
//!
//! Catches malformed arguments before a handler runs, with messages the
//! host agent can self-correct from instead of burning a command cycle
//! on a doomed call.

use crate::registry::CommandSpec;
use serde_json::{Map, Value};

pub(crate) fn validate_args(spec: &CommandSpec, args: &Map<String, Value>) -> Result<(), String> {
    let properties = spec.parameters.get("properties").and_then(Value::as_object);
    let required: Vec<&str> = spec
        .parameters
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    for name in &required {
        if !args.contains_key(*name) {
            return Err(format!("'{name}' is required"));
        }
    }
    for (name, value) in args {
        let Some(schema) = properties.and_then(|props| props.get(name)) else {
            return Err(format!("unexpected argument '{name}'"));
        };
        check_type(name, schema, value)?;
    }
    Ok(())
}

fn check_type(name: &str, schema: &Value, value: &Value) -> Result<(), String> {
    match schema.get("type") {
        Some(Value::String(expected)) => check_one(name, expected, value),
        // a union like ["integer", "string"] accepts any of its members
        Some(Value::Array(options)) => {
            let accepted = options
                .iter()
                .filter_map(Value::as_str)
                .any(|expected| check_one(name, expected, value).is_ok());
            if accepted {
                Ok(())
            } else {
                Err(format!(
                    "{name}: expected one of {}, got {value}",
                    schema["type"]
                ))
            }
        }
        _ => Ok(()),
    }
}

fn check_one(name: &str, expected: &str, value: &Value) -> Result<(), String> {
    let ok = match expected {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        _ => true,
    };
    if ok {
        Ok(())
    } else {
        Err(format!("{name}: expected {expected}, got {value}"))
    }
}
