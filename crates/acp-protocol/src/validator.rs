//! Recursive structural validation of payloads against schema definitions.
//!
//! Covers the JSON Schema subset the protocol documents actually use:
//! `type`, `format` (integer width bounds), `enum`, `const`, numeric and
//! length bounds, object `required`/`properties`/`additionalProperties`,
//! array `items`, local `$ref`, and `allOf`/`anyOf`/`oneOf`. Not a general
//! JSON Schema implementation.
//!
//! Validation is fail-fast: the first mismatch aborts with a `$`-rooted path
//! (`$.key`, `$["odd-key"]`, `$[0]`). The failure is internal to this module
//! and is translated into an `InvalidParams` protocol error at the public
//! boundary, with the path embedded in the diagnostic.

use serde_json::{Map, Value};

use acp_core::{Error, Result};

use crate::registry::SchemaRegistry;

/// Internal structural failure, never surfaced directly.
#[derive(Debug, Clone)]
struct Failure {
    path: String,
    message: String,
}

impl Failure {
    fn new(path: &str, message: impl Into<String>) -> Self {
        Self {
            path: path.to_owned(),
            message: message.into(),
        }
    }
}

type Outcome = std::result::Result<(), Failure>;

/// Validates a payload against a named schema definition.
///
/// Fails with `InvalidParams` carrying the offending path in its diagnostic.
pub fn validate(registry: &SchemaRegistry, definition_name: &str, payload: &Value) -> Result<()> {
    let defs = registry.defs();
    let Some(schema) = defs.get(definition_name) else {
        return Err(invalid(
            definition_name,
            &Failure::new("$", format!("unknown schema definition {definition_name}")),
        ));
    };

    validate_node(schema, payload, defs, "$").map_err(|failure| invalid(definition_name, &failure))
}

fn invalid(definition_name: &str, failure: &Failure) -> Error {
    Error::invalid_params(format!(
        "invalid payload for {definition_name} at {}: {}",
        failure.path, failure.message
    ))
}

fn validate_node(schema: &Value, value: &Value, defs: &Map<String, Value>, path: &str) -> Outcome {
    match schema {
        Value::Null | Value::Bool(true) => return Ok(()),
        Value::Bool(false) => return Err(Failure::new(path, "value is not allowed")),
        Value::Object(_) => {}
        _ => return Err(Failure::new(path, "invalid schema node")),
    }

    if let Some(reference) = schema.get("$ref") {
        let target = resolve_ref(reference, defs, path)?;
        validate_node(target, value, defs, path)?;
    }

    // Legacy compatibility: any string passes for the canonical
    // ProtocolVersion definition (old releases used textual versions).
    if protocol_version_legacy_string(schema, value, defs) {
        return Ok(());
    }

    if let Some(type_spec) = schema.get("type") {
        validate_type(type_spec, value, path)?;
    }
    if let Some(format) = schema.get("format").and_then(Value::as_str) {
        validate_format(format, value, path)?;
    }
    if let Some(options) = schema.get("enum").and_then(Value::as_array) {
        if !options.contains(value) {
            return Err(Failure::new(path, format!("must be one of {options:?}")));
        }
    }
    if let Some(expected) = schema.get("const") {
        if value != expected {
            return Err(Failure::new(path, format!("must be {expected}")));
        }
    }
    validate_numeric_bounds(schema, value, path)?;
    validate_string_bounds(schema, value, path)?;
    validate_array_bounds(schema, value, path)?;

    validate_object(schema, value, defs, path)?;
    if let Some(items) = schema.get("items") {
        validate_items(items, value, defs, path)?;
    }

    if let Some(branches) = schema.get("allOf").and_then(Value::as_array) {
        for branch in branches {
            validate_node(branch, value, defs, path)?;
        }
    }
    if let Some(branches) = schema.get("anyOf").and_then(Value::as_array) {
        validate_any_of(branches, value, defs, path)?;
    }
    if let Some(branches) = schema.get("oneOf").and_then(Value::as_array) {
        validate_one_of(branches, value, defs, path)?;
    }

    Ok(())
}

/// Resolves a local `#/$defs/NAME` reference. Any other form is unsupported.
fn resolve_ref<'a>(
    reference: &Value,
    defs: &'a Map<String, Value>,
    path: &str,
) -> std::result::Result<&'a Value, Failure> {
    let Some(name) = reference
        .as_str()
        .and_then(|r| r.strip_prefix("#/$defs/"))
        .filter(|name| !name.is_empty() && !name.contains('/'))
    else {
        return Err(Failure::new(path, format!("unsupported $ref {reference}")));
    };
    defs.get(name)
        .ok_or_else(|| Failure::new(path, format!("unknown $ref #/$defs/{name}")))
}

fn validate_type(type_spec: &Value, value: &Value, path: &str) -> Outcome {
    let matched = match type_spec {
        Value::String(t) => type_match(t, value),
        Value::Array(types) => types
            .iter()
            .any(|t| t.as_str().is_some_and(|t| type_match(t, value))),
        _ => true,
    };
    if matched {
        return Ok(());
    }
    let expected = match type_spec {
        Value::String(t) => t.clone(),
        Value::Array(types) => types
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(" or "),
        other => other.to_string(),
    };
    Err(Failure::new(
        path,
        format!("expected {expected}, got {}", json_type(value)),
    ))
}

fn type_match(type_name: &str, value: &Value) -> bool {
    match type_name {
        "null" => value.is_null(),
        "boolean" => value.is_boolean(),
        "string" => value.is_string(),
        // Integer and number stay distinct: a float is never silently an int.
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        _ => false,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                "integer"
            } else {
                "number"
            }
        }
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn validate_format(format: &str, value: &Value, path: &str) -> Outcome {
    const I32: (i128, i128) = (i32::MIN as i128, i32::MAX as i128);
    const U32: (i128, i128) = (0, u32::MAX as i128);
    const I64: (i128, i128) = (i64::MIN as i128, i64::MAX as i128);
    const U64: (i128, i128) = (0, u64::MAX as i128);
    const U16: (i128, i128) = (0, u16::MAX as i128);

    let bounds = match format {
        "int32" => I32,
        "uint32" => U32,
        "int64" => I64,
        "uint64" => U64,
        "uint16" => U16,
        "double" => {
            if value.is_number() {
                return Ok(());
            }
            return Err(Failure::new(path, "must be a number for format double"));
        }
        _ => return Ok(()),
    };

    // Width formats only constrain integers; the type keyword handles the rest.
    let Some(n) = integer_value(value) else {
        return Ok(());
    };
    if n < bounds.0 || n > bounds.1 {
        return Err(Failure::new(
            path,
            format!("must be between {} and {}", bounds.0, bounds.1),
        ));
    }
    Ok(())
}

fn integer_value(value: &Value) -> Option<i128> {
    if let Some(n) = value.as_i64() {
        Some(i128::from(n))
    } else {
        value.as_u64().map(i128::from)
    }
}

fn validate_numeric_bounds(schema: &Value, value: &Value, path: &str) -> Outcome {
    let Some(n) = value.as_f64() else {
        return Ok(());
    };
    if let Some(min) = schema.get("minimum").and_then(Value::as_f64) {
        if n < min {
            return Err(Failure::new(path, format!("must be >= {min}")));
        }
    }
    if let Some(max) = schema.get("maximum").and_then(Value::as_f64) {
        if n > max {
            return Err(Failure::new(path, format!("must be <= {max}")));
        }
    }
    Ok(())
}

fn validate_string_bounds(schema: &Value, value: &Value, path: &str) -> Outcome {
    let Some(s) = value.as_str() else {
        return Ok(());
    };
    let len = s.chars().count() as u64;
    if let Some(min) = schema.get("minLength").and_then(Value::as_u64) {
        if len < min {
            return Err(Failure::new(path, format!("length must be >= {min}")));
        }
    }
    if let Some(max) = schema.get("maxLength").and_then(Value::as_u64) {
        if len > max {
            return Err(Failure::new(path, format!("length must be <= {max}")));
        }
    }
    Ok(())
}

fn validate_array_bounds(schema: &Value, value: &Value, path: &str) -> Outcome {
    let Some(items) = value.as_array() else {
        return Ok(());
    };
    let len = items.len() as u64;
    if let Some(min) = schema.get("minItems").and_then(Value::as_u64) {
        if len < min {
            return Err(Failure::new(path, format!("item count must be >= {min}")));
        }
    }
    if let Some(max) = schema.get("maxItems").and_then(Value::as_u64) {
        if len > max {
            return Err(Failure::new(path, format!("item count must be <= {max}")));
        }
    }
    Ok(())
}

fn validate_object(schema: &Value, value: &Value, defs: &Map<String, Value>, path: &str) -> Outcome {
    let Some(object) = value.as_object() else {
        return Ok(());
    };

    let properties = schema
        .get("properties")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    let additional = schema.get("additionalProperties");

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for key in required.iter().filter_map(Value::as_str) {
            if !object.contains_key(key) {
                return Err(Failure::new(&path_for_key(path, key), "is required"));
            }
        }
    }

    for (key, nested) in object {
        let nested_path = path_for_key(path, key);
        if let Some(property_schema) = properties.get(key) {
            validate_node(property_schema, nested, defs, &nested_path)?;
            continue;
        }
        match additional {
            Some(Value::Bool(false)) => {
                return Err(Failure::new(&nested_path, "additional property is not allowed"));
            }
            Some(policy @ Value::Object(_)) => {
                validate_node(policy, nested, defs, &nested_path)?;
            }
            _ => {}
        }
    }
    Ok(())
}

fn validate_items(items: &Value, value: &Value, defs: &Map<String, Value>, path: &str) -> Outcome {
    let Some(elements) = value.as_array() else {
        return Ok(());
    };
    match items {
        // Positional list: one schema per index, extras unchecked.
        Value::Array(schemas) => {
            for (index, item_schema) in schemas.iter().enumerate() {
                let Some(element) = elements.get(index) else {
                    break;
                };
                validate_node(item_schema, element, defs, &format!("{path}[{index}]"))?;
            }
        }
        _ => {
            for (index, element) in elements.iter().enumerate() {
                validate_node(items, element, defs, &format!("{path}[{index}]"))?;
            }
        }
    }
    Ok(())
}

fn validate_any_of(
    branches: &[Value],
    value: &Value,
    defs: &Map<String, Value>,
    path: &str,
) -> Outcome {
    let mut failures = Vec::new();
    for branch in branches {
        match validate_node(branch, value, defs, path) {
            Ok(()) => return Ok(()),
            Err(failure) => failures.push(failure),
        }
    }
    let closest = closest_failure(failures, path);
    Err(Failure::new(
        path,
        format!(
            "must match anyOf (closest mismatch at {}: {})",
            closest.path, closest.message
        ),
    ))
}

fn validate_one_of(
    branches: &[Value],
    value: &Value,
    defs: &Map<String, Value>,
    path: &str,
) -> Outcome {
    let mut matches = 0usize;
    let mut failures = Vec::new();
    for branch in branches {
        match validate_node(branch, value, defs, path) {
            Ok(()) => matches += 1,
            Err(failure) => failures.push(failure),
        }
    }
    match matches {
        1 => Ok(()),
        0 => {
            let closest = closest_failure(failures, path);
            Err(Failure::new(
                path,
                format!(
                    "must match exactly one schema in oneOf (closest mismatch at {}: {})",
                    closest.path, closest.message
                ),
            ))
        }
        n => Err(Failure::new(
            path,
            format!("must match exactly one schema in oneOf (matched {n})"),
        )),
    }
}

/// The structurally deepest branch failure makes the most useful diagnostic.
fn closest_failure(failures: Vec<Failure>, path: &str) -> Failure {
    failures
        .into_iter()
        .max_by_key(|failure| failure.path.len())
        .unwrap_or_else(|| Failure::new(path, "is invalid"))
}

fn path_for_key(path: &str, key: &str) -> String {
    let mut chars = key.chars();
    let plain = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if plain {
        format!("{path}.{key}")
    } else {
        format!("{path}[{key:?}]")
    }
}

fn protocol_version_legacy_string(schema: &Value, value: &Value, defs: &Map<String, Value>) -> bool {
    if !value.is_string() {
        return false;
    }
    // Identified by structural equality to the canonical definition; fragile
    // under schema duplication, see the registry docs.
    defs.get("ProtocolVersion").is_some_and(|canonical| schema == canonical)
}
