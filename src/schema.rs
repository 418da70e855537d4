//! Schema-path translation, definition lookup, and value validation.
//!
//! Supported validation keyword subset:
//! - Common: `type` (scalar or list), `enum`
//! - Numeric: `minimum`, `maximum`, `exclusiveMinimum`, `exclusiveMaximum`
//! - String: `minLength`, `maxLength`, `pattern`
//! - Object: `properties`, `required`
//! - Array: `items`, `minItems`, `maxItems`

use regex::Regex;
use serde_json::Value as JsonValue;

use crate::error::RenderError;
use crate::path::{get_path_first, parse_path};

const MAX_VALIDATION_DEPTH: usize = 64;

/// Rewrites a data-object path into the equivalent path through a JSON
/// schema's `properties`/`items` structure.
///
/// Every `.` becomes `.properties.` and every bracketed index (`[3]` or
/// the `[]` wildcard) becomes `.items` — the index value is discarded
/// because a schema has one `items` definition per array regardless of
/// length. For instance `a.b[2].c` rewrites to
/// `a.properties.b.items.properties.c`.
pub fn to_schema_path(data_path: &str) -> Result<String, RenderError> {
    let segments = parse_path(data_path)?;
    let mut out = String::new();

    for segment in &segments {
        if segment.key.is_empty() {
            return Err(RenderError::PathError(format!(
                "schema path translation requires named segments in '{}'",
                data_path
            )));
        }
        if out.is_empty() {
            out.push_str(&segment.key);
        } else {
            out.push_str(".properties.");
            out.push_str(&segment.key);
        }
        for _ in &segment.indices {
            out.push_str(".items");
        }
    }

    Ok(out)
}

/// Retrieves the definition for a data key from a schema's `properties`
/// map.
///
/// The lookup runs with the array-tolerant path walk so that an `items`
/// given as a one-element list of schemas still resolves (tuple-typed
/// `items` beyond the first entry is not supported). A resolved
/// definition carrying `$ref` raises [`RenderError::UnsupportedFeature`];
/// `$ref` resolution is out of scope.
pub fn schema_definition<'a>(
    schema_properties: &'a JsonValue,
    key: &str,
) -> Result<Option<&'a JsonValue>, RenderError> {
    let definition = raw_schema_definition(schema_properties, key)?;
    if let Some(def) = definition {
        if def.get("$ref").is_some() {
            return Err(RenderError::UnsupportedFeature(format!(
                "the schema definition for key '{}' uses the $ref keyword",
                key
            )));
        }
    }
    Ok(definition)
}

/// [`schema_definition`] without the `$ref` rejection: the caller decides
/// how a `$ref`-carrying definition is treated.
pub fn raw_schema_definition<'a>(
    schema_properties: &'a JsonValue,
    key: &str,
) -> Result<Option<&'a JsonValue>, RenderError> {
    let schema_path = to_schema_path(key)?;
    Ok(get_path_first(schema_properties, &schema_path))
}

/// Validates a JSON value against a schema definition.
///
/// `path` is used only for error messages.
pub fn validate_value(
    value: &JsonValue,
    schema: &JsonValue,
    path: &str,
) -> Result<(), RenderError> {
    validate_value_inner(value, schema, path, 0)
}

fn validate_value_inner(
    value: &JsonValue,
    schema: &JsonValue,
    path: &str,
    depth: usize,
) -> Result<(), RenderError> {
    if depth > MAX_VALIDATION_DEPTH {
        return Err(RenderError::ValidationError(format!(
            "validation exceeded max depth ({MAX_VALIDATION_DEPTH}) at {path}"
        )));
    }

    let schema_obj = schema.as_object().ok_or_else(|| {
        RenderError::ValidationError(format!(
            "schema at {path} must be an object, found {}",
            json_type_name(schema)
        ))
    })?;

    if schema_obj.get("$ref").is_some() {
        return Err(RenderError::UnsupportedFeature(format!(
            "schema at {path} uses the $ref keyword"
        )));
    }

    if let Some(type_value) = schema_obj.get("type") {
        validate_type_keyword(value, type_value, path)?;
    }

    if let Some(enum_value) = schema_obj.get("enum") {
        let options = enum_value.as_array().ok_or_else(|| {
            RenderError::ValidationError(format!("schema 'enum' at {path} must be an array"))
        })?;
        if !options.iter().any(|candidate| candidate == value) {
            return Err(RenderError::ValidationError(format!(
                "enum mismatch at {path}: value {value} not in enum set"
            )));
        }
    }

    validate_numeric_keywords(value, schema_obj, path)?;
    validate_string_keywords(value, schema_obj, path)?;
    validate_object_keywords(value, schema_obj, path, depth)?;
    validate_array_keywords(value, schema_obj, path, depth)?;

    Ok(())
}

fn validate_type_keyword(
    value: &JsonValue,
    type_value: &JsonValue,
    path: &str,
) -> Result<(), RenderError> {
    let names: Vec<&str> = match type_value {
        JsonValue::String(name) => vec![name.as_str()],
        JsonValue::Array(entries) => {
            let mut names = Vec::with_capacity(entries.len());
            for entry in entries {
                names.push(entry.as_str().ok_or_else(|| {
                    RenderError::ValidationError(format!(
                        "schema 'type' entries at {path} must be strings"
                    ))
                })?);
            }
            names
        }
        _ => {
            return Err(RenderError::ValidationError(format!(
                "schema 'type' at {path} must be a string or list of strings"
            )))
        }
    };

    if !names.iter().any(|name| json_matches_type(value, name)) {
        return Err(RenderError::ValidationError(format!(
            "type mismatch at {path}: expected {}, found {}",
            names.join(" or "),
            json_type_name(value)
        )));
    }
    Ok(())
}

fn validate_numeric_keywords(
    value: &JsonValue,
    schema: &serde_json::Map<String, JsonValue>,
    path: &str,
) -> Result<(), RenderError> {
    let val = match value.as_f64() {
        Some(v) => v,
        None => return Ok(()),
    };

    if let Some(minimum) = schema.get("minimum") {
        let min = minimum.as_f64().ok_or_else(|| {
            RenderError::ValidationError(format!("minimum at {path} must be a number"))
        })?;
        if val < min {
            return Err(RenderError::ValidationError(format!(
                "minimum violation at {path}: {val} < {min}"
            )));
        }
    }

    if let Some(maximum) = schema.get("maximum") {
        let max = maximum.as_f64().ok_or_else(|| {
            RenderError::ValidationError(format!("maximum at {path} must be a number"))
        })?;
        if val > max {
            return Err(RenderError::ValidationError(format!(
                "maximum violation at {path}: {val} > {max}"
            )));
        }
    }

    if let Some(exclusive_minimum) = schema.get("exclusiveMinimum") {
        let min = exclusive_minimum.as_f64().ok_or_else(|| {
            RenderError::ValidationError(format!("exclusiveMinimum at {path} must be a number"))
        })?;
        if val <= min {
            return Err(RenderError::ValidationError(format!(
                "exclusiveMinimum violation at {path}: {val} <= {min}"
            )));
        }
    }

    if let Some(exclusive_maximum) = schema.get("exclusiveMaximum") {
        let max = exclusive_maximum.as_f64().ok_or_else(|| {
            RenderError::ValidationError(format!("exclusiveMaximum at {path} must be a number"))
        })?;
        if val >= max {
            return Err(RenderError::ValidationError(format!(
                "exclusiveMaximum violation at {path}: {val} >= {max}"
            )));
        }
    }

    Ok(())
}

fn validate_string_keywords(
    value: &JsonValue,
    schema: &serde_json::Map<String, JsonValue>,
    path: &str,
) -> Result<(), RenderError> {
    let s = match value.as_str() {
        Some(v) => v,
        None => return Ok(()),
    };

    if let Some(min_len) = schema.get("minLength") {
        let min = min_len.as_u64().ok_or_else(|| {
            RenderError::ValidationError(format!("minLength at {path} must be an integer"))
        })?;
        if (s.chars().count() as u64) < min {
            return Err(RenderError::ValidationError(format!(
                "minLength violation at {path}: {} < {min}",
                s.chars().count()
            )));
        }
    }

    if let Some(max_len) = schema.get("maxLength") {
        let max = max_len.as_u64().ok_or_else(|| {
            RenderError::ValidationError(format!("maxLength at {path} must be an integer"))
        })?;
        if (s.chars().count() as u64) > max {
            return Err(RenderError::ValidationError(format!(
                "maxLength violation at {path}: {} > {max}",
                s.chars().count()
            )));
        }
    }

    if let Some(pattern) = schema.get("pattern") {
        let pat = pattern.as_str().ok_or_else(|| {
            RenderError::ValidationError(format!("pattern at {path} must be a string"))
        })?;
        let re = Regex::new(pat).map_err(|e| {
            RenderError::ValidationError(format!("invalid pattern '{pat}' at {path}: {e}"))
        })?;
        if !re.is_match(s) {
            return Err(RenderError::ValidationError(format!(
                "pattern violation at {path}: '{s}' does not match '{pat}'"
            )));
        }
    }

    Ok(())
}

fn validate_object_keywords(
    value: &JsonValue,
    schema: &serde_json::Map<String, JsonValue>,
    path: &str,
    depth: usize,
) -> Result<(), RenderError> {
    let obj = match value.as_object() {
        Some(v) => v,
        None => return Ok(()),
    };

    if let Some(required) = schema.get("required") {
        let entries = required.as_array().ok_or_else(|| {
            RenderError::ValidationError(format!("required at {path} must be an array"))
        })?;
        for entry in entries {
            let key = entry.as_str().ok_or_else(|| {
                RenderError::ValidationError(format!(
                    "required entries at {path} must be strings"
                ))
            })?;
            if !obj.contains_key(key) {
                return Err(RenderError::ValidationError(format!(
                    "required property missing at {path}: '{key}'"
                )));
            }
        }
    }

    if let Some(props) = schema.get("properties") {
        let prop_map = props.as_object().ok_or_else(|| {
            RenderError::ValidationError(format!("properties at {path} must be an object"))
        })?;
        for (key, child_schema) in prop_map {
            if let Some(child_value) = obj.get(key) {
                let child_path = format!("{}.{}", path, key);
                validate_value_inner(child_value, child_schema, &child_path, depth + 1)?;
            }
        }
    }

    Ok(())
}

fn validate_array_keywords(
    value: &JsonValue,
    schema: &serde_json::Map<String, JsonValue>,
    path: &str,
    depth: usize,
) -> Result<(), RenderError> {
    let arr = match value.as_array() {
        Some(v) => v,
        None => return Ok(()),
    };

    if let Some(min_items) = schema.get("minItems") {
        let min = min_items.as_u64().ok_or_else(|| {
            RenderError::ValidationError(format!("minItems at {path} must be an integer"))
        })?;
        if (arr.len() as u64) < min {
            return Err(RenderError::ValidationError(format!(
                "minItems violation at {path}: {} < {min}",
                arr.len()
            )));
        }
    }

    if let Some(max_items) = schema.get("maxItems") {
        let max = max_items.as_u64().ok_or_else(|| {
            RenderError::ValidationError(format!("maxItems at {path} must be an integer"))
        })?;
        if (arr.len() as u64) > max {
            return Err(RenderError::ValidationError(format!(
                "maxItems violation at {path}: {} > {max}",
                arr.len()
            )));
        }
    }

    if let Some(items_schema) = schema.get("items") {
        for (idx, item) in arr.iter().enumerate() {
            let child_path = format!("{}[{}]", path, idx);
            validate_value_inner(item, items_schema, &child_path, depth + 1)?;
        }
    }

    Ok(())
}

fn json_matches_type(value: &JsonValue, type_name: &str) -> bool {
    match type_name {
        "string" => value.is_string(),
        "integer" => value.as_i64().is_some() || value.as_u64().is_some(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        "any" => true,
        _ => false,
    }
}

pub(crate) fn json_type_name(value: &JsonValue) -> &'static str {
    if value.is_null() {
        "null"
    } else if value.is_boolean() {
        "boolean"
    } else if value.as_i64().is_some() || value.as_u64().is_some() {
        "integer"
    } else if value.is_number() {
        "number"
    } else if value.is_string() {
        "string"
    } else if value.is_array() {
        "array"
    } else {
        "object"
    }
}
