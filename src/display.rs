//! Display-mapping resolution.
//!
//! A display-mapping object is either `{text}` (a literal) or
//! `{path, fallback?, schema?}` (an ordered list of path expressions tried
//! against the data, first match wins, optionally guarded by a schema).
//! Resolution never fails: anything that goes wrong falls back to the
//! mapping's `fallback` value or to no value at all.

use serde_json::Value as JsonValue;
use tracing::debug;

use crate::path::get_path;
use crate::schema::validate_value;

/// Resolves a display-mapping object against `data`.
///
/// `text` mappings return their literal (string-checked; anything else
/// resolves to nothing). `path` mappings try each expression left to
/// right; the first expression matching a present value wins. A value
/// failing the optional `schema` guard — including guard evaluation
/// errors — falls back, never errors. Booleans format as `"Yes"`/`"No"`;
/// other values pass through unchanged.
pub fn resolve_display_mapping(mapping: &JsonValue, data: &JsonValue) -> Option<String> {
    let map = mapping.as_object()?;

    if let Some(text) = map.get("text") {
        return text.as_str().map(String::from);
    }

    if let Some(path) = map.get("path") {
        let fallback = map.get("fallback").and_then(JsonValue::as_str).map(String::from);

        let Some(expressions) = path.as_array() else {
            return fallback;
        };
        let Some(value) = first_matching_path(expressions, data) else {
            return fallback;
        };

        if let Some(guard) = map.get("schema") {
            if let Err(reason) = validate_value(value, guard, "$") {
                debug!(%reason, "display mapping value failed schema guard, using fallback");
                return fallback;
            }
        }

        return Some(format_value(value));
    }

    None
}

/// A labeled display mapping: the resolved value plus its sibling `label`.
///
/// The label is surfaced alongside the value but never participates in
/// path resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledDisplayValue {
    pub label: Option<String>,
    pub value: Option<String>,
}

/// Resolves a labeled display-mapping object against `data`.
pub fn resolve_labeled_display_mapping(
    mapping: &JsonValue,
    data: &JsonValue,
) -> LabeledDisplayValue {
    let label = mapping
        .as_object()
        .and_then(|map| map.get("label"))
        .and_then(JsonValue::as_str)
        .map(String::from);
    LabeledDisplayValue {
        label,
        value: resolve_display_mapping(mapping, data),
    }
}

/// Returns the first value matched by any expression, in order.
///
/// Expressions may be plain path expressions (`a.b[0]`) or `$`-rooted
/// (`$.a.b[0]`); non-string entries never match.
fn first_matching_path<'a>(
    expressions: &[JsonValue],
    data: &'a JsonValue,
) -> Option<&'a JsonValue> {
    for expression in expressions {
        let Some(raw) = expression.as_str() else {
            continue;
        };
        if let Some(value) = query_first(data, raw) {
            return Some(value);
        }
    }
    None
}

fn query_first<'a>(data: &'a JsonValue, expression: &str) -> Option<&'a JsonValue> {
    let normalized = expression
        .strip_prefix("$.")
        .or_else(|| expression.strip_prefix('$'))
        .unwrap_or(expression);
    if normalized.is_empty() {
        return Some(data);
    }
    get_path(data, normalized)
}

/// Formats a resolved value for display. Booleans read as Yes/No; other
/// values pass through unchanged.
pub(crate) fn format_value(value: &JsonValue) -> String {
    match value {
        JsonValue::Bool(true) => "Yes".to_string(),
        JsonValue::Bool(false) => "No".to_string(),
        JsonValue::String(v) => v.clone(),
        other => other.to_string(),
    }
}
