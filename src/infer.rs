//! Display-type inference from schema definitions.
//!
//! When a descriptor entry does not declare a display type, the matched
//! schema definition decides it. Inference is a pure function over a typed
//! view of the definition; the caller's schema value is never mutated.

use serde_json::Value as JsonValue;

use crate::error::RenderError;

/// Typed read-only view of a schema definition node.
#[derive(Debug, Clone, Default)]
pub struct SchemaElement {
    /// Declared type names; a singular `type` is held as a one-element list.
    pub types: Vec<String>,
    pub format: Option<String>,
    pub enum_values: Option<Vec<JsonValue>>,
    pub has_properties: bool,
    pub title: Option<String>,
    pub description: Option<String>,
}

impl SchemaElement {
    /// Extracts the view from a raw definition value.
    ///
    /// Non-object definitions yield an empty element (no type, no enum),
    /// which infers to the `none` display type.
    pub fn from_value(definition: &JsonValue) -> Result<SchemaElement, RenderError> {
        let Some(map) = definition.as_object() else {
            return Ok(SchemaElement::default());
        };

        let types = match map.get("type") {
            None => Vec::new(),
            Some(JsonValue::String(name)) => vec![name.clone()],
            Some(JsonValue::Array(entries)) => {
                let mut types = Vec::with_capacity(entries.len());
                for entry in entries {
                    let name = entry.as_str().ok_or_else(|| {
                        RenderError::InvalidSchemaType(
                            "schema 'type' list entries must be strings".to_string(),
                        )
                    })?;
                    types.push(name.to_string());
                }
                types
            }
            Some(other) => {
                return Err(RenderError::InvalidSchemaType(format!(
                    "schema 'type' must be a string or list of strings, found {}",
                    crate::schema::json_type_name(other)
                )))
            }
        };

        Ok(SchemaElement {
            types,
            format: map.get("format").and_then(JsonValue::as_str).map(String::from),
            enum_values: map.get("enum").and_then(JsonValue::as_array).cloned(),
            has_properties: map.get("properties").is_some(),
            title: map.get("title").and_then(JsonValue::as_str).map(String::from),
            description: map
                .get("description")
                .and_then(JsonValue::as_str)
                .map(String::from),
        })
    }
}

/// Outcome of normalizing a type list and running the inference ladder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inference {
    /// Concrete display-type name (`text`, `checkbox`, ... or `none`).
    pub display_type: String,
    /// Single schema type remaining after `"null"` removal, if any.
    pub schema_type: Option<String>,
    /// Set to `false` when `"null"` was removed from a type list.
    pub required: Option<bool>,
    /// `true` for `number`-typed fields whose step is unconstrained.
    pub step_any: bool,
}

/// Collapses a type list to a single type.
///
/// A list containing `"null"` drops it and marks the field non-required;
/// more than one remaining entry is an [`RenderError::InvalidSchemaType`].
/// Returns `(single_type, required)`; `required` stays `None` when nothing
/// was removed.
pub fn normalize_types(types: &[String]) -> Result<(Option<String>, Option<bool>), RenderError> {
    let mut required = None;
    let filtered: Vec<&String> = types.iter().filter(|t| t.as_str() != "null").collect();
    if filtered.len() != types.len() {
        required = Some(false);
    }

    if filtered.len() > 1 {
        return Err(RenderError::InvalidSchemaType(
            "cannot process schema element with multiple types".to_string(),
        ));
    }

    Ok((filtered.first().map(|t| (*t).clone()), required))
}

/// Derives the display type for a schema element.
///
/// Rules, in order: `string`+`format:color` is `color`; `number`/`integer`
/// without enum is `number` (step unconstrained for `number`); `string`/
/// `any` without enum is `text`; `boolean` is `checkbox`; `object` is
/// `fieldset` when it declares properties, else freeform `textarea`; any
/// element with an enum is `select`; otherwise the raw schema type name is
/// used verbatim, or `none` when the element declares no type at all.
pub fn infer_element_type(element: &SchemaElement) -> Result<Inference, RenderError> {
    let (schema_type, required) = normalize_types(&element.types)?;
    let has_enum = element.enum_values.is_some();
    let t = schema_type.as_deref().unwrap_or("");

    let (display_type, step_any) = if t == "string" && element.format.as_deref() == Some("color") {
        ("color".to_string(), false)
    } else if (t == "number" || t == "integer") && !has_enum {
        ("number".to_string(), t == "number")
    } else if (t == "string" || t == "any") && !has_enum {
        ("text".to_string(), false)
    } else if t == "boolean" {
        ("checkbox".to_string(), false)
    } else if t == "object" {
        if element.has_properties {
            ("fieldset".to_string(), false)
        } else {
            ("textarea".to_string(), false)
        }
    } else if has_enum {
        ("select".to_string(), false)
    } else if t.is_empty() {
        ("none".to_string(), false)
    } else {
        (t.to_string(), false)
    };

    Ok(Inference {
        display_type,
        schema_type,
        required,
        step_any,
    })
}
