//! Path addressing into nested JSON structures.
//!
//! Paths are dot-separated segments; a segment may carry one or more
//! trailing `[n]` indices, e.g. `foo.bar[3].baz` or `matrix[0][2]`.
//! The empty-bracket form `[]` is the wildcard used in schema paths to
//! mean "any array item"; it parses but never addresses a data value.

use serde_json::Value as JsonValue;

use crate::error::RenderError;

const MAX_PATH_SEGMENTS: usize = 256;

/// A single array index inside a path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Index {
    /// Concrete zero-based index, `[3]`.
    Nth(usize),
    /// Wildcard `[]`; only meaningful in schema paths.
    Any,
}

/// One dot-separated segment of a path expression.
///
/// `key` is empty when the segment starts with a bracket (`[0].name`),
/// which indexes the current node directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    pub key: String,
    pub indices: Vec<Index>,
}

/// Parses a path expression into segments.
///
/// Rejects empty segments, non-numeric indices, and unbalanced brackets.
pub fn parse_path(path: &str) -> Result<Vec<PathSegment>, RenderError> {
    if path.is_empty() {
        return Err(RenderError::PathError("empty path expression".to_string()));
    }

    let mut out = Vec::new();
    for raw_segment in path.split('.') {
        if out.len() >= MAX_PATH_SEGMENTS {
            return Err(RenderError::PathError(format!(
                "path '{}' exceeds max segment count ({MAX_PATH_SEGMENTS})",
                path
            )));
        }
        out.push(parse_segment(raw_segment, path)?);
    }

    Ok(out)
}

fn parse_segment(raw: &str, path: &str) -> Result<PathSegment, RenderError> {
    let key_end = raw.find('[').unwrap_or(raw.len());
    let key = &raw[..key_end];
    let mut indices = Vec::new();

    let mut rest = &raw[key_end..];
    while !rest.is_empty() {
        let Some(stripped) = rest.strip_prefix('[') else {
            return Err(RenderError::PathError(format!(
                "unexpected character after index in segment '{}' of '{}'",
                raw, path
            )));
        };
        let Some(close) = stripped.find(']') else {
            return Err(RenderError::PathError(format!(
                "unbalanced brackets in segment '{}' of '{}'",
                raw, path
            )));
        };
        let digits = &stripped[..close];
        if digits.is_empty() {
            indices.push(Index::Any);
        } else {
            let idx: usize = digits.parse().map_err(|_| {
                RenderError::PathError(format!(
                    "invalid array index '{}' in segment '{}' of '{}'",
                    digits, raw, path
                ))
            })?;
            indices.push(Index::Nth(idx));
        }
        rest = &stripped[close + 1..];
    }

    if key.is_empty() && indices.is_empty() {
        return Err(RenderError::PathError(format!(
            "empty segment in path '{}'",
            path
        )));
    }

    Ok(PathSegment {
        key: key.to_string(),
        indices,
    })
}

/// Retrieves the value identified by `path` inside `root`.
///
/// Returns `None` as soon as traversal hits a non-container, a missing
/// property, an out-of-range index, or an index over a non-array. A path
/// that fails to parse also yields `None`.
pub fn get_path<'a>(root: &'a JsonValue, path: &str) -> Option<&'a JsonValue> {
    get_path_inner(root, path, false)
}

/// `get_path` variant that tolerates arrays standing in for objects.
///
/// When a property lookup misses but the current node is a non-empty array
/// whose first element has the property, traversal descends into element 0
/// and continues. A final value that is itself a non-empty array is
/// replaced by its first element. This mirrors how a JSON schema's `items`
/// may be either a single schema or a one-element list of schemas.
pub fn get_path_first<'a>(root: &'a JsonValue, path: &str) -> Option<&'a JsonValue> {
    get_path_inner(root, path, true)
}

fn get_path_inner<'a>(
    root: &'a JsonValue,
    path: &str,
    ignore_arrays: bool,
) -> Option<&'a JsonValue> {
    let segments = parse_path(path).ok()?;
    let mut current = root;

    for segment in &segments {
        if !current.is_object() && !current.is_array() {
            return None;
        }

        if segment.indices.is_empty() {
            current = lookup_property(current, &segment.key, ignore_arrays)?;
            continue;
        }

        // Indexed segment: consult the property name once, then each
        // further index descends one array level directly.
        let mut node = if segment.key.is_empty() {
            current
        } else {
            let candidate = current.as_object()?.get(&segment.key)?;
            if !candidate.is_array() {
                return None;
            }
            candidate
        };
        for index in &segment.indices {
            let Index::Nth(i) = index else {
                return None;
            };
            node = node.as_array()?.get(*i)?;
        }
        current = node;
    }

    if ignore_arrays {
        if let Some(arr) = current.as_array() {
            if let Some(first) = arr.first() {
                return Some(first);
            }
        }
    }
    Some(current)
}

fn lookup_property<'a>(
    current: &'a JsonValue,
    key: &str,
    ignore_arrays: bool,
) -> Option<&'a JsonValue> {
    if let Some(found) = current.as_object().and_then(|map| map.get(key)) {
        return Some(found);
    }
    if ignore_arrays {
        if let Some(first) = current.as_array().and_then(|arr| arr.first()) {
            return first.as_object()?.get(key);
        }
    }
    None
}

/// Sets the value identified by `path` inside `root`, creating the
/// hierarchy as needed.
///
/// Missing intermediate mappings are created as empty objects; missing
/// sequences (detected by index-bearing segments) are created empty and
/// padded with `null` so that index assignment extends rather than
/// requiring pre-sized arrays. Scalar intermediates are replaced.
pub fn set_path(root: &mut JsonValue, path: &str, value: JsonValue) -> Result<(), RenderError> {
    let segments = parse_path(path)?;

    for segment in &segments {
        if segment.key.is_empty() {
            return Err(RenderError::PathError(format!(
                "cannot assign through a bare index segment in '{}'",
                path
            )));
        }
        if segment.indices.iter().any(|i| matches!(i, Index::Any)) {
            return Err(RenderError::PathError(format!(
                "cannot assign through a wildcard index in '{}'",
                path
            )));
        }
    }

    if !root.is_object() {
        return Err(RenderError::PathError(format!(
            "cannot set '{}': root is not an object",
            path
        )));
    }

    let (last, intermediate) = segments.split_last().expect("non-empty path");

    let mut current = root;
    for segment in intermediate {
        current = descend_create(current, segment, path)?;
    }

    let map = current.as_object_mut().ok_or_else(|| {
        RenderError::PathError(format!(
            "expected object at segment '{}' of '{}'",
            last.key, path
        ))
    })?;

    if last.indices.is_empty() {
        map.insert(last.key.clone(), value);
        return Ok(());
    }

    // Indexed final segment: materialize the array chain, then assign at
    // the deepest index.
    let slot = map
        .entry(last.key.clone())
        .or_insert_with(|| JsonValue::Array(Vec::new()));
    if !slot.is_array() {
        *slot = JsonValue::Array(Vec::new());
    }

    let (final_index, lead_indices) = last.indices.split_last().expect("indexed segment");
    let mut node = slot;
    for index in lead_indices {
        let Index::Nth(i) = index else { unreachable!() };
        let arr = node.as_array_mut().expect("slot materialized as array");
        while arr.len() <= *i {
            arr.push(JsonValue::Null);
        }
        if !arr[*i].is_array() {
            arr[*i] = JsonValue::Array(Vec::new());
        }
        node = &mut arr[*i];
    }

    let Index::Nth(i) = final_index else { unreachable!() };
    let arr = node.as_array_mut().expect("slot materialized as array");
    while arr.len() <= *i {
        arr.push(JsonValue::Null);
    }
    arr[*i] = value;
    Ok(())
}

/// Walks one intermediate segment, creating missing structure.
///
/// The returned node is always a container: objects are created under
/// plain keys, arrays under indexed keys, and scalars in the way are
/// replaced.
fn descend_create<'a>(
    current: &'a mut JsonValue,
    segment: &PathSegment,
    path: &str,
) -> Result<&'a mut JsonValue, RenderError> {
    let map = current.as_object_mut().ok_or_else(|| {
        RenderError::PathError(format!(
            "expected object at segment '{}' of '{}'",
            segment.key, path
        ))
    })?;

    if segment.indices.is_empty() {
        let entry = map
            .entry(segment.key.clone())
            .or_insert_with(|| JsonValue::Object(Default::default()));
        if !entry.is_object() && !entry.is_array() {
            *entry = JsonValue::Object(Default::default());
        }
        return Ok(entry);
    }

    let slot = map
        .entry(segment.key.clone())
        .or_insert_with(|| JsonValue::Array(Vec::new()));
    if !slot.is_array() {
        *slot = JsonValue::Array(Vec::new());
    }

    let count = segment.indices.len();
    let mut node = slot;
    for (depth, index) in segment.indices.iter().enumerate() {
        let Index::Nth(i) = index else { unreachable!() };
        let arr = node.as_array_mut().expect("slot materialized as array");
        while arr.len() <= *i {
            arr.push(JsonValue::Null);
        }
        if depth == count - 1 {
            // a further segment follows, so this element must hold keys
            if !arr[*i].is_object() && !arr[*i].is_array() {
                arr[*i] = JsonValue::Object(Default::default());
            }
        } else if !arr[*i].is_array() {
            arr[*i] = JsonValue::Array(Vec::new());
        }
        node = &mut arr[*i];
    }
    Ok(node)
}
