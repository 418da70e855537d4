//! Descriptor tree building.
//!
//! Merges a layout descriptor with schema information into a tree of
//! resolved render nodes, expanding schema objects into one child node per
//! property.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use regex::Regex;
use serde_json::{json, Value as JsonValue};
use tracing::debug;

use crate::display::{format_value, resolve_display_mapping};
use crate::error::RenderError;
use crate::infer::{infer_element_type, SchemaElement};
use crate::model::{DescriptorNode, ElementKind, NodeId, RenderDescription, RenderNode, RenderTree};
use crate::path::get_path;
use crate::schema::raw_schema_definition;

const DEFAULT_ELEMENT_PREFIX: &str = "render";

/// Source of unique default element-ID prefixes.
///
/// Thread one shared source through all builds that must not collide;
/// separate sources number independently. Passing the source explicitly
/// keeps prefix state out of process-wide globals.
#[derive(Debug, Default)]
pub struct ElementIdSource {
    counter: AtomicU64,
}

impl ElementIdSource {
    pub fn new() -> ElementIdSource {
        ElementIdSource::default()
    }

    /// Returns the next unique prefix (`render1`, `render2`, ...).
    pub fn next_prefix(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{DEFAULT_ELEMENT_PREFIX}{n}")
    }
}

/// Builds the render tree for a description.
///
/// The descriptor may be a list of entries, a single entry, a bare key
/// string, or `"*"` (expand every top-level schema property with the
/// default layout). The caller's descriptor values are copied, never
/// mutated; `schema` and `data` are read-only.
pub fn build_tree(
    description: &RenderDescription,
    ids: &ElementIdSource,
) -> Result<RenderTree, RenderError> {
    let prefix = description
        .prefix
        .clone()
        .unwrap_or_else(|| ids.next_prefix());
    debug!(prefix = %prefix, "building render tree");

    let mut tree = RenderTree::new(prefix.clone());
    let root = tree.root();

    for entry in descriptor_entries(&description.descriptor)? {
        if entry.as_str() == Some("*") {
            expand_all_properties(&mut tree, root, &description.schema, &prefix)?;
            continue;
        }
        build_node(&mut tree, root, entry, &description.schema, &prefix, false)?;
    }

    Ok(tree)
}

fn descriptor_entries(descriptor: &JsonValue) -> Result<Vec<&JsonValue>, RenderError> {
    match descriptor {
        JsonValue::Array(entries) => Ok(entries.iter().collect()),
        JsonValue::Object(_) | JsonValue::String(_) => Ok(vec![descriptor]),
        JsonValue::Null => Err(RenderError::DescriptorError(
            "description has no descriptor".to_string(),
        )),
        other => Err(RenderError::DescriptorError(format!(
            "descriptor must be a list, object, or string, found {}",
            crate::schema::json_type_name(other)
        ))),
    }
}

fn expand_all_properties(
    tree: &mut RenderTree,
    root: NodeId,
    schema: &JsonValue,
    prefix: &str,
) -> Result<(), RenderError> {
    let Some(properties) = schema.get("properties").and_then(JsonValue::as_object) else {
        return Ok(());
    };
    let keys: Vec<String> = properties.keys().cloned().collect();
    for key in keys {
        let entry = json!({ "key": key });
        build_node(tree, root, &entry, schema, prefix, false)?;
    }
    Ok(())
}

/// Builds one node (and its schema-driven children) from a descriptor
/// entry.
///
/// `lenient_ref` selects the treatment of `$ref`-obstructed definitions:
/// recursive child builds drop the node (`Ok(None)`); top-level lookups
/// (`lenient_ref = false`) raise instead.
fn build_node(
    tree: &mut RenderTree,
    parent: NodeId,
    raw_entry: &JsonValue,
    schema: &JsonValue,
    prefix: &str,
    lenient_ref: bool,
) -> Result<Option<NodeId>, RenderError> {
    let mut descriptor = DescriptorNode::from_value(raw_entry)?;

    // A keyless entry is purely structural: no schema lookup and no
    // schema-driven children.
    let Some(key) = descriptor.key.clone() else {
        let type_name = descriptor
            .element_type
            .clone()
            .unwrap_or_else(|| "none".to_string());
        let kind = lookup_kind(&type_name)?;
        let mut node = RenderNode::new(kind);
        node.id = descriptor.id.clone();
        node.title = descriptor.title.clone();
        node.description = descriptor.description.clone();
        node.name = descriptor.name.clone();
        node.descriptor = descriptor;
        return Ok(Some(tree.append_child(parent, node)));
    };

    let definition = match schema.get("properties") {
        Some(properties) => raw_schema_definition(properties, &key)?,
        None => None,
    };

    if let Some(def) = definition {
        if def.get("$ref").is_some() {
            if lenient_ref {
                debug!(key = %key, "dropping node whose schema definition uses $ref");
                return Ok(None);
            }
            return Err(RenderError::UnsupportedFeature(format!(
                "the schema definition for key '{}' uses the $ref keyword",
                key
            )));
        }
    }
    let Some(definition) = definition else {
        return Err(RenderError::SchemaMismatch(format!(
            "the descriptor references the schema key '{}' but that key does not exist in the schema",
            key
        )));
    };

    let element = SchemaElement::from_value(definition)?;

    // Descriptor properties override the schema element; schema properties
    // complete the descriptor otherwise.
    if descriptor.name.is_none() {
        descriptor.name = Some(key.clone());
    }
    if descriptor.title.is_none() {
        descriptor.title = element.title.clone();
    }
    if descriptor.description.is_none() {
        descriptor.description = element.description.clone();
    }
    if descriptor.id.is_none() {
        descriptor.id = Some(format!(
            "{}-elt-{}",
            escape_selector(prefix),
            slugify(&key)
        ));
    }

    let mut schema_element = definition.clone();
    let mut required = None;
    let effective_schema_type;

    let type_name = match descriptor.element_type.clone() {
        Some(explicit) => {
            // An explicit descriptor type skips inference entirely; the
            // raw schema type alone decides object expansion.
            effective_schema_type = definition
                .get("type")
                .and_then(JsonValue::as_str)
                .map(String::from);
            explicit
        }
        None => {
            let inference = infer_element_type(&element)?;
            required = inference.required;
            if let Some(normalized) = schema_element.as_object_mut() {
                if definition.get("type").is_some_and(JsonValue::is_array) {
                    match &inference.schema_type {
                        Some(single) => {
                            normalized.insert("type".to_string(), json!(single));
                        }
                        None => {
                            normalized.remove("type");
                        }
                    }
                }
                if let Some(req) = inference.required {
                    normalized.insert("required".to_string(), json!(req));
                }
                if inference.step_any {
                    normalized.insert("step".to_string(), json!("any"));
                }
            }
            effective_schema_type = inference.schema_type.clone();
            inference.display_type
        }
    };

    let kind = lookup_kind(&type_name)?;
    let mut node = RenderNode::new(kind);
    node.id = descriptor.id.clone();
    node.key = Some(key.clone());
    node.title = descriptor.title.clone();
    node.description = descriptor.description.clone();
    node.name = descriptor.name.clone();
    node.schema_element = Some(schema_element);
    node.required = required;
    node.descriptor = descriptor;
    let node_id = tree.append_child(parent, node);

    // An "object" definition expands into one child per schema property,
    // in declaration order; children obstructed by $ref drop out.
    if effective_schema_type.as_deref() == Some("object") {
        if let Some(properties) = definition.get("properties").and_then(JsonValue::as_object) {
            let child_keys: Vec<String> = properties.keys().cloned().collect();
            for property_name in child_keys {
                let child_entry = json!({ "key": format!("{}.{}", key, property_name) });
                build_node(tree, node_id, &child_entry, schema, prefix, true)?;
            }
        }
    }

    Ok(Some(node_id))
}

fn lookup_kind(name: &str) -> Result<ElementKind, RenderError> {
    ElementKind::from_name(name).ok_or_else(|| {
        RenderError::UnknownElementType(format!("no view definition for type '{}'", name))
    })
}

/// Escapes selector meta-characters so a prefix is usable inside an
/// element ID selector.
pub fn escape_selector(selector: &str) -> String {
    selector_regex().replace_all(selector, r"\$1").to_string()
}

fn selector_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r##"([ !"#$%&'()*+,./:;<=>?@\[\\\]^`{|}~])"##).expect("valid regex")
    })
}

/// Replaces spaces with underscores to form valid class names and IDs.
pub fn slugify(value: &str) -> String {
    value.replace(' ', "_")
}

impl RenderTree {
    /// Populates node values from `data`.
    ///
    /// A node whose descriptor carries a `display` mapping resolves
    /// through the mapping resolver; otherwise a keyed node reads its
    /// value straight from the data (booleans format as Yes/No, containers
    /// keep no value). Free nodes are untouched.
    pub fn compute_values(&mut self, data: &JsonValue) {
        for idx in 0..self.nodes.len() {
            let node = &self.nodes[idx];
            let computed = if let Some(mapping) = &node.descriptor.display {
                resolve_display_mapping(mapping, data)
            } else if let Some(key) = &node.key {
                get_path(data, key).and_then(scalar_value)
            } else {
                None
            };
            self.nodes[idx].value = computed;
        }
    }
}

fn scalar_value(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => None,
        other => Some(format_value(other)),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{build_tree, escape_selector, slugify, ElementIdSource};
    use crate::error::RenderError;
    use crate::model::{ElementKind, RenderDescription};

    fn description(descriptor: serde_json::Value, schema: serde_json::Value) -> RenderDescription {
        RenderDescription {
            descriptor,
            schema,
            data: json!({}),
            prefix: Some("p".to_string()),
        }
    }

    #[test]
    fn keyless_entry_builds_a_free_node() {
        let desc = description(json!({"title": "Section"}), json!({}));
        let tree = build_tree(&desc, &ElementIdSource::new()).unwrap();
        let node = tree.node(tree.node(tree.root()).children[0]);
        assert_eq!(node.element_type, ElementKind::None);
        assert_eq!(node.title.as_deref(), Some("Section"));
        assert!(node.schema_element.is_none());
        assert!(node.children.is_empty());
    }

    #[test]
    fn keyed_entry_takes_defaults_from_schema() {
        let schema = json!({
            "properties": {
                "name": { "type": "string", "title": "Full name", "description": "legal name" }
            }
        });
        let desc = description(json!([{ "key": "name" }]), schema);
        let tree = build_tree(&desc, &ElementIdSource::new()).unwrap();
        let node = tree.node(tree.node(tree.root()).children[0]);
        assert_eq!(node.element_type, ElementKind::Text);
        assert_eq!(node.name.as_deref(), Some("name"));
        assert_eq!(node.title.as_deref(), Some("Full name"));
        assert_eq!(node.description.as_deref(), Some("legal name"));
        assert_eq!(node.id.as_deref(), Some("p-elt-name"));
    }

    #[test]
    fn descriptor_overrides_schema_and_inference() {
        let schema = json!({"properties": {"name": {"type": "string", "title": "schema title"}}});
        let desc = description(
            json!([{ "key": "name", "type": "textarea", "title": "mine", "id": "custom" }]),
            schema,
        );
        let tree = build_tree(&desc, &ElementIdSource::new()).unwrap();
        let node = tree.node(tree.node(tree.root()).children[0]);
        assert_eq!(node.element_type, ElementKind::Textarea);
        assert_eq!(node.title.as_deref(), Some("mine"));
        assert_eq!(node.id.as_deref(), Some("custom"));
    }

    #[test]
    fn id_uses_escaped_prefix_and_slugified_key() {
        let schema = json!({"properties": {"full name": {"type": "string"}}});
        let mut desc = description(json!(["full name"]), schema);
        desc.prefix = Some("my.prefix".to_string());
        let tree = build_tree(&desc, &ElementIdSource::new()).unwrap();
        let node = tree.node(tree.node(tree.root()).children[0]);
        assert_eq!(node.id.as_deref(), Some(r"my\.prefix-elt-full_name"));
    }

    #[test]
    fn object_definition_expands_children_in_declaration_order() {
        let schema = json!({
            "properties": {
                "p": {
                    "type": "object",
                    "properties": {
                        "x": { "type": "string" },
                        "y": { "type": "number" }
                    }
                }
            }
        });
        let desc = description(json!(["p"]), schema);
        let tree = build_tree(&desc, &ElementIdSource::new()).unwrap();
        let fieldset = tree.node(tree.node(tree.root()).children[0]);
        assert_eq!(fieldset.element_type, ElementKind::Fieldset);
        assert_eq!(fieldset.children.len(), 2);
        let first = tree.node(fieldset.children[0]);
        let second = tree.node(fieldset.children[1]);
        assert_eq!(first.key.as_deref(), Some("p.x"));
        assert_eq!(second.key.as_deref(), Some("p.y"));
        assert_eq!(second.parent, Some(tree.node(tree.root()).children[0]));
    }

    #[test]
    fn unknown_key_raises_schema_mismatch() {
        let desc = description(json!(["ghost"]), json!({"properties": {}}));
        let err = build_tree(&desc, &ElementIdSource::new()).unwrap_err();
        assert!(matches!(err, RenderError::SchemaMismatch(_)));
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn top_level_ref_raises_while_nested_ref_drops() {
        let schema = json!({
            "properties": {
                "linked": { "$ref": "#/defs/x" },
                "holder": {
                    "type": "object",
                    "properties": {
                        "ok": { "type": "string" },
                        "linked": { "$ref": "#/defs/x" }
                    }
                }
            }
        });

        let desc = description(json!(["linked"]), schema.clone());
        let err = build_tree(&desc, &ElementIdSource::new()).unwrap_err();
        assert!(matches!(err, RenderError::UnsupportedFeature(_)));

        let desc = description(json!(["holder"]), schema);
        let tree = build_tree(&desc, &ElementIdSource::new()).unwrap();
        let holder = tree.node(tree.node(tree.root()).children[0]);
        // the $ref child dropped out silently
        assert_eq!(holder.children.len(), 1);
        assert_eq!(tree.node(holder.children[0]).key.as_deref(), Some("holder.ok"));
    }

    #[test]
    fn unknown_display_type_is_a_hard_error() {
        let schema = json!({"properties": {"k": {"type": "string"}}});
        let desc = description(json!([{ "key": "k", "type": "carousel" }]), schema);
        let err = build_tree(&desc, &ElementIdSource::new()).unwrap_err();
        assert!(matches!(err, RenderError::UnknownElementType(_)));
        assert!(err.to_string().contains("carousel"));
    }

    #[test]
    fn star_expands_every_top_level_property() {
        let schema = json!({
            "properties": {
                "a": { "type": "string" },
                "b": { "type": "boolean" },
                "c": { "type": "integer" }
            }
        });
        let desc = description(json!(["*"]), schema);
        let tree = build_tree(&desc, &ElementIdSource::new()).unwrap();
        let root = tree.node(tree.root());
        assert_eq!(root.children.len(), 3);
        assert_eq!(tree.node(root.children[0]).key.as_deref(), Some("a"));
        assert_eq!(
            tree.node(root.children[1]).element_type,
            ElementKind::Checkbox
        );
        assert_eq!(tree.node(root.children[2]).element_type, ElementKind::Number);
    }

    #[test]
    fn nullable_type_normalizes_copy_without_touching_input() {
        let schema = json!({"properties": {"age": {"type": ["number", "null"]}}});
        let desc = description(json!(["age"]), schema.clone());
        let tree = build_tree(&desc, &ElementIdSource::new()).unwrap();
        let node = tree.node(tree.node(tree.root()).children[0]);
        let normalized = node.schema_element.as_ref().unwrap();
        assert_eq!(normalized["type"], "number");
        assert_eq!(normalized["required"], false);
        assert_eq!(normalized["step"], "any");
        assert_eq!(node.required, Some(false));
        // caller's schema untouched
        assert_eq!(desc.schema, schema);
    }

    #[test]
    fn builder_is_idempotent_for_a_fixed_prefix() {
        let schema = json!({
            "properties": {
                "p": {
                    "type": "object",
                    "properties": { "x": { "type": "string" } }
                }
            }
        });
        let desc = description(json!(["p"]), schema);
        let ids = ElementIdSource::new();
        let first = build_tree(&desc, &ids).unwrap();
        let second = build_tree(&desc, &ids).unwrap();
        assert_eq!(first.to_json(), second.to_json());
    }

    #[test]
    fn generated_prefixes_are_unique_per_source() {
        let ids = ElementIdSource::new();
        let schema = json!({"properties": {"k": {"type": "string"}}});
        let mut desc = description(json!(["k"]), schema);
        desc.prefix = None;
        let first = build_tree(&desc, &ids).unwrap();
        let second = build_tree(&desc, &ids).unwrap();
        assert_ne!(first.prefix(), second.prefix());
    }

    #[test]
    fn compute_values_fills_keyed_and_mapped_leaves() {
        let schema = json!({
            "properties": {
                "name": { "type": "string" },
                "active": { "type": "boolean" },
                "badge": { "type": "string" }
            }
        });
        let descriptor = json!([
            "name",
            "active",
            { "key": "badge", "display": { "path": ["honors.badge"], "fallback": "none" } }
        ]);
        let desc = RenderDescription {
            descriptor,
            schema,
            data: json!({"name": "Ada", "active": true}),
            prefix: Some("p".to_string()),
        };
        let mut tree = build_tree(&desc, &ElementIdSource::new()).unwrap();
        tree.compute_values(&desc.data);

        let root_children = tree.node(tree.root()).children.clone();
        assert_eq!(tree.node(root_children[0]).value.as_deref(), Some("Ada"));
        assert_eq!(tree.node(root_children[1]).value.as_deref(), Some("Yes"));
        assert_eq!(tree.node(root_children[2]).value.as_deref(), Some("none"));
    }

    #[test]
    fn escape_and_slugify_behave() {
        assert_eq!(escape_selector("a.b:c"), r"a\.b\:c");
        assert_eq!(escape_selector("plain"), "plain");
        assert_eq!(slugify("full name"), "full_name");
    }
}
