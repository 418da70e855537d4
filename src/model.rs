//! Public document model used by the tree builder and resolver APIs.

use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::error::RenderError;

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Caller-supplied description of one render: the descriptor tree, the
/// schema constraining the data, the data payload, and ID options.
pub struct RenderDescription {
    /// Descriptor tree: a list of descriptor entries, a single entry
    /// object, a bare key string, or `"*"`.
    pub descriptor: JsonValue,
    /// JSON-Schema-shaped object (subset: `type`, `format`, `enum`,
    /// `properties`, `items`, `title`, `description`; `$ref` unsupported).
    #[serde(default)]
    pub schema: JsonValue,
    /// Arbitrary JSON-compatible value tree to resolve values from.
    #[serde(default)]
    pub data: JsonValue,
    /// Overrides default element-ID prefix generation.
    #[serde(default)]
    pub prefix: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
/// One entry in the caller-supplied descriptor tree.
///
/// Entries are copied (never aliased) into the engine, so the caller's
/// tree is not mutated.
pub struct DescriptorNode {
    /// Path into the data object (`foo.bar[3].baz`). Absent for purely
    /// structural nodes.
    pub key: Option<String>,
    /// Explicit display type; inferred from the schema when absent.
    #[serde(rename = "type")]
    pub element_type: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    /// Field name; defaults to the key.
    pub name: Option<String>,
    /// Element identifier; computed from the prefix and key when absent.
    pub id: Option<String>,
    /// Child item descriptors; a singular value is normalized to a
    /// one-element list.
    pub items: Option<JsonValue>,
    /// Display-mapping object (`{text}` or `{path, fallback?, schema?}`)
    /// driving this node's resolved value.
    pub display: Option<JsonValue>,
    /// Named event-intent hooks. Accepted and carried, never interpreted.
    pub handlers: Option<JsonValue>,
    /// Remaining display attributes, passed through untouched.
    #[serde(flatten)]
    pub extra: JsonMap<String, JsonValue>,
}

impl DescriptorNode {
    /// Copies a raw descriptor entry into a typed node.
    ///
    /// A bare string is shorthand for `{ "key": <string> }`. A singular
    /// `items` value is normalized to a one-element list.
    pub fn from_value(value: &JsonValue) -> Result<DescriptorNode, RenderError> {
        match value {
            JsonValue::String(key) => Ok(DescriptorNode {
                key: Some(key.clone()),
                ..DescriptorNode::default()
            }),
            JsonValue::Object(_) => {
                let mut node: DescriptorNode =
                    serde_json::from_value(value.clone()).map_err(|e| {
                        RenderError::DescriptorError(format!("invalid descriptor entry: {e}"))
                    })?;
                if let Some(items) = node.items.take() {
                    node.items = Some(match items {
                        JsonValue::Array(_) => items,
                        singular => JsonValue::Array(vec![singular]),
                    });
                }
                Ok(node)
            }
            other => Err(RenderError::DescriptorError(format!(
                "descriptor entry must be a string or object, found {}",
                crate::schema::json_type_name(other)
            ))),
        }
    }
}

/// Registry of known display kinds. Rendering cannot proceed for a type
/// outside this set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Root,
    None,
    String,
    Image,
    Text,
    Color,
    Number,
    Checkbox,
    Select,
    Fieldset,
    Textarea,
}

impl ElementKind {
    /// Looks a display-type name up in the registry.
    pub fn from_name(name: &str) -> Option<ElementKind> {
        match name {
            "root" => Some(ElementKind::Root),
            "none" => Some(ElementKind::None),
            "string" => Some(ElementKind::String),
            "image" => Some(ElementKind::Image),
            "text" => Some(ElementKind::Text),
            "color" => Some(ElementKind::Color),
            "number" => Some(ElementKind::Number),
            "checkbox" => Some(ElementKind::Checkbox),
            "select" => Some(ElementKind::Select),
            "fieldset" => Some(ElementKind::Fieldset),
            "textarea" => Some(ElementKind::Textarea),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ElementKind::Root => "root",
            ElementKind::None => "none",
            ElementKind::String => "string",
            ElementKind::Image => "image",
            ElementKind::Text => "text",
            ElementKind::Color => "color",
            ElementKind::Number => "number",
            ElementKind::Checkbox => "checkbox",
            ElementKind::Select => "select",
            ElementKind::Fieldset => "fieldset",
            ElementKind::Textarea => "textarea",
        }
    }
}

/// Handle to a node in a [`RenderTree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub(crate) usize);

#[derive(Debug, Clone)]
/// One resolved node of the render tree.
pub struct RenderNode {
    /// Computed unique identifier; `None` for the root and free nodes
    /// without a descriptor `id`.
    pub id: Option<String>,
    /// Data path this node is bound to.
    pub key: Option<String>,
    /// Final, concrete display kind.
    pub element_type: ElementKind,
    pub title: Option<String>,
    pub description: Option<String>,
    pub name: Option<String>,
    /// Matched schema definition (engine-owned copy, normalized); `None`
    /// for untyped/free nodes.
    pub schema_element: Option<JsonValue>,
    /// `false` when the schema marked this field nullable.
    pub required: Option<bool>,
    /// Resolved display value, populated by
    /// [`RenderTree::compute_values`].
    pub value: Option<String>,
    /// Normalized copy of the descriptor entry that produced this node.
    pub descriptor: DescriptorNode,
    pub children: Vec<NodeId>,
    /// Non-owning back-reference; `None` for the root.
    pub parent: Option<NodeId>,
    /// Position among the parent's children.
    pub child_pos: usize,
}

impl RenderNode {
    pub(crate) fn new(element_type: ElementKind) -> RenderNode {
        RenderNode {
            id: None,
            key: None,
            element_type,
            title: None,
            description: None,
            name: None,
            schema_element: None,
            required: None,
            value: None,
            descriptor: DescriptorNode::default(),
            children: Vec::new(),
            parent: None,
            child_pos: 0,
        }
    }
}

#[derive(Debug, Clone)]
/// Arena-backed tree of resolved render nodes. Node 0 is always the root.
pub struct RenderTree {
    pub(crate) nodes: Vec<RenderNode>,
    prefix: String,
}

impl RenderTree {
    pub(crate) fn new(prefix: String) -> RenderTree {
        RenderTree {
            nodes: vec![RenderNode::new(ElementKind::Root)],
            prefix,
        }
    }

    /// Element-ID prefix this tree was built with.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &RenderNode {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Appends `node` as the last child of `parent`.
    pub(crate) fn append_child(&mut self, parent: NodeId, mut node: RenderNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        node.parent = Some(parent);
        node.child_pos = self.nodes[parent.0].children.len();
        self.nodes.push(node);
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Walks every node below the root in depth-first order.
    pub fn for_each_element<F: FnMut(NodeId, &RenderNode)>(&self, mut callback: F) {
        fn walk<F: FnMut(NodeId, &RenderNode)>(tree: &RenderTree, id: NodeId, callback: &mut F) {
            for &child in &tree.nodes[id.0].children {
                callback(child, &tree.nodes[child.0]);
                walk(tree, child, callback);
            }
        }
        walk(self, self.root(), &mut callback);
    }

    /// Serializes the tree to nested JSON for the rendering layer.
    ///
    /// Resolved values are emitted raw; escaping them before embedding in
    /// markup is the renderer's responsibility.
    pub fn to_json(&self) -> JsonValue {
        self.node_to_json(self.root())
    }

    fn node_to_json(&self, id: NodeId) -> JsonValue {
        let node = &self.nodes[id.0];
        let mut out = JsonMap::new();
        out.insert(
            "type".to_string(),
            JsonValue::String(node.element_type.name().to_string()),
        );
        if let Some(node_id) = &node.id {
            out.insert("id".to_string(), JsonValue::String(node_id.clone()));
        }
        if let Some(key) = &node.key {
            out.insert("key".to_string(), JsonValue::String(key.clone()));
        }
        if let Some(name) = &node.name {
            out.insert("name".to_string(), JsonValue::String(name.clone()));
        }
        if let Some(title) = &node.title {
            out.insert("title".to_string(), JsonValue::String(title.clone()));
        }
        if let Some(description) = &node.description {
            out.insert(
                "description".to_string(),
                JsonValue::String(description.clone()),
            );
        }
        if let Some(required) = node.required {
            out.insert("required".to_string(), JsonValue::Bool(required));
        }
        if let Some(value) = &node.value {
            out.insert("value".to_string(), JsonValue::String(value.clone()));
        }
        if !node.children.is_empty() {
            let children = node
                .children
                .iter()
                .map(|&child| self.node_to_json(child))
                .collect();
            out.insert("children".to_string(), JsonValue::Array(children));
        }
        JsonValue::Object(out)
    }

    /// Serializes the tree to JSON text.
    pub fn to_json_string(&self, pretty: bool) -> Result<String, RenderError> {
        let value = self.to_json();
        if pretty {
            serde_json::to_string_pretty(&value)
                .map_err(|e| RenderError::SerializationError(e.to_string()))
        } else {
            serde_json::to_string(&value)
                .map_err(|e| RenderError::SerializationError(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{DescriptorNode, ElementKind, RenderNode, RenderTree};

    #[test]
    fn string_shorthand_becomes_key() {
        let node = DescriptorNode::from_value(&json!("person.name")).unwrap();
        assert_eq!(node.key.as_deref(), Some("person.name"));
        assert!(node.element_type.is_none());
    }

    #[test]
    fn singular_items_normalizes_to_list() {
        let node =
            DescriptorNode::from_value(&json!({"key": "k", "items": {"key": "k.x"}})).unwrap();
        assert_eq!(node.items.unwrap().as_array().unwrap().len(), 1);

        let node = DescriptorNode::from_value(&json!({"key": "k", "items": [1, 2]})).unwrap();
        assert_eq!(node.items.unwrap().as_array().unwrap().len(), 2);
    }

    #[test]
    fn extra_attributes_are_retained() {
        let node =
            DescriptorNode::from_value(&json!({"key": "k", "placeholder": "type here"})).unwrap();
        assert_eq!(node.extra.get("placeholder").unwrap(), "type here");
    }

    #[test]
    fn scalar_entries_are_rejected() {
        assert!(DescriptorNode::from_value(&json!(42)).is_err());
        assert!(DescriptorNode::from_value(&json!(null)).is_err());
    }

    #[test]
    fn registry_round_trips_known_kinds() {
        for name in [
            "root", "none", "string", "image", "text", "color", "number", "checkbox", "select",
            "fieldset", "textarea",
        ] {
            let kind = ElementKind::from_name(name).unwrap();
            assert_eq!(kind.name(), name);
        }
        assert!(ElementKind::from_name("carousel").is_none());
    }

    #[test]
    fn append_child_links_parent_and_position() {
        let mut tree = RenderTree::new("p".to_string());
        let root = tree.root();
        let a = tree.append_child(root, RenderNode::new(ElementKind::Text));
        let b = tree.append_child(root, RenderNode::new(ElementKind::Text));
        let c = tree.append_child(a, RenderNode::new(ElementKind::None));

        assert_eq!(tree.node(a).parent, Some(root));
        assert_eq!(tree.node(b).child_pos, 1);
        assert_eq!(tree.node(c).parent, Some(a));
        assert_eq!(tree.node(root).children, vec![a, b]);

        let mut seen = Vec::new();
        tree.for_each_element(|id, _| seen.push(id));
        assert_eq!(seen, vec![a, c, b]);
    }

    #[test]
    fn to_json_nests_children_and_skips_absent_fields() {
        let mut tree = RenderTree::new("p".to_string());
        let root = tree.root();
        let mut node = RenderNode::new(ElementKind::Text);
        node.key = Some("name".to_string());
        node.value = Some("Ada".to_string());
        tree.append_child(root, node);

        let out = tree.to_json();
        assert_eq!(out["type"], "root");
        assert_eq!(out["children"][0]["type"], "text");
        assert_eq!(out["children"][0]["key"], "name");
        assert_eq!(out["children"][0]["value"], "Ada");
        assert!(out["children"][0].get("title").is_none());
    }
}
