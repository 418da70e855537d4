pub mod display;
pub mod error;
pub mod infer;
pub mod model;
pub mod path;
pub mod schema;
pub mod tree;

use serde_json::Value as JsonValue;

pub use display::{resolve_display_mapping, resolve_labeled_display_mapping, LabeledDisplayValue};
pub use error::RenderError;
pub use model::{
    DescriptorNode, ElementKind, NodeId, RenderDescription, RenderNode, RenderTree,
};
pub use tree::{build_tree, ElementIdSource};

/// Parses a description document from JSON text.
pub fn parse_description(input: &str) -> Result<RenderDescription, RenderError> {
    serde_json::from_str(input)
        .map_err(|e| RenderError::DescriptorError(format!("invalid description document: {e}")))
}

/// Builds the render tree and populates node values from the
/// description's data in one call.
pub fn build_and_resolve(
    description: &RenderDescription,
    ids: &ElementIdSource,
) -> Result<RenderTree, RenderError> {
    let mut tree = build_tree(description, ids)?;
    tree.compute_values(&description.data);
    Ok(tree)
}

/// Builds, resolves, and serializes a description to JSON text.
pub fn build_to_json_string(
    description: &RenderDescription,
    ids: &ElementIdSource,
    pretty: bool,
) -> Result<String, RenderError> {
    build_and_resolve(description, ids)?.to_json_string(pretty)
}

/// Resolves a single display-mapping object against a data value.
///
/// Thin convenience over [`display::resolve_display_mapping`] for callers
/// that do not build a tree.
pub fn resolve_mapping(mapping: &JsonValue, data: &JsonValue) -> Option<String> {
    display::resolve_display_mapping(mapping, data)
}
