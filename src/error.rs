//! Error definitions for all `render_tree` build and resolution stages.

use thiserror::Error;

#[derive(Debug, Error)]
/// Top-level error type returned by public APIs.
pub enum RenderError {
    /// Schema uses a feature the engine does not support (currently `$ref`).
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),
    /// A descriptor references a key that does not exist in the schema.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),
    /// A schema `type` list still has more than one entry after `"null"` removal.
    #[error("invalid schema type: {0}")]
    InvalidSchemaType(String),
    /// A resolved display type has no matching view definition.
    #[error("unknown element type: {0}")]
    UnknownElementType(String),
    /// Malformed descriptor entry or description document.
    #[error("descriptor error: {0}")]
    DescriptorError(String),
    /// Invalid path expression or unassignable path.
    #[error("path error: {0}")]
    PathError(String),
    /// Schema-guard validation failure. The mapping resolver downgrades this
    /// to the fallback value; it only surfaces through direct
    /// [`crate::schema::validate_value`] calls.
    #[error("validation error: {0}")]
    ValidationError(String),
    /// Output serialization failure.
    #[error("serialization error: {0}")]
    SerializationError(String),
    /// Filesystem I/O error from the CLI or callers that propagate I/O.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
