//! Validation errors for workflow definitions.

use thiserror::Error;

/// A workflow definition is missing a structurally required field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("'nodes' must be an array")]
    NodesNotArray,

    #[error("node {index} missing '{field}' field")]
    NodeMissingField { index: usize, field: String },

    #[error("workflow definition must be a JSON object")]
    NotAnObject,
}
