//! Workflow definitions as loosely-typed JSON maps.
//!
//! Engine definitions carry arbitrary node `parameters`, so the definition is
//! kept as a string-keyed map. Accessors return defaults for absent optional
//! fields; [`WorkflowDefinition::validate`] is the only place that rejects a
//! definition for missing structure.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;

/// Fields the engine refuses on create/update.
pub const READ_ONLY_FIELDS: &[&str] = &["id", "active", "createdAt", "updatedAt"];

const REQUIRED_FIELDS: &[&str] = &["name", "nodes", "connections"];
const REQUIRED_NODE_FIELDS: &[&str] = &["name", "type", "position"];

/// Identifier and display name of a workflow owned by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRef {
    pub id: String,
    pub name: String,
}

/// A workflow definition (`workflow.json`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowDefinition(Map<String, Value>);

impl WorkflowDefinition {
    /// Wrap a JSON value, which must be an object.
    pub fn from_value(value: Value) -> Result<Self, ValidationError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(ValidationError::NotAnObject),
        }
    }

    /// Parse a definition from JSON text.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Engine-assigned id, if the definition carries one.
    pub fn id(&self) -> Option<String> {
        self.0.get("id").and_then(value_to_id)
    }

    pub fn name(&self) -> &str {
        self.str_field("name").unwrap_or("Unknown")
    }

    pub fn active(&self) -> bool {
        self.0.get("active").and_then(Value::as_bool).unwrap_or(false)
    }

    /// Typed views over the node list. Non-object entries are skipped.
    pub fn nodes(&self) -> Vec<NodeView<'_>> {
        self.0
            .get("nodes")
            .and_then(Value::as_array)
            .map(|nodes| {
                nodes
                    .iter()
                    .filter_map(Value::as_object)
                    .map(NodeView)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn node_count(&self) -> usize {
        self.0
            .get("nodes")
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
    }

    /// True when any node references credentials.
    pub fn has_credentials(&self) -> bool {
        self.nodes().iter().any(NodeView::has_credentials)
    }

    /// Distinct node type names, sorted.
    pub fn node_types(&self) -> Vec<String> {
        self.nodes()
            .iter()
            .map(|n| n.node_type().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Check the structure the engine requires before import.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for field in REQUIRED_FIELDS {
            if !self.0.contains_key(*field) {
                return Err(ValidationError::MissingField((*field).to_string()));
            }
        }

        let nodes = self
            .0
            .get("nodes")
            .and_then(Value::as_array)
            .ok_or(ValidationError::NodesNotArray)?;

        for (index, node) in nodes.iter().enumerate() {
            let node = node.as_object();
            for field in REQUIRED_NODE_FIELDS {
                if !node.is_some_and(|n| n.contains_key(*field)) {
                    return Err(ValidationError::NodeMissingField {
                        index,
                        field: (*field).to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Copy of the definition without the fields the engine treats as read-only.
    pub fn strip_read_only(&self) -> Self {
        let mut map = self.0.clone();
        for field in READ_ONLY_FIELDS {
            map.remove(*field);
        }
        Self(map)
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }
}

impl From<Map<String, Value>> for WorkflowDefinition {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Borrowed view of a single node.
#[derive(Debug, Clone, Copy)]
pub struct NodeView<'a>(&'a Map<String, Value>);

impl<'a> NodeView<'a> {
    pub fn name(&self) -> &'a str {
        self.0.get("name").and_then(Value::as_str).unwrap_or("Unnamed")
    }

    pub fn node_type(&self) -> &'a str {
        self.0.get("type").and_then(Value::as_str).unwrap_or("unknown")
    }

    /// The node's webhook identifier, when present and non-empty.
    pub fn webhook_id(&self) -> Option<&'a str> {
        self.0
            .get("webhookId")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn has_credentials(&self) -> bool {
        match self.0.get("credentials") {
            None | Some(Value::Null) => false,
            Some(Value::Object(m)) => !m.is_empty(),
            Some(Value::Array(a)) => !a.is_empty(),
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(_)) => true,
        }
    }

    /// A string parameter, treating empty strings as absent.
    pub fn param_str(&self, key: &str) -> Option<&'a str> {
        self.parameters()
            .and_then(|p| p.get(key))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// A string parameter with a fallback.
    pub fn param_or(&self, key: &str, default: &'a str) -> &'a str {
        self.param_str(key).unwrap_or(default)
    }

    pub fn parameters(&self) -> Option<&'a Map<String, Value>> {
        self.0.get("parameters").and_then(Value::as_object)
    }
}

/// Engine ids come back as strings or numbers depending on version.
pub fn value_to_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
