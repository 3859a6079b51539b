//! Request and response types for the engine API.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Deserialize an id the engine may send as a string or a number.
fn de_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(flowbench_types::value_to_id(&value).unwrap_or_default())
}

fn de_opt_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(flowbench_types::value_to_id))
}

// ─────────────────────────────────────────────────────────────────────────────
// Workflows
// ─────────────────────────────────────────────────────────────────────────────

/// A workflow as returned by the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    #[serde(default, deserialize_with = "de_id")]
    pub id: String,
    #[serde(default = "unknown_name")]
    pub name: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub nodes: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// Everything else (`connections`, `settings`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn unknown_name() -> String {
    "Unknown".to_string()
}

impl Workflow {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

/// Response for list workflows.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowList {
    #[serde(default)]
    pub data: Vec<Workflow>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Executions
// ─────────────────────────────────────────────────────────────────────────────

/// Request to start an execution.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartExecutionRequest {
    pub workflow_id: String,
}

/// Response to an execution start request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExecutionStarted {
    #[serde(default, deserialize_with = "de_id")]
    pub id: String,
}

/// An execution as reported by `GET /executions/{id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    #[serde(default, deserialize_with = "de_opt_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub finished: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stopped_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ExecutionRecord {
    /// True when the payload carries a top-level `error` field.
    pub fn has_error_field(&self) -> bool {
        self.extra.contains_key("error")
    }

    pub fn error(&self) -> Option<&Value> {
        self.extra.get("error")
    }

    /// Per-node run data (`data.resultData.runData`), falling back to `data`.
    pub fn node_outputs(&self) -> Option<&Map<String, Value>> {
        let data = self.data.as_ref()?;
        data.pointer("/resultData/runData")
            .and_then(Value::as_object)
            .or_else(|| data.as_object())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Webhooks
// ─────────────────────────────────────────────────────────────────────────────

/// Result of the OPTIONS + HEAD capability probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeResponse {
    pub options_status: u16,
    pub head_status: u16,
    /// `Allow` header from the OPTIONS response.
    pub allow: Option<String>,
}

/// Response from triggering a webhook.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    /// `x-n8n-execution-id` header, when the engine sent it.
    pub execution_id: Option<String>,
    /// JSON body when parseable, otherwise the raw text as a string.
    pub body: Value,
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
}

impl WebhookResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body rendered as text for error messages.
    pub fn body_text(&self) -> String {
        match &self.body {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }
}
