//! `metadata.json`: what the workbench knows about a workspace's workflow.
//!
//! Known sections are typed; anything else found in the file is carried in
//! [`Metadata::extra`] and written back untouched.

use flowbench_types::{ExecutionStatus, WebhookConfig, WorkflowDefinition};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(
        default,
        deserialize_with = "de_opt_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub workflow_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n8n_config: Option<DefinitionSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_import: Option<LastImport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_execution: Option<LastExecution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_config: Option<WebhookConfig>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn de_opt_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(flowbench_types::value_to_id))
}

impl Metadata {
    /// Stored webhook endpoints, empty when none were extracted.
    pub fn webhooks(&self) -> &[flowbench_types::WebhookEndpoint] {
        self.webhook_config
            .as_ref()
            .map(|c| c.webhooks.as_slice())
            .unwrap_or_default()
    }

    pub fn has_usable_webhook(&self) -> bool {
        self.webhook_config
            .as_ref()
            .and_then(WebhookConfig::first_usable)
            .is_some()
    }
}

/// Node analysis stored under `n8n_config`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinitionSummary {
    pub node_count: usize,
    pub has_credentials: bool,
}

impl From<&WorkflowDefinition> for DefinitionSummary {
    fn from(definition: &WorkflowDefinition) -> Self {
        Self {
            node_count: definition.node_count(),
            has_credentials: definition.has_credentials(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastImport {
    pub timestamp: String,
    pub workflow_id: String,
    pub node_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastExecution {
    pub timestamp: String,
    pub status: ExecutionStatus,
    /// Seconds.
    pub duration: f64,
    pub log_file: String,
}
