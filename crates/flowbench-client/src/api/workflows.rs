//! Workflows API.

use flowbench_types::WorkflowDefinition;
use serde_json::Value;

use crate::client::EngineClient;
use crate::error::Result;
use crate::types::{ExecutionStarted, Workflow, WorkflowList};

/// Workflows API client.
pub struct WorkflowsApi {
    client: EngineClient,
}

impl WorkflowsApi {
    pub(crate) fn new(client: EngineClient) -> Self {
        Self { client }
    }

    /// List workflows.
    pub async fn list(&self) -> Result<WorkflowList> {
        self.client.get("workflows").await
    }

    /// Get a workflow by ID.
    pub async fn get(&self, id: &str) -> Result<Workflow> {
        self.client.get(&format!("workflows/{}", id)).await
    }

    /// Create a workflow from a definition with read-only fields stripped.
    pub async fn create(&self, definition: &WorkflowDefinition) -> Result<Workflow> {
        self.client.post("workflows", definition).await
    }

    /// Replace an existing workflow.
    pub async fn update(&self, id: &str, definition: &WorkflowDefinition) -> Result<Workflow> {
        self.client.put(&format!("workflows/{}", id), definition).await
    }

    /// Activate a workflow. The response body is not trusted for state.
    pub async fn activate(&self, id: &str) -> Result<()> {
        let _: Value = self
            .client
            .post_empty(&format!("workflows/{}/activate", id))
            .await?;
        Ok(())
    }

    /// Deactivate a workflow.
    pub async fn deactivate(&self, id: &str) -> Result<()> {
        let _: Value = self
            .client
            .post_empty(&format!("workflows/{}/deactivate", id))
            .await?;
        Ok(())
    }

    /// Start an execution through the workflow-scoped endpoint.
    pub async fn execute(&self, id: &str) -> Result<ExecutionStarted> {
        self.client
            .post_empty(&format!("workflows/{}/execute", id))
            .await
    }
}
