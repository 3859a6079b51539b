//! Executions API.

use crate::client::EngineClient;
use crate::error::Result;
use crate::types::{ExecutionRecord, ExecutionStarted, StartExecutionRequest};

/// Executions API client.
pub struct ExecutionsApi {
    client: EngineClient,
}

impl ExecutionsApi {
    pub(crate) fn new(client: EngineClient) -> Self {
        Self { client }
    }

    /// Start an execution via `POST /executions`.
    pub async fn start(&self, workflow_id: &str) -> Result<ExecutionStarted> {
        let request = StartExecutionRequest {
            workflow_id: workflow_id.to_string(),
        };
        self.client.post("executions", &request).await
    }

    /// Get an execution by ID, including run data.
    pub async fn get(&self, id: &str) -> Result<ExecutionRecord> {
        self.client
            .get(&format!("executions/{}?includeData=true", id))
            .await
    }
}
