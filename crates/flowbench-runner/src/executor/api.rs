//! Execution through the engine REST API.

use async_trait::async_trait;
use flowbench_client::{EngineClient, ExecutionRecord};
use flowbench_config::PollingConfig;
use flowbench_types::{ExecutionMethod, ExecutionResult, ExecutionStatus, iso_now};
use flowbench_workspace::ExecutionLogs;
use serde_json::{Value, json};
use tracing::{info, warn};

use super::poll::{PollOutcome, poll_execution};
use super::strategy::{AttemptContext, ExecutionStrategy};
use crate::error::Result;

pub struct ApiStrategy {
    client: EngineClient,
    polling: PollingConfig,
}

impl ApiStrategy {
    pub fn new(client: EngineClient, polling: PollingConfig) -> Self {
        Self { client, polling }
    }

    async fn run(&self, ctx: &AttemptContext<'_>) -> Result<ExecutionResult> {
        let logs = ctx.logs;
        let started = self.client.workflows().execute(ctx.workflow_id).await?;
        let execution_id = started.id;
        logs.append_execution(&format!("Execution ID: {execution_id}\nStatus: Started\n"))?;
        info!(workflow_id = ctx.workflow_id, %execution_id, "execution started");

        let outcome = poll_execution(
            &self.client,
            &execution_id,
            &self.polling,
            logs,
            ctx.debug,
        )
        .await;
        let status = outcome.status();

        let mut result = ExecutionResult::new(ExecutionMethod::Api, status, 0.0)
            .with_execution_id(execution_id.clone());

        match outcome {
            PollOutcome::Finished { .. } => {
                let detail = self.fetch_detail(&execution_id).await;
                logs.append_execution("\n=== Execution Results ===")?;
                logs.write_execution_json(&detail)?;

                if ctx.debug
                    && let Ok(record) = serde_json::from_value::<ExecutionRecord>(detail.clone())
                {
                    log_node_outputs(logs, &record)?;
                }
                if status == ExecutionStatus::Error {
                    let error = detail.get("error").cloned().unwrap_or(Value::Null);
                    let text = serde_json::to_string_pretty(&error).unwrap_or_default();
                    logs.log_error(&text)?;
                    result = result.with_error(text);
                }
                result = result.with_data(detail);
            }
            PollOutcome::Exhausted { polls } => {
                warn!(%execution_id, polls, "execution did not finish");
                result = result.with_error(format!(
                    "Execution did not reach a terminal state after {polls} polls"
                ));
            }
            PollOutcome::Unknown { error, .. } => {
                warn!(%execution_id, %error, "status polling failed");
                result = result.with_error(format!("Status polling failed: {error}"));
            }
        }

        result.duration = ctx.elapsed_secs();
        Ok(result)
    }

    /// Full execution record; a failed fetch yields `{"error": ...}`.
    async fn fetch_detail(&self, execution_id: &str) -> Value {
        match self.client.executions().get(execution_id).await {
            Ok(record) => serde_json::to_value(record).unwrap_or(Value::Null),
            Err(e) => json!({ "error": e.to_string() }),
        }
    }
}

#[async_trait]
impl ExecutionStrategy for ApiStrategy {
    fn method(&self) -> ExecutionMethod {
        ExecutionMethod::Api
    }

    async fn attempt(&self, ctx: &mut AttemptContext<'_>) -> Result<ExecutionResult> {
        let logs = ctx.logs;
        logs.append_execution(&format!(
            "=== Workflow Execution Started ===\nTimestamp: {}\nWorkflow ID: {}\nAPI URL: {}\nDebug Mode: {}\n{}\n",
            iso_now(),
            ctx.workflow_id,
            self.client.base_url_str(),
            ctx.debug,
            "=".repeat(50)
        ))?;

        let result = self.run(ctx).await;
        if let Err(e) = &result {
            let message = format!("API Execution Error: {e}");
            logs.append_execution(&format!("\n{message}"))?;
            logs.log_error(&message)?;
        }
        logs.append_execution(&format!(
            "\n=== Execution Completed ===\nEnd Time: {}\nDuration: {:.2} seconds",
            iso_now(),
            ctx.elapsed_secs()
        ))?;
        result
    }
}

/// Write each node's outputs to the execution log.
fn log_node_outputs(logs: &ExecutionLogs, record: &ExecutionRecord) -> Result<()> {
    let Some(nodes) = record.node_outputs() else {
        return Ok(());
    };
    logs.append_execution("\n=== Node Outputs ===")?;
    for (name, runs) in nodes {
        logs.append_execution(&format!("\nNode: {name}\n{}", "-".repeat(40)))?;
        match runs.as_array().filter(|r| !r.is_empty()) {
            Some(runs) => {
                for (i, output) in runs.iter().enumerate() {
                    logs.append_execution(&format!("Output {}:", i + 1))?;
                    logs.write_execution_json(output)?;
                }
            }
            None => logs.append_execution("No output data")?,
        }
    }
    Ok(())
}
