//! Execution orchestration.
//!
//! A run resolves the requested [`ExecutionMethod`] into an ordered list of
//! [`ExecutionStrategy`] values and tries them in turn:
//!
//! | Requested | Attempted                                   |
//! |-----------|---------------------------------------------|
//! | `auto`    | webhook (if one is stored), then API, then CLI |
//! | `api`     | API                                         |
//! | `cli`     | CLI                                         |
//! | `webhook` | webhook                                     |
//!
//! Explicit methods surface their failure. Under `auto` a failed attempt is
//! written to the error log and the next strategy runs; fatal errors stop the
//! chain. Every run is recorded in the workspace, failures included.

mod api;
mod cli;
mod poll;
mod strategy;
mod webhook;

use std::path::PathBuf;
use std::time::Instant;

use flowbench_client::EngineClient;
use flowbench_config::FlowbenchConfig;
use flowbench_types::{
    ExecutionMethod, ExecutionResult, ExecutionStatus, WebhookConfig, WebhookEndpoint,
};
use flowbench_workspace::{ExecutionLogs, LastExecution, Metadata, Workspace};
use serde_json::json;
use tracing::{info, warn};

pub use api::ApiStrategy;
pub use cli::CliStrategy;
pub use poll::{PollOutcome, poll_execution, terminal_status};
pub use strategy::{AttemptContext, ExecutionStrategy};
pub use webhook::{WEBHOOK_TIMEOUT, WebhookStrategy};

use crate::activation::ActivationController;
use crate::error::{Result, RunnerError};

/// Per-run options.
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    pub method: ExecutionMethod,
    pub debug: bool,
    /// Activate an inactive workflow first (ignored for webhook runs).
    pub auto_activate: bool,
    pub test_mode: bool,
    /// Store this URL as the only webhook endpoint and force a webhook run.
    pub webhook_url: Option<String>,
}

/// A recorded run.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub result: ExecutionResult,
    pub logs: ExecutionLogs,
    pub context_file: PathBuf,
}

pub struct Orchestrator {
    config: FlowbenchConfig,
    activation: ActivationController,
    webhook: WebhookStrategy,
    api: ApiStrategy,
    cli: CliStrategy,
}

impl Orchestrator {
    pub fn new(client: EngineClient, config: FlowbenchConfig) -> Self {
        Self {
            activation: ActivationController::new(client.clone()),
            webhook: WebhookStrategy::new(client.clone()),
            api: ApiStrategy::new(client, config.polling.clone()),
            cli: CliStrategy::new(config.cli.executable.clone(), config.cli.read_timeout()),
            config,
        }
    }

    /// Replace the webhook strategy (request timeout tuning).
    pub fn with_webhook_strategy(mut self, webhook: WebhookStrategy) -> Self {
        self.webhook = webhook;
        self
    }

    /// Strategies for `method`, in attempt order.
    pub fn plan(&self, method: ExecutionMethod, metadata: &Metadata) -> Vec<&dyn ExecutionStrategy> {
        match method {
            ExecutionMethod::Auto => {
                let mut plan: Vec<&dyn ExecutionStrategy> = Vec::with_capacity(3);
                if metadata.has_usable_webhook() {
                    plan.push(&self.webhook);
                }
                plan.push(&self.api);
                plan.push(&self.cli);
                plan
            }
            ExecutionMethod::Api => vec![&self.api],
            ExecutionMethod::Cli => vec![&self.cli],
            ExecutionMethod::Webhook => vec![&self.webhook],
        }
    }

    /// Execute a workflow and record the result in the workspace.
    ///
    /// Returns `Ok` whenever some method produced a result, whatever its
    /// status. A failed run is still recorded, as `error`, before the error
    /// is returned.
    pub async fn execute(
        &self,
        workspace: &Workspace,
        workflow_id: &str,
        options: &ExecuteOptions,
    ) -> Result<ExecutionOutcome> {
        let timestamp = workspace.execution_timestamp();
        let logs = workspace.execution_logs(&timestamp);

        let mut method = options.method;
        if let Some(url) = &options.webhook_url {
            workspace.update_metadata(|m| {
                m.webhook_config = Some(WebhookConfig::new(vec![WebhookEndpoint::direct(
                    url.as_str(),
                    "POST",
                )]));
            })?;
            method = ExecutionMethod::Webhook;
        }
        let metadata = workspace.load_metadata()?;

        if options.auto_activate && method != ExecutionMethod::Webhook {
            self.ensure_active(workflow_id).await;
        }

        info!(workflow_id, %method, log = %logs.execution_log.display(), "executing workflow");

        let started = Instant::now();
        let mut ctx = AttemptContext {
            workflow_id,
            metadata: &metadata,
            logs: &logs,
            debug: options.debug,
            test_mode: options.test_mode,
            started,
        };

        let plan = self.plan(method, &metadata);
        let explicit = method != ExecutionMethod::Auto;
        let mut last_error = None;
        let mut last_method = method;

        for strategy in plan {
            last_method = strategy.method();
            ctx.started = Instant::now();
            match strategy.attempt(&mut ctx).await {
                Ok(result) => {
                    let context_file = self.record(workspace, &timestamp, &logs, &result)?;
                    info!(
                        workflow_id,
                        method = %result.method,
                        status = %result.status,
                        duration = result.duration,
                        "execution finished"
                    );
                    return Ok(ExecutionOutcome {
                        result,
                        logs,
                        context_file,
                    });
                }
                Err(e) => {
                    warn!(workflow_id, method = %last_method, error = %e, "execution attempt failed");
                    logs.log_error(&format!("{last_method} execution failed: {e}"))?;
                    if explicit || e.is_fatal() {
                        self.record_failure(workspace, &timestamp, &logs, last_method, started, &e)?;
                        return Err(e);
                    }
                    last_error = Some(e);
                }
            }
        }

        let error = match last_error {
            Some(last) => RunnerError::MethodsExhausted {
                last: Box::new(last),
            },
            None => RunnerError::NoWebhook,
        };
        self.record_failure(workspace, &timestamp, &logs, last_method, started, &error)?;
        Err(error)
    }

    async fn ensure_active(&self, workflow_id: &str) {
        match self.activation.activate(workflow_id).await {
            Ok(outcome) if outcome.changed => info!(workflow_id, "workflow activated"),
            Ok(_) => {}
            Err(e) => warn!(workflow_id, error = %e, "could not activate workflow; continuing"),
        }
    }

    fn record_failure(
        &self,
        workspace: &Workspace,
        timestamp: &str,
        logs: &ExecutionLogs,
        method: ExecutionMethod,
        started: Instant,
        error: &RunnerError,
    ) -> Result<PathBuf> {
        let mut result = ExecutionResult::new(
            method,
            ExecutionStatus::Error,
            started.elapsed().as_secs_f64(),
        )
        .with_error(error.to_string());
        if let Some(body) = error.upstream_body() {
            result = result.with_data(json!({ "upstream_body": body }));
        }
        self.record(workspace, timestamp, logs, &result)
    }

    /// Save `context/execution_<ts>.json` and `last_execution`.
    fn record(
        &self,
        workspace: &Workspace,
        timestamp: &str,
        logs: &ExecutionLogs,
        result: &ExecutionResult,
    ) -> Result<PathBuf> {
        let mut context = serde_json::to_value(result).unwrap_or_else(|_| json!({}));
        if self.config.debug.capture_env
            && let Some(map) = context.as_object_mut()
        {
            map.insert(
                "environment".to_string(),
                json!({
                    "n8n_url": self.config.n8n_api.base_url(),
                    "timestamp": timestamp,
                    "debug_enabled": self.config.debug.debug_enabled(),
                }),
            );
        }
        let path = workspace.save_execution_context(timestamp, &context)?;

        let log_file = workspace
            .relative(&logs.execution_log)
            .display()
            .to_string();
        workspace.update_metadata(|m| {
            m.last_execution = Some(LastExecution {
                timestamp: timestamp.to_string(),
                status: result.status,
                duration: result.duration,
                log_file,
            });
        })?;
        Ok(path)
    }
}
