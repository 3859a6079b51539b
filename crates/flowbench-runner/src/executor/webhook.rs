//! Execution by calling the workflow's webhook trigger.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Local;
use flowbench_client::EngineClient;
use flowbench_types::{ExecutionMethod, ExecutionResult, ExecutionStatus, iso_now, to_test_url};
use serde_json::json;
use tracing::{info, warn};

use super::strategy::{AttemptContext, ExecutionStrategy};
use crate::error::{Result, RunnerError};
use crate::webhook::WebhookResolver;

/// Timeout for the execution webhook request.
pub const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(60);

/// Method used for execution triggers; payload travels in the `data` query
/// parameter.
const TRIGGER_METHOD: &str = "GET";

pub struct WebhookStrategy {
    client: EngineClient,
    resolver: WebhookResolver,
    timeout: Duration,
}

impl WebhookStrategy {
    pub fn new(client: EngineClient) -> Self {
        Self {
            resolver: WebhookResolver::new(client.clone()),
            client,
            timeout: WEBHOOK_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl ExecutionStrategy for WebhookStrategy {
    fn method(&self) -> ExecutionMethod {
        ExecutionMethod::Webhook
    }

    async fn attempt(&self, ctx: &mut AttemptContext<'_>) -> Result<ExecutionResult> {
        let logs = ctx.logs;
        let mut url = ctx
            .metadata
            .webhook_config
            .as_ref()
            .and_then(|c| c.first_usable())
            .and_then(|e| e.preferred_url())
            .map(str::to_string)
            .ok_or(RunnerError::NoWebhook)?;
        if ctx.test_mode {
            url = to_test_url(&url);
        }

        logs.append_execution(&format!(
            "=== Webhook Workflow Execution ===\nTimestamp: {}\nWebhook URL: {}\nMode: {}\n{}\n",
            iso_now(),
            url,
            if ctx.test_mode { "Test" } else { "Production" },
            "=".repeat(50)
        ))?;

        let registration = self.resolver.verify_registration(&url, TRIGGER_METHOD).await;
        logs.append_execution(&format!(
            "Registration status: {}\n",
            serde_json::to_string(&registration).unwrap_or_default()
        ))?;
        if !registration.registered && !ctx.test_mode {
            warn!(%url, reason = ?registration.reason, "webhook not registered, using test URL");
            logs.append_execution("Webhook not registered, trying test mode instead...")?;
            url = to_test_url(&url);
            ctx.test_mode = true;
        }

        let payload = json!({
            "trigger_source": "flowbench",
            "timestamp": iso_now(),
            "debug_mode": ctx.debug,
            "execution_type": "webhook",
        });
        logs.append_execution(&format!(
            "Sending webhook request...\nPayload: {}\n",
            serde_json::to_string_pretty(&payload).unwrap_or_default()
        ))?;

        let response = match self
            .client
            .webhooks()
            .trigger(&url, TRIGGER_METHOD, &payload, self.timeout)
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                let message = "Webhook request timeout".to_string();
                logs.append_execution(&message)?;
                logs.log_error(&message)?;
                return Err(RunnerError::Timeout(message));
            }
            Err(e) => {
                let message = format!("Webhook Execution Error: {e}");
                logs.append_execution(&message)?;
                logs.log_error(&message)?;
                return Err(e.into());
            }
        };

        logs.append_execution(&format!(
            "Response Status: {}\nResponse Headers: {:?}\n",
            response.status, response.headers
        ))?;

        let result = if response.is_success() {
            logs.append_execution("Response Data:")?;
            logs.write_execution_json(&response.body)?;
            let execution_id = response.execution_id.clone().unwrap_or_else(|| {
                format!("webhook-{}", Local::now().format("%Y%m%d%H%M%S"))
            });
            info!(%url, %execution_id, "webhook accepted");
            ExecutionResult::new(ExecutionMethod::Webhook, ExecutionStatus::Success, 0.0)
                .with_execution_id(execution_id)
                .with_data(response.body.clone())
        } else {
            let message = format!(
                "Webhook failed with status {}: {}",
                response.status,
                response.body_text()
            );
            logs.append_execution(&message)?;
            logs.log_error(&message)?;
            ExecutionResult::new(ExecutionMethod::Webhook, ExecutionStatus::Error, 0.0)
                .with_error(message)
        };

        logs.append_execution(&format!(
            "\n=== Execution Completed ===\nEnd Time: {}\nDuration: {:.2} seconds",
            iso_now(),
            ctx.elapsed_secs()
        ))?;

        Ok(ExecutionResult {
            duration: ctx.elapsed_secs(),
            webhook_url: Some(url),
            response_status: Some(response.status),
            ..result
        })
    }
}
