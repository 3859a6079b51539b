//! Webhook endpoint resolution, registration probing and triggering.

use std::time::Duration;

use flowbench_client::{EngineClient, WebhookResponse};
use flowbench_types::{WebhookEndpoint, WorkflowDefinition, iso_now};
use serde::Serialize;
use serde_json::{Value, json};

use crate::error::Result;

/// Timeout for the OPTIONS/HEAD registration probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default timeout for manual webhook triggers.
pub const TRIGGER_TIMEOUT: Duration = Duration::from_secs(30);

/// Find webhook trigger nodes and derive their URLs against `base_url`.
///
/// A node is a webhook trigger when its type contains `webhook`, ignoring
/// case. Nodes with neither `path` nor `webhookId` are returned without URLs.
pub fn extract_endpoints(base_url: &str, definition: &WorkflowDefinition) -> Vec<WebhookEndpoint> {
    definition
        .nodes()
        .into_iter()
        .filter(|node| node.node_type().to_lowercase().contains("webhook"))
        .map(|node| {
            let method = node
                .param_str("method")
                .or_else(|| node.param_str("httpMethod"))
                .map(str::to_uppercase);
            WebhookEndpoint::new(
                base_url,
                node.name(),
                node.param_str("path").map(str::to_string),
                node.webhook_id().map(str::to_string),
                method,
            )
            .with_response_mode(node.param_or("responseMode", "onReceived"))
        })
        .collect()
}

/// Endpoints that resolved to at least one URL.
pub fn usable_endpoints(endpoints: &[WebhookEndpoint]) -> Vec<&WebhookEndpoint> {
    endpoints.iter().filter(|e| e.is_usable()).collect()
}

/// Outcome of a registration probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    pub registered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// `Allow` header value when the method was not listed in it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed: Option<String>,
}

impl Registration {
    fn registered() -> Self {
        Self {
            registered: true,
            reason: None,
            allowed: None,
        }
    }

    fn unregistered(reason: impl Into<String>) -> Self {
        Self {
            registered: false,
            reason: Some(reason.into()),
            allowed: None,
        }
    }
}

/// Result of one trigger in a batch.
#[derive(Debug, Clone, Serialize)]
pub struct TriggerOutcome {
    pub url: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TriggerOutcome {
    fn from_result(url: &str, result: Result<WebhookResponse>) -> Self {
        match result {
            Ok(resp) => {
                let success = resp.is_success();
                let error = (!success).then(|| resp.body_text());
                Self {
                    url: url.to_string(),
                    success,
                    status: Some(resp.status),
                    execution_id: resp.execution_id,
                    error,
                }
            }
            Err(e) => Self {
                url: url.to_string(),
                success: false,
                status: None,
                execution_id: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Default payload for manual triggers.
pub fn manual_payload() -> Value {
    json!({
        "trigger": "manual",
        "timestamp": iso_now(),
        "source": "flowbench",
    })
}

/// Sample payload for webhook tests.
pub fn test_payload() -> Value {
    json!({
        "test": true,
        "timestamp": iso_now(),
        "sample_data": {
            "name": "Test User",
            "email": "test@example.com",
            "action": "test_webhook",
        },
    })
}

#[derive(Clone)]
pub struct WebhookResolver {
    client: EngineClient,
}

impl WebhookResolver {
    pub fn new(client: EngineClient) -> Self {
        Self { client }
    }

    /// [`extract_endpoints`] against the client's base URL.
    pub fn extract(&self, definition: &WorkflowDefinition) -> Vec<WebhookEndpoint> {
        extract_endpoints(self.client.base_url_str(), definition)
    }

    /// Best-effort check that the engine has registered `url` for `method`.
    pub async fn verify_registration(&self, url: &str, method: &str) -> Registration {
        let probe = match self.client.webhooks().probe(url, PROBE_TIMEOUT).await {
            Ok(probe) => probe,
            Err(e) if e.is_connect() => return Registration::unregistered("connection_error"),
            Err(e) => return Registration::unregistered(e.to_string()),
        };

        if probe.options_status == 404 && probe.head_status == 404 {
            return Registration::unregistered("endpoint_not_found");
        }
        if let Some(allow) = probe.allow.filter(|a| !a.trim().is_empty())
            && !allow
                .split(',')
                .any(|m| m.trim().eq_ignore_ascii_case(method))
        {
            return Registration {
                allowed: Some(allow),
                ..Registration::unregistered("method_not_allowed")
            };
        }
        Registration::registered()
    }

    /// Send `payload` (or [`manual_payload`]) to a webhook URL.
    pub async fn trigger(
        &self,
        url: &str,
        method: &str,
        payload: Option<Value>,
        timeout: Duration,
    ) -> Result<WebhookResponse> {
        let payload = payload.unwrap_or_else(manual_payload);
        tracing::info!(url, method, "triggering webhook");
        Ok(self
            .client
            .webhooks()
            .trigger(url, method, &payload, timeout)
            .await?)
    }

    /// POST [`test_payload`] to a webhook URL.
    pub async fn test(&self, url: &str) -> Result<WebhookResponse> {
        self.trigger(url, "POST", Some(test_payload()), TRIGGER_TIMEOUT)
            .await
    }

    /// Trigger each URL in order, pausing `delay` between them.
    ///
    /// Failures are recorded per URL; the batch never aborts.
    pub async fn batch_trigger(
        &self,
        urls: &[String],
        payload: Option<Value>,
        delay: Duration,
    ) -> Vec<TriggerOutcome> {
        let mut outcomes = Vec::with_capacity(urls.len());
        for (i, url) in urls.iter().enumerate() {
            let result = self
                .trigger(url, "POST", payload.clone(), TRIGGER_TIMEOUT)
                .await;
            outcomes.push(TriggerOutcome::from_result(url, result));
            if i + 1 < urls.len() && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowbench_types::to_test_url;

    fn definition(nodes: Value) -> WorkflowDefinition {
        WorkflowDefinition::from_value(json!({
            "name": "W",
            "nodes": nodes,
            "connections": {}
        }))
        .unwrap()
    }

    #[test]
    fn test_extracts_webhook_nodes_only() {
        let def = definition(json!([
            { "name": "Hook", "type": "n8n-nodes-base.Webhook", "position": [0, 0],
              "parameters": { "path": "orders", "method": "post", "responseMode": "lastNode" } },
            { "name": "Set", "type": "n8n-nodes-base.set", "position": [1, 0] }
        ]));
        let endpoints = extract_endpoints("http://localhost:5678", &def);
        assert_eq!(endpoints.len(), 1);
        let ep = &endpoints[0];
        assert_eq!(ep.node_name, "Hook");
        assert_eq!(ep.method, "POST");
        assert_eq!(ep.response_mode, "lastNode");
        assert_eq!(
            ep.production_url.as_deref(),
            Some("http://localhost:5678/webhook/orders")
        );
    }

    #[test]
    fn test_test_url_differs_only_by_segment() {
        let def = definition(json!([
            { "name": "A", "type": "webhook", "position": [0, 0], "parameters": { "path": "a/b" } },
            { "name": "B", "type": "x.webhookTrigger", "position": [0, 0], "parameters": { "path": "webhook" } }
        ]));
        for ep in extract_endpoints("https://flows.example.com/", &def) {
            let prod = ep.production_url.unwrap();
            assert_eq!(ep.test_url.unwrap(), to_test_url(&prod));
        }
    }

    #[test]
    fn test_webhook_id_fallback_and_defaults() {
        let def = definition(json!([
            { "name": "ById", "type": "webhook", "position": [0, 0], "webhookId": "uuid-1" },
            { "name": "Bare", "type": "webhook", "position": [0, 0], "parameters": { "httpMethod": "PUT" } }
        ]));
        let endpoints = extract_endpoints("http://h", &def);
        assert_eq!(endpoints[0].method, "GET");
        assert_eq!(endpoints[0].production_url.as_deref(), Some("http://h/webhook/uuid-1"));
        assert_eq!(endpoints[1].method, "PUT");
        assert!(!endpoints[1].is_usable());
        assert_eq!(usable_endpoints(&endpoints).len(), 1);
    }
}
