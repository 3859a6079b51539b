//! Webhook endpoints.
//!
//! Webhook URLs are absolute and served by the engine outside `/api/v1`, so
//! these calls go through the credential-free client.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use reqwest::Method;
use serde_json::Value;

use crate::client::EngineClient;
use crate::error::{Error, Result};
use crate::types::{ProbeResponse, WebhookResponse};

/// Header the engine uses to report the execution a webhook started.
pub const EXECUTION_ID_HEADER: &str = "x-n8n-execution-id";

/// Webhooks API client.
pub struct WebhooksApi {
    client: EngineClient,
}

impl WebhooksApi {
    pub(crate) fn new(client: EngineClient) -> Self {
        Self { client }
    }

    /// Probe a webhook URL with OPTIONS then HEAD.
    ///
    /// Transport failures surface as errors; any HTTP status is a response.
    pub async fn probe(&self, url: &str, timeout: Duration) -> Result<ProbeResponse> {
        let http = &self.client.inner().webhook_http;

        let options = http
            .request(Method::OPTIONS, url)
            .timeout(timeout)
            .send()
            .await?;
        let allow = options
            .headers()
            .get(reqwest::header::ALLOW)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let head = http.head(url).timeout(timeout).send().await?;

        tracing::debug!(
            url,
            options = options.status().as_u16(),
            head = head.status().as_u16(),
            "probed webhook"
        );

        Ok(ProbeResponse {
            options_status: options.status().as_u16(),
            head_status: head.status().as_u16(),
            allow,
        })
    }

    /// Send `payload` to a webhook URL with the given method.
    ///
    /// GET carries the payload as a JSON string in the `data` query
    /// parameter; POST and PUT send it as the JSON body; DELETE sends nothing.
    /// Non-2xx statuses are returned as responses, not errors.
    pub async fn trigger(
        &self,
        url: &str,
        method: &str,
        payload: &Value,
        timeout: Duration,
    ) -> Result<WebhookResponse> {
        let http = &self.client.inner().webhook_http;
        let request = match method.to_ascii_uppercase().as_str() {
            "GET" => http
                .get(url)
                .query(&[("data", serde_json::to_string(payload)?)]),
            "POST" => http.post(url).json(payload),
            "PUT" => http.put(url).json(payload),
            "DELETE" => http.delete(url),
            other => return Err(Error::UnsupportedMethod(other.to_string())),
        };

        let started = Instant::now();
        tracing::debug!(url, method, "triggering webhook");
        let response = request.timeout(timeout).send().await?;

        let status = response.status().as_u16();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| Some((k.as_str().to_string(), v.to_str().ok()?.to_string())))
            .collect();
        let execution_id = headers.get(EXECUTION_ID_HEADER).cloned();

        let text = response.text().await?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        Ok(WebhookResponse {
            status,
            headers,
            execution_id,
            body,
            elapsed: started.elapsed(),
        })
    }
}
