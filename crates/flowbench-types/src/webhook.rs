//! Webhook trigger endpoints and their stored configuration.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Path segment of production webhook URLs.
pub const PRODUCTION_SEGMENT: &str = "/webhook/";

/// Path segment of test webhook URLs.
pub const TEST_SEGMENT: &str = "/webhook-test/";

/// A webhook trigger found in a workflow definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookEndpoint {
    pub node_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_id: Option<String>,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default = "default_response_mode")]
    pub response_mode: String,
    #[serde(default)]
    pub production_url: Option<String>,
    #[serde(default)]
    pub test_url: Option<String>,
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_response_mode() -> String {
    "onReceived".to_string()
}

impl WebhookEndpoint {
    /// Build an endpoint, deriving both URLs from `base_url`.
    ///
    /// `path` wins over `webhook_id`. With neither, both URLs stay absent.
    pub fn new(
        base_url: &str,
        node_name: impl Into<String>,
        path: Option<String>,
        webhook_id: Option<String>,
        method: Option<String>,
    ) -> Self {
        let base = base_url.trim_end_matches('/');
        let key = path
            .as_deref()
            .or(webhook_id.as_deref())
            .map(|k| k.trim_start_matches('/').to_string());

        let production_url = key
            .as_ref()
            .map(|k| format!("{base}{PRODUCTION_SEGMENT}{k}"));
        let test_url = key.as_ref().map(|k| format!("{base}{TEST_SEGMENT}{k}"));

        Self {
            node_name: node_name.into(),
            path,
            webhook_id,
            method: method.unwrap_or_else(default_method),
            response_mode: default_response_mode(),
            production_url,
            test_url,
        }
    }

    /// Endpoint for a URL given directly by the operator.
    pub fn direct(url: impl Into<String>, method: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            node_name: "Direct Webhook".to_string(),
            path: None,
            webhook_id: None,
            method: method.into(),
            response_mode: default_response_mode(),
            test_url: to_test_url_opt(&url),
            production_url: Some(url),
        }
    }

    pub fn with_response_mode(mut self, mode: impl Into<String>) -> Self {
        self.response_mode = mode.into();
        self
    }

    /// An endpoint is usable only if it resolved to at least one URL.
    pub fn is_usable(&self) -> bool {
        self.production_url.is_some() || self.test_url.is_some()
    }

    /// Production URL, falling back to the test URL.
    pub fn preferred_url(&self) -> Option<&str> {
        self.production_url
            .as_deref()
            .or(self.test_url.as_deref())
    }
}

/// Rewrite a production webhook URL into its test form.
///
/// URLs already in test form, or not containing the production segment, are
/// returned unchanged.
pub fn to_test_url(url: &str) -> String {
    to_test_url_opt(url).unwrap_or_else(|| url.to_string())
}

fn to_test_url_opt(url: &str) -> Option<String> {
    if url.contains(PRODUCTION_SEGMENT) && !url.contains(TEST_SEGMENT) {
        Some(url.replacen(PRODUCTION_SEGMENT, TEST_SEGMENT, 1))
    } else {
        None
    }
}

/// Webhook configuration persisted in workspace metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebhookConfig {
    #[serde(default)]
    pub webhooks: Vec<WebhookEndpoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_at: Option<DateTime<Local>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_file: Option<String>,
}

impl WebhookConfig {
    pub fn new(webhooks: Vec<WebhookEndpoint>) -> Self {
        Self {
            webhooks,
            extracted_at: Some(Local::now()),
            workflow_file: None,
        }
    }

    /// First endpoint that resolved to a URL.
    pub fn first_usable(&self) -> Option<&WebhookEndpoint> {
        self.webhooks.iter().find(|w| w.is_usable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_preferred_over_id() {
        let ep = WebhookEndpoint::new(
            "http://localhost:5678/",
            "Hook",
            Some("orders".into()),
            Some("uuid-1".into()),
            None,
        );
        assert_eq!(
            ep.production_url.as_deref(),
            Some("http://localhost:5678/webhook/orders")
        );
        assert_eq!(
            ep.test_url.as_deref(),
            Some("http://localhost:5678/webhook-test/orders")
        );
        assert_eq!(ep.method, "GET");
    }

    #[test]
    fn test_id_used_without_path() {
        let ep = WebhookEndpoint::new("http://h", "Hook", None, Some("uuid-1".into()), None);
        assert_eq!(ep.production_url.as_deref(), Some("http://h/webhook/uuid-1"));
    }

    #[test]
    fn test_neither_path_nor_id_is_unusable() {
        let ep = WebhookEndpoint::new("http://h", "Hook", None, None, Some("POST".into()));
        assert!(ep.production_url.is_none());
        assert!(ep.test_url.is_none());
        assert!(!ep.is_usable());
    }

    #[test]
    fn test_to_test_url() {
        assert_eq!(to_test_url("http://h/webhook/a"), "http://h/webhook-test/a");
        assert_eq!(to_test_url("http://h/webhook-test/a"), "http://h/webhook-test/a");
        assert_eq!(to_test_url("http://h/other/a"), "http://h/other/a");
    }

    #[test]
    fn test_direct_endpoint() {
        let ep = WebhookEndpoint::direct("http://h/webhook/x", "POST");
        assert_eq!(ep.node_name, "Direct Webhook");
        assert_eq!(ep.preferred_url(), Some("http://h/webhook/x"));
        assert_eq!(ep.test_url.as_deref(), Some("http://h/webhook-test/x"));
    }

    #[test]
    fn test_config_first_usable_skips_broken() {
        let config = WebhookConfig::new(vec![
            WebhookEndpoint::new("http://h", "Broken", None, None, None),
            WebhookEndpoint::new("http://h", "Good", Some("p".into()), None, None),
        ]);
        assert_eq!(config.first_usable().unwrap().node_name, "Good");
    }

    #[test]
    fn test_endpoint_deserializes_with_defaults() {
        let ep: WebhookEndpoint =
            serde_json::from_str(r#"{"node_name":"n","production_url":"http://h/webhook/p"}"#)
                .unwrap();
        assert_eq!(ep.method, "GET");
        assert_eq!(ep.response_mode, "onReceived");
        assert!(ep.is_usable());
    }
}
