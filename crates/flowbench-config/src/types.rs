//! Configuration document types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

/// Default engine base URL.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5678";

/// Environment variable overriding `n8n_api.base_url`.
pub const ENV_BASE_URL: &str = "N8N_API_URL";

/// Environment variable overriding `n8n_api.api_key`.
pub const ENV_API_KEY: &str = "N8N_API_KEY";

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowbenchConfig {
    #[serde(default)]
    pub n8n_api: ApiConfig,
    #[serde(default)]
    pub debug: DebugConfig,
    #[serde(default)]
    pub cli: CliConfig,
    #[serde(default)]
    pub polling: PollingConfig,
}

impl FlowbenchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON config document.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Apply `N8N_API_URL` / `N8N_API_KEY` from the process environment.
    pub fn apply_env_overrides(&mut self) -> Vec<&'static str> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup. Empty values are ignored.
    ///
    /// Returns the names of the variables that took effect.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Vec<&'static str>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut applied = Vec::new();
        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            self.n8n_api.base_url = url;
            applied.push(ENV_BASE_URL);
        }
        if let Some(key) = lookup(ENV_API_KEY).filter(|v| !v.is_empty()) {
            self.n8n_api.api_key = key;
            applied.push(ENV_API_KEY);
        }
        applied
    }

    fn validate(&self) -> Result<()> {
        if self.n8n_api.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "n8n_api.base_url".into(),
                reason: "must not be empty".into(),
            });
        }
        if self.polling.max_polls == 0 {
            return Err(ConfigError::Invalid {
                field: "polling.max_polls".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

/// Engine connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Sent as `X-N8N-API-KEY` when non-empty.
    #[serde(default)]
    pub api_key: String,
}

impl ApiConfig {
    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

/// Diagnostic capture flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Attach an `environment` block to saved execution context.
    #[serde(default = "default_true")]
    pub capture_env: bool,
    #[serde(default = "default_true")]
    pub save_execution_data: bool,
}

impl DebugConfig {
    pub fn debug_enabled(&self) -> bool {
        self.log_level.eq_ignore_ascii_case("debug")
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            capture_env: true,
            save_execution_data: true,
        }
    }
}

fn default_log_level() -> String {
    "debug".to_string()
}

fn default_true() -> bool {
    true
}

/// External engine executable settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default = "default_executable")]
    pub executable: String,
    /// Longest wait for the next line of CLI output before the run is abandoned.
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
}

impl CliConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            executable: default_executable(),
            read_timeout_secs: default_read_timeout_secs(),
        }
    }
}

fn default_executable() -> String {
    "n8n".to_string()
}

fn default_read_timeout_secs() -> u64 {
    300
}

/// Execution status polling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_max_polls")]
    pub max_polls: u32,
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_polls: default_max_polls(),
        }
    }
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_max_polls() -> u32 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = FlowbenchConfig::new();
        assert_eq!(config.n8n_api.base_url, DEFAULT_BASE_URL);
        assert!(!config.n8n_api.has_api_key());
        assert!(config.debug.capture_env);
        assert_eq!(config.cli.executable, "n8n");
        assert_eq!(config.polling.max_polls, 60);
        assert_eq!(config.polling.interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_parse_partial_document() {
        let config = FlowbenchConfig::from_json(
            r#"{ "n8n_api": { "base_url": "https://flows.example.com/" } }"#,
        )
        .unwrap();
        assert_eq!(config.n8n_api.base_url(), "https://flows.example.com");
        assert_eq!(config.n8n_api.api_key, "");
        assert_eq!(config.debug.log_level, "debug");
    }

    #[test]
    fn test_parse_full_document() {
        let config = FlowbenchConfig::from_json(
            r#"{
                "n8n_api": { "base_url": "http://h:1", "api_key": "k" },
                "debug": { "log_level": "info", "capture_env": false, "save_execution_data": false },
                "cli": { "executable": "/opt/n8n/bin/n8n", "read_timeout_secs": 10 },
                "polling": { "interval_ms": 50, "max_polls": 5 }
            }"#,
        )
        .unwrap();
        assert!(config.n8n_api.has_api_key());
        assert!(!config.debug.debug_enabled());
        assert_eq!(config.cli.read_timeout(), Duration::from_secs(10));
        assert_eq!(config.polling.max_polls, 5);
    }

    #[test]
    fn test_rejects_zero_polls() {
        let err = FlowbenchConfig::from_json(r#"{ "polling": { "max_polls": 0 } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> =
            HashMap::from([(ENV_BASE_URL, "http://override:5678"), (ENV_API_KEY, "secret")]);
        let mut config = FlowbenchConfig::new();
        let applied = config.apply_overrides_from(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(applied, vec![ENV_BASE_URL, ENV_API_KEY]);
        assert_eq!(config.n8n_api.base_url, "http://override:5678");
        assert_eq!(config.n8n_api.api_key, "secret");
    }

    #[test]
    fn test_empty_env_values_ignored() {
        let mut config = FlowbenchConfig::new();
        let applied = config.apply_overrides_from(|_| Some(String::new()));
        assert!(applied.is_empty());
        assert_eq!(config.n8n_api.base_url, DEFAULT_BASE_URL);
    }
}
