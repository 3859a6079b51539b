//! Execution methods, statuses and the normalized execution result.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a workflow run is triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMethod {
    /// Try webhook (when known), then API, then CLI.
    #[default]
    Auto,
    Api,
    Cli,
    Webhook,
}

impl ExecutionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMethod::Auto => "auto",
            ExecutionMethod::Api => "api",
            ExecutionMethod::Cli => "cli",
            ExecutionMethod::Webhook => "webhook",
        }
    }
}

impl fmt::Display for ExecutionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(ExecutionMethod::Auto),
            "api" => Ok(ExecutionMethod::Api),
            "cli" => Ok(ExecutionMethod::Cli),
            "webhook" => Ok(ExecutionMethod::Webhook),
            other => Err(format!(
                "unknown execution method '{other}' (expected auto, api, cli or webhook)"
            )),
        }
    }
}

/// Terminal status of one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Success,
    Error,
    /// Polling ran out of attempts before the engine reported a terminal state.
    Timeout,
    /// Polling itself failed, so the outcome is not known.
    Unknown,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Success => "success",
            ExecutionStatus::Error => "error",
            ExecutionStatus::Timeout => "timeout",
            ExecutionStatus::Unknown => "unknown",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionStatus::Success)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized outcome of an execution attempt, whatever method produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Engine execution id. CLI runs have none.
    pub execution_id: Option<String>,
    pub status: ExecutionStatus,
    /// Wall-clock seconds spent in the attempt.
    pub duration: f64,
    /// The concrete method that produced this result (never `Auto`).
    pub method: ExecutionMethod,
    /// Engine execution detail or webhook response body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_status: Option<u16>,
    /// Process exit code for CLI runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_code: Option<i32>,
}

impl ExecutionResult {
    /// A bare result; callers fill in the optional detail.
    pub fn new(method: ExecutionMethod, status: ExecutionStatus, duration: f64) -> Self {
        Self {
            execution_id: None,
            status,
            duration: duration.max(0.0),
            method,
            data: None,
            error: None,
            webhook_url: None,
            response_status: None,
            return_code: None,
        }
    }

    pub fn with_execution_id(mut self, id: impl Into<String>) -> Self {
        self.execution_id = Some(id.into());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}
