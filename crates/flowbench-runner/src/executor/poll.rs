//! Execution status polling.

use flowbench_client::{EngineClient, ExecutionRecord};
use flowbench_config::PollingConfig;
use flowbench_types::ExecutionStatus;
use flowbench_workspace::ExecutionLogs;
use tracing::{debug, warn};

/// How a poll loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The engine reported a terminal state.
    Finished { status: ExecutionStatus, polls: u32 },
    /// `max_polls` checks without a terminal state.
    Exhausted { polls: u32 },
    /// A status request failed; the loop stopped early.
    Unknown { polls: u32, error: String },
}

impl PollOutcome {
    pub fn status(&self) -> ExecutionStatus {
        match self {
            PollOutcome::Finished { status, .. } => *status,
            PollOutcome::Exhausted { .. } => ExecutionStatus::Timeout,
            PollOutcome::Unknown { .. } => ExecutionStatus::Unknown,
        }
    }

    pub fn polls(&self) -> u32 {
        match self {
            PollOutcome::Finished { polls, .. }
            | PollOutcome::Exhausted { polls }
            | PollOutcome::Unknown { polls, .. } => *polls,
        }
    }
}

/// Terminal status of an execution record, if it has one.
///
/// A stop time together with an `error` field, or an engine status of
/// `error`/`crashed`/`failed`, is an error. `finished` or an engine status of
/// `success` is a success. Error indicators win.
pub fn terminal_status(record: &ExecutionRecord) -> Option<ExecutionStatus> {
    let engine_status = record.status.as_deref().map(str::to_ascii_lowercase);

    let failed = (record.stopped_at.is_some() && record.has_error_field())
        || matches!(engine_status.as_deref(), Some("error" | "crashed" | "failed"));
    if failed {
        return Some(ExecutionStatus::Error);
    }
    if record.finished || engine_status.as_deref() == Some("success") {
        return Some(ExecutionStatus::Success);
    }
    None
}

fn note(logs: &ExecutionLogs, line: &str) {
    if let Err(e) = logs.append_execution(line) {
        warn!(error = %e, "failed to write execution log");
    }
}

/// Poll `GET /executions/{id}` until terminal, failed, or out of polls.
///
/// Sleeps `interval` between checks but not after the last one.
pub async fn poll_execution(
    client: &EngineClient,
    execution_id: &str,
    polling: &PollingConfig,
    logs: &ExecutionLogs,
    debug_mode: bool,
) -> PollOutcome {
    let api = client.executions();
    let max = polling.max_polls.max(1);

    for i in 0..max {
        let polls = i + 1;
        let record = match api.get(execution_id).await {
            Ok(record) => record,
            Err(e) => {
                note(logs, &format!("Error polling status: {e}"));
                return PollOutcome::Unknown {
                    polls,
                    error: e.to_string(),
                };
            }
        };

        if debug_mode && i % 5 == 0 {
            note(logs, &format!("Poll {polls}: Status check..."));
        }
        debug!(execution_id, poll = polls, finished = record.finished, "polled execution");

        if let Some(status) = terminal_status(&record) {
            note(logs, &format!("Execution completed with status: {status}"));
            return PollOutcome::Finished { status, polls };
        }

        if polls < max {
            tokio::time::sleep(polling.interval()).await;
        }
    }

    note(logs, "Execution timed out");
    PollOutcome::Exhausted { polls: max }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> ExecutionRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_finished_is_success() {
        let r = record(json!({ "finished": true }));
        assert_eq!(terminal_status(&r), Some(ExecutionStatus::Success));
    }

    #[test]
    fn test_stopped_with_error_is_error() {
        let r = record(json!({ "finished": false, "stoppedAt": "t", "error": {} }));
        assert_eq!(terminal_status(&r), Some(ExecutionStatus::Error));
    }

    #[test]
    fn test_error_without_stop_time_is_running() {
        let r = record(json!({ "finished": false, "stoppedAt": null, "error": {} }));
        assert_eq!(terminal_status(&r), None);
    }

    #[test]
    fn test_engine_status_field() {
        assert_eq!(
            terminal_status(&record(json!({ "status": "crashed" }))),
            Some(ExecutionStatus::Error)
        );
        assert_eq!(
            terminal_status(&record(json!({ "status": "success" }))),
            Some(ExecutionStatus::Success)
        );
        assert_eq!(terminal_status(&record(json!({ "status": "running" }))), None);
    }

    #[test]
    fn test_outcome_status_mapping() {
        assert_eq!(PollOutcome::Exhausted { polls: 60 }.status(), ExecutionStatus::Timeout);
        let unknown = PollOutcome::Unknown {
            polls: 2,
            error: "x".into(),
        };
        assert_eq!(unknown.status(), ExecutionStatus::Unknown);
        assert_eq!(unknown.polls(), 2);
    }
}
