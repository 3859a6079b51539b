//! Shared types for the flowbench workflow workbench.

pub mod definition;
pub mod error;
pub mod execution;
pub mod webhook;

pub use definition::{NodeView, READ_ONLY_FIELDS, WorkflowDefinition, WorkflowRef, value_to_id};
pub use error::ValidationError;
pub use execution::{ExecutionMethod, ExecutionResult, ExecutionStatus};
pub use webhook::{PRODUCTION_SEGMENT, TEST_SEGMENT, WebhookConfig, WebhookEndpoint, to_test_url};

/// Timestamp format used for log, context and version file names.
pub const FILE_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Current local time formatted for file names (`20240131_142501`).
pub fn file_timestamp() -> String {
    chrono::Local::now().format(FILE_TIMESTAMP_FORMAT).to_string()
}

/// Current local time as an ISO 8601 string.
pub fn iso_now() -> String {
    chrono::Local::now().to_rfc3339()
}
