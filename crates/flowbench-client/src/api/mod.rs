//! API endpoint implementations.

mod executions;
mod webhooks;
mod workflows;

pub use executions::ExecutionsApi;
pub use webhooks::{EXECUTION_ID_HEADER, WebhooksApi};
pub use workflows::WorkflowsApi;
