//! The seam between the orchestrator and each execution method.

use std::time::Instant;

use async_trait::async_trait;
use flowbench_types::{ExecutionMethod, ExecutionResult};
use flowbench_workspace::{ExecutionLogs, Metadata};

use crate::error::Result;

/// Everything an attempt needs to know about the run it belongs to.
pub struct AttemptContext<'a> {
    pub workflow_id: &'a str,
    pub metadata: &'a Metadata,
    pub logs: &'a ExecutionLogs,
    pub debug: bool,
    /// Use test webhook URLs. A webhook attempt may switch this on when the
    /// production URL is not registered.
    pub test_mode: bool,
    pub started: Instant,
}

impl AttemptContext<'_> {
    /// Seconds since the attempt began.
    pub fn elapsed_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }
}

/// One way of running a workflow.
///
/// `Ok` means the method produced a result, whatever its status. `Err` means
/// the method itself failed; under automatic selection the orchestrator moves
/// on to the next strategy unless the error is fatal.
#[async_trait]
pub trait ExecutionStrategy: Send + Sync {
    fn method(&self) -> ExecutionMethod;

    async fn attempt(&self, ctx: &mut AttemptContext<'_>) -> Result<ExecutionResult>;
}
