use flowbench_types::ValidationError;
use flowbench_workspace::WorkspaceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunnerError {
    /// Network or HTTP failure talking to the engine.
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        /// Upstream error body, when the engine sent one.
        body: Option<String>,
    },

    /// The engine did not report the requested state after the action.
    #[error("Workflow {id} is still active={observed} after the state change")]
    ActivationMismatch { id: String, observed: bool },

    /// Webhook request exceeded its timeout. Never retried.
    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Invalid workflow definition: {0}")]
    Validation(#[from] ValidationError),

    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Workspace(WorkspaceError),

    /// Every method of an automatic execution failed.
    #[error("All execution methods failed; last error: {last}")]
    MethodsExhausted { last: Box<RunnerError> },

    #[error("No usable webhook endpoint is stored for this workspace")]
    NoWebhook,

    #[error("No workflow id known for {0}; import it first or pass one explicitly")]
    MissingWorkflowId(String),
}

impl RunnerError {
    /// Errors that stop an automatic execution instead of falling through to
    /// the next method.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RunnerError::Timeout(_) | RunnerError::Spawn { .. } | RunnerError::Workspace(_)
        )
    }

    /// Upstream error body carried by this error or the one it wraps.
    pub fn upstream_body(&self) -> Option<&str> {
        match self {
            RunnerError::Transport { body, .. } => body.as_deref(),
            RunnerError::MethodsExhausted { last } => last.upstream_body(),
            _ => None,
        }
    }
}

impl From<flowbench_client::Error> for RunnerError {
    fn from(e: flowbench_client::Error) -> Self {
        RunnerError::Transport {
            body: e.upstream_body().map(str::to_string),
            message: e.to_string(),
        }
    }
}

impl From<WorkspaceError> for RunnerError {
    fn from(e: WorkspaceError) -> Self {
        match e {
            WorkspaceError::Definition(v) => RunnerError::Validation(v),
            other => RunnerError::Workspace(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, RunnerError>;
