//! Workflow lifecycle against a remote engine.
//!
//! Everything here that talks to the engine goes through
//! [`flowbench_client::EngineClient`] and records its results in a
//! [`flowbench_workspace::Workspace`].
//!
//! ```text
//! ┌──────────────┐   import    ┌──────────────┐
//! │  Workspace   │ ──────────► │    Engine    │
//! │ workflow.json│             │  REST + hooks│
//! │ metadata.json│ ◄────────── │              │
//! └──────────────┘   execute   └──────────────┘
//!        ▲            webhook → api → cli
//!        │
//!   logs/, context/
//! ```
//!
//! - [`webhook`]: endpoint extraction, registration probes, triggers
//! - [`activation`]: idempotent activate/deactivate with read-back
//! - [`executor`]: the method cascade and result recording
//! - [`importer`]: create/update a workflow from its workspace
//! - [`cycle`]: import → execute → collect, and the repeat-until-green loop

pub mod activation;
pub mod cycle;
pub mod error;
pub mod executor;
pub mod importer;
pub mod webhook;

pub use activation::{
    ActivationController, ActivationOutcome, BatchItem, BatchReport, WorkflowStatus,
    WorkflowSummary,
};
pub use cycle::{DebugCycleReport, RunReport, Workbench};
pub use error::{Result, RunnerError};
pub use executor::{
    ApiStrategy, AttemptContext, CliStrategy, ExecuteOptions, ExecutionOutcome,
    ExecutionStrategy, Orchestrator, PollOutcome, WebhookStrategy, poll_execution,
};
pub use importer::{ImportOptions, ImportOutcome, Importer, RegistrationCheck, validate};
pub use webhook::{
    PROBE_TIMEOUT, Registration, TRIGGER_TIMEOUT, TriggerOutcome, WebhookResolver,
    extract_endpoints, manual_payload, test_payload, usable_endpoints,
};
