//! Workflow workspaces.
//!
//! Each workflow the workbench manages lives in its own directory under
//! `<base>/workflows/<name>/`, holding the definition, metadata, logs, saved
//! execution context and version backups. This crate owns that layout; it
//! never talks to the engine.

pub mod collector;
pub mod error;
pub mod manager;
pub mod metadata;
pub mod workspace;

pub use collector::{CollectedContext, CollectorOptions, ContextCollector, DebugContext};
pub use error::{Result, WorkspaceError};
pub use manager::{
    DEFAULT_KEEP_LOGS, SetupOutcome, WorkspaceManager, WorkspaceSummary, cleanup_logs,
    normalize_name,
};
pub use metadata::{DefinitionSummary, LastExecution, LastImport, Metadata};
pub use workspace::{ExecutionLogs, ImportLog, Workspace};
