//! Import, execute and collect in one pass, optionally repeated until the
//! workflow runs cleanly.

use std::path::{Path, PathBuf};

use flowbench_client::EngineClient;
use flowbench_config::FlowbenchConfig;
use flowbench_types::ExecutionMethod;
use flowbench_workspace::{
    CollectedContext, CollectorOptions, ContextCollector, DEFAULT_KEEP_LOGS, Workspace,
    WorkspaceManager, cleanup_logs,
};
use tracing::{info, warn};

use crate::error::Result;
use crate::executor::{ExecuteOptions, ExecutionOutcome, Orchestrator};
use crate::importer::{ImportOptions, ImportOutcome, Importer};

/// One import/execute/collect pass.
#[derive(Debug)]
pub struct RunReport {
    pub import: ImportOutcome,
    pub execution: Option<ExecutionOutcome>,
    /// Set when every execution method failed.
    pub execution_error: Option<String>,
    pub context: Option<CollectedContext>,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.execution
            .as_ref()
            .is_some_and(|e| e.result.is_success())
    }
}

#[derive(Debug)]
pub struct DebugCycleReport {
    pub workspace: Workspace,
    pub iterations: usize,
    pub succeeded: bool,
    pub last_run: Option<RunReport>,
    pub removed_logs: Vec<PathBuf>,
}

/// Ties the importer, orchestrator and context collector to a workspace base
/// directory.
pub struct Workbench {
    config: FlowbenchConfig,
    manager: WorkspaceManager,
    importer: Importer,
    orchestrator: Orchestrator,
    client: EngineClient,
}

impl Workbench {
    pub fn new(client: EngineClient, config: FlowbenchConfig, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            manager: WorkspaceManager::new(base_dir),
            importer: Importer::new(client.clone()),
            orchestrator: Orchestrator::new(client.clone(), config.clone()),
            client,
            config,
        }
    }

    pub fn manager(&self) -> &WorkspaceManager {
        &self.manager
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Collector settings derived from the configuration.
    ///
    /// The engine probe targets the host and port of the client's base URL.
    pub fn collector_options(&self) -> CollectorOptions {
        let defaults = CollectorOptions::default();
        let base = self.client.base_url();
        CollectorOptions {
            executable: self.config.cli.executable.clone(),
            base_url: self.client.base_url_str().to_string(),
            has_api_key: self.config.n8n_api.has_api_key(),
            engine_host: base
                .host_str()
                .map(|h| h.trim_start_matches('[').trim_end_matches(']').to_string())
                .unwrap_or(defaults.engine_host),
            engine_port: base.port_or_known_default().unwrap_or(defaults.engine_port),
        }
    }

    /// Import, execute (auto) and collect context for workspace `name`.
    pub async fn run(&self, name: &str, debug: bool) -> Result<RunReport> {
        let workspace = self.manager.get(name)?;
        self.run_workspace(&workspace, debug).await
    }

    pub async fn run_workspace(&self, workspace: &Workspace, debug: bool) -> Result<RunReport> {
        let import = self
            .importer
            .import(workspace, ImportOptions::default())
            .await?;

        let options = ExecuteOptions {
            method: ExecutionMethod::Auto,
            debug,
            ..ExecuteOptions::default()
        };
        let (execution, execution_error) = match self
            .orchestrator
            .execute(workspace, &import.workflow_id, &options)
            .await
        {
            Ok(outcome) => (Some(outcome), None),
            Err(e) => (None, Some(e.to_string())),
        };

        let context = match ContextCollector::new(workspace, self.collector_options())
            .collect_all()
            .await
        {
            Ok(collected) => Some(collected),
            Err(e) => {
                warn!(workspace = %workspace.name(), error = %e, "context collection failed");
                None
            }
        };

        Ok(RunReport {
            import,
            execution,
            execution_error,
            context,
        })
    }

    /// Set up a workspace from `json_path` and run it with debug output until
    /// a run succeeds or `max_iterations` runs have been made, then prune
    /// old logs.
    ///
    /// A failed import ends the cycle early; it is reported as an
    /// unsuccessful iteration rather than an error.
    pub async fn debug_cycle(&self, json_path: &Path, max_iterations: usize) -> Result<DebugCycleReport> {
        let setup = self.manager.setup(json_path)?;
        let workspace = setup.workspace;

        let mut iterations = 0;
        let mut succeeded = false;
        let mut last_run = None;
        while iterations < max_iterations.max(1) {
            iterations += 1;
            info!(workspace = %workspace.name(), iteration = iterations, "debug iteration");
            match self.run_workspace(&workspace, true).await {
                Ok(report) => {
                    succeeded = report.succeeded();
                    last_run = Some(report);
                    if succeeded {
                        break;
                    }
                }
                Err(e) => {
                    warn!(workspace = %workspace.name(), error = %e, "debug iteration failed");
                    break;
                }
            }
        }

        let removed_logs = cleanup_logs(&workspace, DEFAULT_KEEP_LOGS)?;
        Ok(DebugCycleReport {
            workspace,
            iterations,
            succeeded,
            last_run,
            removed_logs,
        })
    }
}
