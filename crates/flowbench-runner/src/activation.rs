//! Workflow activation with read-back verification.

use flowbench_client::{EngineClient, Workflow};
use flowbench_workspace::Workspace;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{Result, RunnerError};

/// Result of a single state change request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivationOutcome {
    pub id: String,
    pub name: String,
    pub active: bool,
    /// False when the workflow was already in the requested state.
    pub changed: bool,
}

/// One entry of a batch state change.
#[derive(Debug, Clone, Serialize)]
pub struct BatchItem {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ActivationOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchItem {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_some()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub results: Vec<BatchItem>,
    pub changed: usize,
    pub unchanged: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowStatus {
    pub id: String,
    pub name: String,
    pub active: bool,
    pub node_count: usize,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl From<Workflow> for WorkflowStatus {
    fn from(wf: Workflow) -> Self {
        Self {
            node_count: wf.node_count(),
            id: wf.id,
            name: wf.name,
            active: wf.active,
            created_at: wf.created_at,
            updated_at: wf.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowSummary {
    pub id: String,
    pub name: String,
    pub active: bool,
}

#[derive(Clone)]
pub struct ActivationController {
    client: EngineClient,
}

impl ActivationController {
    pub fn new(client: EngineClient) -> Self {
        Self { client }
    }

    /// Bring a workflow to `desired` state.
    ///
    /// Reads the current state first and issues no mutating request when it
    /// already matches. Otherwise posts the action and reads the state back;
    /// a read-back that disagrees is an [`RunnerError::ActivationMismatch`].
    pub async fn set_active(&self, id: &str, desired: bool) -> Result<ActivationOutcome> {
        let api = self.client.workflows();
        let current = api.get(id).await?;

        if current.active == desired {
            info!(id, active = desired, "workflow already in requested state");
            return Ok(ActivationOutcome {
                id: id.to_string(),
                name: current.name,
                active: desired,
                changed: false,
            });
        }

        if desired {
            api.activate(id).await?;
        } else {
            api.deactivate(id).await?;
        }

        let after = api.get(id).await?;
        if after.active != desired {
            return Err(RunnerError::ActivationMismatch {
                id: id.to_string(),
                observed: after.active,
            });
        }

        info!(id, active = desired, "workflow state changed");
        Ok(ActivationOutcome {
            id: id.to_string(),
            name: after.name,
            active: desired,
            changed: true,
        })
    }

    pub async fn activate(&self, id: &str) -> Result<ActivationOutcome> {
        self.set_active(id, true).await
    }

    pub async fn deactivate(&self, id: &str) -> Result<ActivationOutcome> {
        self.set_active(id, false).await
    }

    /// Apply `desired` to every id in order, isolating failures per item.
    pub async fn batch(&self, ids: &[String], desired: bool) -> BatchReport {
        let mut report = BatchReport::default();
        for id in ids {
            match self.set_active(id, desired).await {
                Ok(outcome) => {
                    if outcome.changed {
                        report.changed += 1;
                    } else {
                        report.unchanged += 1;
                    }
                    report.results.push(BatchItem {
                        id: id.clone(),
                        outcome: Some(outcome),
                        error: None,
                    });
                }
                Err(e) => {
                    warn!(id = %id, error = %e, "batch state change failed");
                    report.failed += 1;
                    report.results.push(BatchItem {
                        id: id.clone(),
                        outcome: None,
                        error: Some(e.to_string()),
                    });
                }
            }
        }
        report
    }

    pub async fn status(&self, id: &str) -> Result<WorkflowStatus> {
        Ok(self.client.workflows().get(id).await?.into())
    }

    pub async fn list(&self) -> Result<Vec<WorkflowSummary>> {
        let list = self.client.workflows().list().await?;
        Ok(list
            .data
            .into_iter()
            .map(|wf| WorkflowSummary {
                id: wf.id,
                name: wf.name,
                active: wf.active,
            })
            .collect())
    }

    /// [`set_active`](Self::set_active) for the workflow id stored in a
    /// workspace's metadata.
    pub async fn set_active_from_workspace(
        &self,
        workspace: &Workspace,
        desired: bool,
    ) -> Result<ActivationOutcome> {
        let id = workspace
            .load_metadata()?
            .workflow_id
            .ok_or_else(|| RunnerError::MissingWorkflowId(workspace.name()))?;
        self.set_active(&id, desired).await
    }
}
