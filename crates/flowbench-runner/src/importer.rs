//! Pushing a workspace definition to the engine.

use flowbench_client::EngineClient;
use flowbench_types::{WebhookConfig, WorkflowDefinition, file_timestamp, iso_now};
use flowbench_workspace::{DefinitionSummary, ImportLog, LastImport, Workspace};
use serde::Serialize;
use tracing::{info, warn};

use crate::activation::ActivationController;
use crate::error::{Result, RunnerError};
use crate::webhook::{Registration, WebhookResolver};

/// Load and validate a workspace definition without contacting the engine.
pub fn validate(workspace: &Workspace) -> Result<WorkflowDefinition> {
    let definition = workspace.load_definition()?;
    definition.validate()?;
    Ok(definition)
}

#[derive(Debug, Clone, Copy)]
pub struct ImportOptions {
    /// Store webhook endpoints in metadata.
    pub extract_webhooks: bool,
    /// Activate after a successful import.
    pub activate: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            extract_webhooks: true,
            activate: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistrationCheck {
    pub url: String,
    pub method: String,
    #[serde(flatten)]
    pub registration: Registration,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportOutcome {
    pub workflow_id: String,
    /// True when an existing workflow was updated in place.
    pub updated: bool,
    pub webhook_count: usize,
    pub activated: bool,
    pub registrations: Vec<RegistrationCheck>,
    pub warnings: Vec<String>,
}

pub struct Importer {
    client: EngineClient,
    resolver: WebhookResolver,
    activation: ActivationController,
}

impl Importer {
    pub fn new(client: EngineClient) -> Self {
        Self {
            resolver: WebhookResolver::new(client.clone()),
            activation: ActivationController::new(client.clone()),
            client,
        }
    }

    /// Create or update the workspace's workflow on the engine.
    ///
    /// Every attempt leaves a `logs/import_<ts>.log`. Failures after the
    /// workflow exists upstream (activation, registration probes) are
    /// reported as warnings and do not fail the import.
    pub async fn import(&self, workspace: &Workspace, options: ImportOptions) -> Result<ImportOutcome> {
        let timestamp = file_timestamp();
        let api_url = self.client.base_url_str().to_string();

        match self.push(workspace, options, &timestamp).await {
            Ok(outcome) => {
                workspace.write_import_log(
                    &timestamp,
                    &ImportLog::success(&outcome.workflow_id, &api_url),
                )?;
                Ok(outcome)
            }
            Err(e) => {
                let detail = match e.upstream_body() {
                    Some(body) => format!("{e}: {body}"),
                    None => e.to_string(),
                };
                warn!(workspace = %workspace.name(), error = %detail, "import failed");
                workspace.write_import_log(&timestamp, &ImportLog::failed(detail, &api_url))?;
                Err(e)
            }
        }
    }

    async fn push(
        &self,
        workspace: &Workspace,
        options: ImportOptions,
        timestamp: &str,
    ) -> Result<ImportOutcome> {
        let definition = validate(workspace)?;
        let payload = definition.strip_read_only();

        let (workflow, updated) = match definition.id() {
            Some(id) => (self.client.workflows().update(&id, &payload).await?, true),
            None => (self.client.workflows().create(&payload).await?, false),
        };
        // Some engine versions omit the id from update responses.
        let workflow_id = if workflow.id.is_empty() {
            definition
                .id()
                .ok_or_else(|| RunnerError::MissingWorkflowId(workspace.name()))?
        } else {
            workflow.id
        };
        info!(workflow_id, updated, name = definition.name(), "workflow imported");

        let endpoints = if options.extract_webhooks {
            self.resolver.extract(&definition)
        } else {
            Vec::new()
        };

        let mut warnings = Vec::new();
        let mut activated = false;
        if options.activate {
            match self.activation.activate(&workflow_id).await {
                Ok(outcome) => activated = outcome.active,
                Err(e) => {
                    warn!(workflow_id, error = %e, "activation after import failed");
                    warnings.push(format!("activation failed: {e}"));
                }
            }
        }

        let node_count = definition.node_count();
        workspace.update_metadata(|m| {
            m.workflow_id = Some(workflow_id.clone());
            m.workflow_name = Some(definition.name().to_string());
            m.last_updated = Some(iso_now());
            m.n8n_config = Some(DefinitionSummary::from(&definition));
            m.last_import = Some(LastImport {
                timestamp: timestamp.to_string(),
                workflow_id: workflow_id.clone(),
                node_count,
            });
            if options.extract_webhooks {
                m.webhook_config = Some(WebhookConfig::new(endpoints.clone()));
            }
        })?;

        let mut registrations = Vec::new();
        for endpoint in &endpoints {
            let Some(url) = endpoint.production_url.as_deref() else {
                continue;
            };
            let registration = self
                .resolver
                .verify_registration(url, &endpoint.method)
                .await;
            if !registration.registered {
                let reason = registration.reason.as_deref().unwrap_or("unknown");
                warn!(url, reason, "webhook not registered");
                warnings.push(format!("webhook {url} not registered: {reason}"));
            }
            registrations.push(RegistrationCheck {
                url: url.to_string(),
                method: endpoint.method.clone(),
                registration,
            });
        }

        Ok(ImportOutcome {
            workflow_id,
            updated,
            webhook_count: endpoints.len(),
            activated,
            registrations,
            warnings,
        })
    }
}
