//! Workspace lifecycle under `<base>/workflows/`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use flowbench_types::{file_timestamp, iso_now};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Result, WorkspaceError};
use crate::metadata::DefinitionSummary;
use crate::workspace::Workspace;

/// Directory under the base dir holding all workspaces.
pub const WORKFLOWS_DIR: &str = "workflows";

/// Default number of log files kept by cleanup.
pub const DEFAULT_KEEP_LOGS: usize = 5;

/// Turn a definition file path into a workspace name.
///
/// Uses the file stem; characters outside `[A-Za-z0-9_-]` become `_`, runs of
/// `_` collapse, leading and trailing `_` are trimmed, and the result is
/// lowercased.
pub fn normalize_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut out = String::with_capacity(stem.len());
    for c in stem.chars() {
        let c = if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
            c
        } else {
            '_'
        };
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }
    out.trim_matches('_').to_lowercase()
}

/// Result of [`WorkspaceManager::setup`].
#[derive(Debug, Clone)]
pub struct SetupOutcome {
    pub workspace: Workspace,
    pub created: bool,
    /// Backup of the previous `workflow.json`, when one was replaced.
    pub backup: Option<PathBuf>,
}

/// A row of [`WorkspaceManager::list`].
#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceSummary {
    pub name: String,
    pub path: PathBuf,
    pub last_modified: Option<String>,
    pub version_count: usize,
    pub workflow_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    base_dir: PathBuf,
}

impl WorkspaceManager {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn workflows_dir(&self) -> PathBuf {
        self.base_dir.join(WORKFLOWS_DIR)
    }

    /// Create or refresh the workspace for a definition file.
    ///
    /// An existing `workflow.json` is copied to `versions/v<ts>_workflow.json`
    /// before being replaced.
    pub fn setup(&self, json_path: &Path) -> Result<SetupOutcome> {
        if !json_path.is_file() {
            return Err(WorkspaceError::WorkflowFileNotFound(json_path.to_path_buf()));
        }
        let name = normalize_name(json_path);
        if name.is_empty() {
            return Err(WorkspaceError::InvalidName(json_path.display().to_string()));
        }

        let root = self.workflows_dir().join(&name);
        let created = !root.exists();
        let workspace = Workspace::create(&root)?;

        let target = workspace.workflow_path();
        let mut backup = None;
        if !created && target.exists() {
            let path = workspace
                .versions_dir()
                .join(format!("v{}_workflow.json", file_timestamp()));
            fs::copy(&target, &path).map_err(WorkspaceError::io(&path))?;
            info!(backup = %path.display(), "backed up existing workflow");
            backup = Some(path);
        }

        fs::copy(json_path, &target).map_err(WorkspaceError::io(&target))?;
        self.refresh_metadata(&workspace, &name)?;

        info!(workspace = %root.display(), created, "workspace ready");
        Ok(SetupOutcome {
            workspace,
            created,
            backup,
        })
    }

    fn refresh_metadata(&self, workspace: &Workspace, name: &str) -> Result<()> {
        let version_count = count_versions(&workspace.versions_dir())?;
        let summary = workspace
            .load_definition()
            .ok()
            .map(|d| DefinitionSummary::from(&d));

        workspace.update_metadata(|m| {
            let now = iso_now();
            if m.workflow_name.is_none() {
                m.workflow_name = Some(name.to_string());
            }
            if m.created_at.is_none() {
                m.created_at = Some(now.clone());
            }
            m.last_modified = Some(now);
            m.version_count = Some(version_count);
            if summary.is_some() {
                m.n8n_config = summary;
            }
        })?;
        Ok(())
    }

    /// Workspaces that carry a `metadata.json`, sorted by name.
    pub fn list(&self) -> Result<Vec<WorkspaceSummary>> {
        let dir = self.workflows_dir();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut out = Vec::new();
        for entry in fs::read_dir(&dir).map_err(WorkspaceError::io(&dir))? {
            let path = entry.map_err(WorkspaceError::io(&dir))?.path();
            if !path.is_dir() {
                continue;
            }
            let workspace = Workspace::open(&path)?;
            if !workspace.metadata_path().exists() {
                continue;
            }
            let metadata = match workspace.load_metadata() {
                Ok(m) => m,
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "skipping unreadable metadata");
                    continue;
                }
            };
            out.push(WorkspaceSummary {
                name: workspace.name(),
                path,
                last_modified: metadata.last_modified,
                version_count: metadata.version_count.unwrap_or(0),
                workflow_id: metadata.workflow_id,
            });
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    /// Open a workspace by name.
    pub fn get(&self, name: &str) -> Result<Workspace> {
        let path = self.workflows_dir().join(name);
        if !path.is_dir() {
            return Err(WorkspaceError::NotFound(name.to_string()));
        }
        Workspace::open(path)
    }

    /// Keep the newest `keep` `*.log` files by mtime and delete the rest.
    ///
    /// Returns the deleted paths. Metadata and context files are untouched.
    pub fn cleanup_logs(&self, name: &str, keep: usize) -> Result<Vec<PathBuf>> {
        let workspace = self.get(name)?;
        cleanup_logs(&workspace, keep)
    }
}

/// [`WorkspaceManager::cleanup_logs`] for an already-open workspace.
pub fn cleanup_logs(workspace: &Workspace, keep: usize) -> Result<Vec<PathBuf>> {
    let dir = workspace.logs_dir();
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut logs: Vec<(SystemTime, PathBuf)> = Vec::new();
    for entry in fs::read_dir(&dir).map_err(WorkspaceError::io(&dir))? {
        let entry = entry.map_err(WorkspaceError::io(&dir))?;
        let path = entry.path();
        if path.extension().is_some_and(|e| e == "log") && path.is_file() {
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            logs.push((modified, path));
        }
    }
    // Newest first; name breaks ties so same-second files sort by timestamp.
    logs.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));

    let mut removed = Vec::new();
    for (_, path) in logs.into_iter().skip(keep) {
        fs::remove_file(&path).map_err(WorkspaceError::io(&path))?;
        debug!(path = %path.display(), "removed old log");
        removed.push(path);
    }
    Ok(removed)
}

fn count_versions(dir: &Path) -> Result<usize> {
    if !dir.is_dir() {
        return Ok(0);
    }
    let mut count = 0;
    for entry in fs::read_dir(dir).map_err(WorkspaceError::io(dir))? {
        let name = entry.map_err(WorkspaceError::io(dir))?.file_name();
        let name = name.to_string_lossy();
        if name.starts_with('v') && name.ends_with("_workflow.json") {
            count += 1;
        }
    }
    Ok(count)
}
