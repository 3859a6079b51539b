//! A single workflow workspace on disk.
//!
//! ```text
//! <workspace>/
//! ├── workflow.json
//! ├── metadata.json
//! ├── logs/       execution_<ts>.log, errors_<ts>.log, import_<ts>.log
//! ├── context/    execution_<ts>.json, debug_<ts>.json, summary_<ts>.txt
//! └── versions/   v<ts>_workflow.json
//! ```

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use flowbench_types::{WorkflowDefinition, file_timestamp, iso_now};
use serde::{Deserialize, Serialize};

use crate::error::{Result, WorkspaceError};
use crate::metadata::Metadata;

pub const WORKFLOW_FILE: &str = "workflow.json";
pub const METADATA_FILE: &str = "metadata.json";
pub const LOGS_DIR: &str = "logs";
pub const CONTEXT_DIR: &str = "context";
pub const VERSIONS_DIR: &str = "versions";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Open an existing workspace directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(WorkspaceError::NotFound(root.display().to_string()));
        }
        Ok(Self { root })
    }

    /// Create the workspace and its subdirectories if missing.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        for dir in [LOGS_DIR, CONTEXT_DIR, VERSIONS_DIR] {
            let sub = root.join(dir);
            fs::create_dir_all(&sub).map_err(WorkspaceError::io(&sub))?;
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory name of the workspace.
    pub fn name(&self) -> String {
        self.root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.root.display().to_string())
    }

    pub fn workflow_path(&self) -> PathBuf {
        self.root.join(WORKFLOW_FILE)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.root.join(METADATA_FILE)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join(LOGS_DIR)
    }

    pub fn context_dir(&self) -> PathBuf {
        self.root.join(CONTEXT_DIR)
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.root.join(VERSIONS_DIR)
    }

    /// Load `workflow.json` without validating it.
    pub fn load_definition(&self) -> Result<WorkflowDefinition> {
        let path = self.workflow_path();
        if !path.is_file() {
            return Err(WorkspaceError::WorkflowFileNotFound(path));
        }
        let text = fs::read_to_string(&path).map_err(WorkspaceError::io(&path))?;
        let value: serde_json::Value =
            serde_json::from_str(&text).map_err(WorkspaceError::json(&path))?;
        Ok(WorkflowDefinition::from_value(value)?)
    }

    /// Load metadata; a missing file yields empty metadata.
    pub fn load_metadata(&self) -> Result<Metadata> {
        let path = self.metadata_path();
        if !path.exists() {
            return Ok(Metadata::default());
        }
        let text = fs::read_to_string(&path).map_err(WorkspaceError::io(&path))?;
        serde_json::from_str(&text).map_err(WorkspaceError::json(&path))
    }

    pub fn save_metadata(&self, metadata: &Metadata) -> Result<()> {
        write_json(&self.metadata_path(), metadata)
    }

    /// Read-modify-write of `metadata.json`. Last writer wins.
    pub fn update_metadata<F>(&self, f: F) -> Result<Metadata>
    where
        F: FnOnce(&mut Metadata),
    {
        let mut metadata = self.load_metadata()?;
        f(&mut metadata);
        self.save_metadata(&metadata)?;
        Ok(metadata)
    }

    /// A file timestamp no earlier execution in this workspace has used.
    ///
    /// Runs started within the same second get a `_<n>` suffix instead of
    /// sharing log and context files.
    pub fn execution_timestamp(&self) -> String {
        let taken = |ts: &str| {
            let logs = self.execution_logs(ts);
            logs.execution_log.exists()
                || logs.error_log.exists()
                || self.execution_context_path(ts).exists()
        };

        let base = file_timestamp();
        if !taken(&base) {
            return base;
        }
        let mut n = 1;
        loop {
            let candidate = format!("{base}_{n}");
            if !taken(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Log files for one execution attempt.
    pub fn execution_logs(&self, timestamp: &str) -> ExecutionLogs {
        let logs = self.logs_dir();
        ExecutionLogs {
            execution_log: logs.join(format!("execution_{timestamp}.log")),
            error_log: logs.join(format!("errors_{timestamp}.log")),
        }
    }

    /// Write `context/execution_<ts>.json`.
    pub fn save_execution_context(
        &self,
        timestamp: &str,
        context: &serde_json::Value,
    ) -> Result<PathBuf> {
        let path = self.execution_context_path(timestamp);
        write_json(&path, context)?;
        Ok(path)
    }

    fn execution_context_path(&self, timestamp: &str) -> PathBuf {
        self.context_dir()
            .join(format!("execution_{timestamp}.json"))
    }

    /// Write `logs/import_<ts>.log`.
    pub fn write_import_log(&self, timestamp: &str, entry: &ImportLog) -> Result<PathBuf> {
        let path = self.logs_dir().join(format!("import_{timestamp}.log"));
        write_json(&path, entry)?;
        Ok(path)
    }

    /// Path relative to the workspace root, for display and metadata.
    pub fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }
}

/// Paths of the execution and error logs of a single attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionLogs {
    pub execution_log: PathBuf,
    pub error_log: PathBuf,
}

impl ExecutionLogs {
    /// Append `[<iso>] message` to the error log.
    pub fn log_error(&self, message: &str) -> Result<()> {
        append_line(&self.error_log, &format!("[{}] {}", iso_now(), message))
    }

    /// Append a raw line to the execution log.
    pub fn append_execution(&self, line: &str) -> Result<()> {
        append_line(&self.execution_log, line)
    }

    /// Append a raw line to the error log.
    pub fn append_error(&self, line: &str) -> Result<()> {
        append_line(&self.error_log, line)
    }

    /// Append a pretty JSON document to the execution log.
    pub fn write_execution_json(&self, value: &serde_json::Value) -> Result<()> {
        let text = serde_json::to_string_pretty(value)
            .map_err(WorkspaceError::json(&self.execution_log))?;
        append_line(&self.execution_log, &text)
    }
}

/// Outcome of an import, written to `logs/import_<ts>.log`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportLog {
    pub timestamp: String,
    pub operation: String,
    /// `success` or `failed`.
    pub status: String,
    pub workflow_id: Option<String>,
    pub api_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ImportLog {
    pub fn success(workflow_id: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            timestamp: iso_now(),
            operation: "import".to_string(),
            status: "success".to_string(),
            workflow_id: Some(workflow_id.into()),
            api_url: api_url.into(),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            timestamp: iso_now(),
            operation: "import".to_string(),
            status: "failed".to_string(),
            workflow_id: None,
            api_url: api_url.into(),
            error: Some(error.into()),
        }
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(WorkspaceError::io(parent))?;
    }
    Ok(())
}

pub(crate) fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    ensure_parent(path)?;
    let text = serde_json::to_string_pretty(value).map_err(WorkspaceError::json(path))?;
    fs::write(path, text).map_err(WorkspaceError::io(path))
}

fn append_line(path: &Path, line: &str) -> Result<()> {
    ensure_parent(path)?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(WorkspaceError::io(path))?;
    writeln!(file, "{line}").map_err(WorkspaceError::io(path))
}
