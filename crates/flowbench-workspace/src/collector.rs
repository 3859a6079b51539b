//! Debug context collection.
//!
//! Gathers a snapshot of the environment, the host, the engine, the workspace
//! and its most recent logs, and writes it to `context/debug_<ts>.json` with a
//! human-readable `context/summary_<ts>.txt` beside it.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Local};
use flowbench_types::{file_timestamp, iso_now};
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{Result, WorkspaceError};
use crate::metadata::LastExecution;
use crate::workspace::{Workspace, write_json};

/// Placeholder written instead of sensitive environment values.
pub const MASKED: &str = "***MASKED***";

const RELEVANT_VARS: &[&str] = &[
    "N8N_HOST",
    "N8N_PORT",
    "N8N_PROTOCOL",
    "N8N_API_KEY",
    "N8N_BASIC_AUTH_ACTIVE",
    "N8N_LOG_LEVEL",
    "N8N_LOG_OUTPUT",
    "N8N_METRICS",
    "NODE_ENV",
    "PATH",
    "HOME",
    "USER",
];

const SENSITIVE_MARKERS: &[&str] = &["KEY", "PASSWORD", "SECRET"];

const VERSION_TIMEOUT: Duration = Duration::from_secs(5);
const PORT_TIMEOUT: Duration = Duration::from_secs(1);
const RECENT_ERROR_FILES: usize = 3;
const ERROR_EXCERPT_CHARS: usize = 1000;
const TAIL_LINES: usize = 10;

/// What the collector needs to know about the engine.
#[derive(Debug, Clone)]
pub struct CollectorOptions {
    pub executable: String,
    pub base_url: String,
    pub has_api_key: bool,
    pub engine_host: String,
    pub engine_port: u16,
}

impl Default for CollectorOptions {
    fn default() -> Self {
        Self {
            executable: "n8n".to_string(),
            base_url: "http://localhost:5678".to_string(),
            has_api_key: false,
            engine_host: "localhost".to_string(),
            engine_port: 5678,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DebugContext {
    pub timestamp: String,
    pub environment: BTreeMap<String, String>,
    pub system: SystemInfo,
    pub engine: EngineInfo,
    pub workspace: WorkspaceInfo,
    pub logs: LogAnalysis,
    pub errors: Vec<ErrorExcerpt>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemInfo {
    pub os: String,
    pub arch: String,
    pub family: String,
    pub hostname: Option<String>,
    pub cpu_count: Option<usize>,
    /// From `/proc/meminfo`; absent on other platforms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemoryInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemoryInfo {
    pub total_mb: u64,
    pub available_mb: u64,
    pub percent_used: u64,
}

impl MemoryInfo {
    /// Parse the `MemTotal` and `MemAvailable` lines of `/proc/meminfo`.
    fn parse(meminfo: &str) -> Option<Self> {
        let kib = |key: &str| {
            meminfo.lines().find_map(|line| {
                let rest = line.strip_prefix(key)?.strip_prefix(':')?;
                rest.split_whitespace().next()?.parse::<u64>().ok()
            })
        };
        let total = kib("MemTotal")?;
        let available = kib("MemAvailable")?;
        if total == 0 {
            return None;
        }
        Some(Self {
            total_mb: total / 1024,
            available_mb: available / 1024,
            percent_used: total.saturating_sub(available) * 100 / total,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EngineInfo {
    pub version: String,
    pub is_running: bool,
    pub base_url: String,
    pub has_api_key: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceInfo {
    pub path: PathBuf,
    pub workflow_exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow: Option<WorkflowInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MetadataInfo>,
    pub file_counts: FileCounts,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowInfo {
    pub name: String,
    pub node_count: usize,
    pub has_credentials: bool,
    pub node_types: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetadataInfo {
    pub workflow_id: Option<String>,
    pub last_execution: Option<LastExecution>,
    pub version_count: usize,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct FileCounts {
    pub logs: usize,
    pub context: usize,
    pub versions: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LogAnalysis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent_log: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patterns: Option<LogPatterns>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub last_10_lines: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_error: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LogPatterns {
    pub errors: usize,
    pub warnings: usize,
    pub success: usize,
    pub failed: usize,
    pub node_executions: usize,
    pub api_calls: usize,
}

impl LogPatterns {
    pub fn count(content: &str) -> Self {
        let both = |upper: &str, lower: &str| {
            content.matches(upper).count() + content.matches(lower).count()
        };
        Self {
            errors: both("ERROR", "error"),
            warnings: both("WARNING", "warning"),
            success: both("SUCCESS", "success"),
            failed: both("FAILED", "failed"),
            node_executions: content.matches("Node:").count(),
            api_calls: content.matches("API").count(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorExcerpt {
    pub file: String,
    pub timestamp: String,
    pub content: String,
}

/// Files written by [`ContextCollector::collect_all`].
#[derive(Debug, Clone)]
pub struct CollectedContext {
    pub context: DebugContext,
    pub json_path: PathBuf,
    pub summary_path: PathBuf,
}

pub struct ContextCollector<'a> {
    workspace: &'a Workspace,
    options: CollectorOptions,
    timestamp: String,
}

impl<'a> ContextCollector<'a> {
    pub fn new(workspace: &'a Workspace, options: CollectorOptions) -> Self {
        Self {
            workspace,
            options,
            timestamp: file_timestamp(),
        }
    }

    /// Collect everything and write the JSON and summary files.
    pub async fn collect_all(&self) -> Result<CollectedContext> {
        let context = DebugContext {
            timestamp: iso_now(),
            environment: collect_environment(std::env::vars()),
            system: collect_system(),
            engine: self.collect_engine().await,
            workspace: self.collect_workspace(),
            logs: analyze_recent_log(&self.workspace.logs_dir()),
            errors: collect_recent_errors(&self.workspace.logs_dir()),
        };

        let context_dir = self.workspace.context_dir();
        let json_path = context_dir.join(format!("debug_{}.json", self.timestamp));
        write_json(&json_path, &context)?;

        let summary_path = context_dir.join(format!("summary_{}.txt", self.timestamp));
        let summary = render_summary(&context, &self.workspace.name(), &self.timestamp);
        fs::write(&summary_path, summary).map_err(WorkspaceError::io(&summary_path))?;

        info!(context = %json_path.display(), "debug context saved");
        Ok(CollectedContext {
            context,
            json_path,
            summary_path,
        })
    }

    async fn collect_engine(&self) -> EngineInfo {
        EngineInfo {
            version: engine_version(&self.options.executable).await,
            is_running: port_open(&self.options.engine_host, self.options.engine_port).await,
            base_url: self.options.base_url.clone(),
            has_api_key: self.options.has_api_key,
        }
    }

    fn collect_workspace(&self) -> WorkspaceInfo {
        let ws = self.workspace;
        let workflow_exists = ws.workflow_path().is_file();

        let (workflow, workflow_error) = if workflow_exists {
            match ws.load_definition() {
                Ok(def) => (
                    Some(WorkflowInfo {
                        name: def.name().to_string(),
                        node_count: def.node_count(),
                        has_credentials: def.has_credentials(),
                        node_types: def.node_types(),
                    }),
                    None,
                ),
                Err(e) => (None, Some(e.to_string())),
            }
        } else {
            (None, None)
        };

        let metadata = if ws.metadata_path().exists() {
            ws.load_metadata().ok().map(|m| MetadataInfo {
                workflow_id: m.workflow_id,
                last_execution: m.last_execution,
                version_count: m.version_count.unwrap_or(0),
            })
        } else {
            None
        };

        WorkspaceInfo {
            path: ws.root().to_path_buf(),
            workflow_exists,
            workflow,
            workflow_error,
            metadata,
            file_counts: FileCounts {
                logs: count_with_extension(&ws.logs_dir(), "log"),
                context: count_with_extension(&ws.context_dir(), "json"),
                versions: count_with_extension(&ws.versions_dir(), "json"),
            },
        }
    }
}

/// Relevant variables plus every `N8N_*`, with sensitive values masked.
pub fn collect_environment<I>(vars: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (String, String)>,
{
    vars.into_iter()
        .filter(|(k, v)| !v.is_empty() && (RELEVANT_VARS.contains(&k.as_str()) || k.starts_with("N8N_")))
        .map(|(k, v)| {
            let v = if is_sensitive(&k) { MASKED.to_string() } else { v };
            (k, v)
        })
        .collect()
}

fn is_sensitive(name: &str) -> bool {
    SENSITIVE_MARKERS.iter().any(|m| name.contains(m))
}

fn collect_system() -> SystemInfo {
    SystemInfo {
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
        family: std::env::consts::FAMILY.to_string(),
        hostname: hostname(),
        cpu_count: std::thread::available_parallelism().ok().map(|n| n.get()),
        memory: fs::read_to_string("/proc/meminfo")
            .ok()
            .and_then(|text| MemoryInfo::parse(&text)),
    }
}

fn hostname() -> Option<String> {
    ["HOSTNAME", "COMPUTERNAME"]
        .iter()
        .find_map(|k| std::env::var(k).ok().filter(|v| !v.is_empty()))
        .or_else(|| {
            fs::read_to_string("/etc/hostname")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

/// `<exe> --version`, or `unknown` on any failure.
pub async fn engine_version(executable: &str) -> String {
    let run = Command::new(executable)
        .arg("--version")
        .kill_on_drop(true)
        .output();
    match tokio::time::timeout(VERSION_TIMEOUT, run).await {
        Ok(Ok(output)) if output.status.success() => {
            String::from_utf8_lossy(&output.stdout).trim().to_string()
        }
        Ok(Ok(output)) => {
            debug!(code = ?output.status.code(), "engine --version failed");
            "unknown".to_string()
        }
        Ok(Err(e)) => {
            debug!(error = %e, executable, "engine executable not runnable");
            "unknown".to_string()
        }
        Err(_) => "unknown".to_string(),
    }
}

/// Whether `host:port` accepts a TCP connection within a second.
pub async fn port_open(host: &str, port: u16) -> bool {
    matches!(
        tokio::time::timeout(PORT_TIMEOUT, TcpStream::connect((host, port))).await,
        Ok(Ok(_))
    )
}

/// Files in `dir` starting with `prefix`, newest first.
fn newest_files(dir: &Path, prefix: &str) -> Vec<(SystemTime, PathBuf)> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<_> = entries
        .filter_map(|e| e.ok())
        .filter(|e| {
            let name = e.file_name();
            let name = name.to_string_lossy();
            name.starts_with(prefix) && name.ends_with(".log")
        })
        .filter_map(|e| {
            let modified = e.metadata().ok()?.modified().ok()?;
            Some((modified, e.path()))
        })
        .collect();
    files.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));
    files
}

fn iso_time(t: SystemTime) -> String {
    DateTime::<Local>::from(t).to_rfc3339()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Pattern counts and tail of the newest `execution_*.log`.
pub fn analyze_recent_log(logs_dir: &Path) -> LogAnalysis {
    if !logs_dir.is_dir() {
        return LogAnalysis {
            message: Some("No logs directory found".into()),
            ..Default::default()
        };
    }
    let Some((modified, path)) = newest_files(logs_dir, "execution_").into_iter().next() else {
        return LogAnalysis {
            message: Some("No execution logs found".into()),
            ..Default::default()
        };
    };

    let mut analysis = LogAnalysis {
        recent_log: Some(file_name(&path)),
        size_bytes: fs::metadata(&path).ok().map(|m| m.len()),
        modified: Some(iso_time(modified)),
        ..Default::default()
    };
    match fs::read_to_string(&path) {
        Ok(content) => {
            analysis.patterns = Some(LogPatterns::count(&content));
            let lines: Vec<&str> = content.lines().collect();
            let start = lines.len().saturating_sub(TAIL_LINES);
            analysis.last_10_lines = lines[start..].iter().map(|l| l.to_string()).collect();
        }
        Err(e) => analysis.read_error = Some(e.to_string()),
    }
    analysis
}

/// First characters of the newest non-empty `errors_*.log` files.
pub fn collect_recent_errors(logs_dir: &Path) -> Vec<ErrorExcerpt> {
    newest_files(logs_dir, "errors_")
        .into_iter()
        .take(RECENT_ERROR_FILES)
        .filter_map(|(modified, path)| {
            let content = fs::read_to_string(&path).ok()?;
            let content = content.trim();
            if content.is_empty() {
                return None;
            }
            Some(ErrorExcerpt {
                file: file_name(&path),
                timestamp: iso_time(modified),
                content: content.chars().take(ERROR_EXCERPT_CHARS).collect(),
            })
        })
        .collect()
}

fn count_with_extension(dir: &Path, ext: &str) -> usize {
    fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter(|e| e.path().extension().is_some_and(|x| x == ext))
                .count()
        })
        .unwrap_or(0)
}

fn render_summary(ctx: &DebugContext, workspace_name: &str, timestamp: &str) -> String {
    let rule = "=".repeat(60);
    let sub = "-".repeat(40);
    let mut s = String::new();

    // Writing to a String cannot fail.
    let _ = writeln!(s, "{rule}\nWORKFLOW DEBUG CONTEXT SUMMARY\n{rule}\n");
    let _ = writeln!(s, "Generated: {}\nWorkspace: {}\n", ctx.timestamp, workspace_name);

    let _ = writeln!(s, "SYSTEM INFORMATION\n{sub}");
    let _ = writeln!(s, "Platform: {} ({})", ctx.system.os, ctx.system.arch);
    if let Some(cpus) = ctx.system.cpu_count {
        let _ = writeln!(s, "CPUs: {cpus}");
    }
    if let Some(mem) = ctx.system.memory {
        let _ = writeln!(
            s,
            "Memory: {} MB available of {} MB ({}% used)",
            mem.available_mb, mem.total_mb, mem.percent_used
        );
    }
    let _ = writeln!(s);

    let _ = writeln!(s, "ENGINE STATUS\n{sub}");
    let _ = writeln!(s, "Version: {}", ctx.engine.version);
    let _ = writeln!(s, "Running: {}", if ctx.engine.is_running { "Yes" } else { "No" });
    let _ = writeln!(s, "API URL: {}\n", ctx.engine.base_url);

    let _ = writeln!(s, "WORKFLOW INFORMATION\n{sub}");
    if let Some(wf) = &ctx.workspace.workflow {
        let _ = writeln!(s, "Name: {}", wf.name);
        let _ = writeln!(s, "Nodes: {}", wf.node_count);
        let _ = writeln!(s, "Node Types: {}", wf.node_types.join(", "));
    }
    if let Some(last) = ctx
        .workspace
        .metadata
        .as_ref()
        .and_then(|m| m.last_execution.as_ref())
    {
        let _ = writeln!(s, "\nLast Execution:");
        let _ = writeln!(s, "  Status: {}", last.status);
        let _ = writeln!(s, "  Duration: {:.2}s", last.duration);
    }
    let _ = writeln!(s);

    let _ = writeln!(s, "LOG ANALYSIS\n{sub}");
    if let Some(p) = &ctx.logs.patterns {
        let _ = writeln!(s, "Errors: {}", p.errors);
        let _ = writeln!(s, "Warnings: {}", p.warnings);
        let _ = writeln!(s, "Failures: {}", p.failed);
        let _ = writeln!(s, "Node Executions: {}", p.node_executions);
    } else if let Some(msg) = &ctx.logs.message {
        let _ = writeln!(s, "{msg}");
    }
    let _ = writeln!(s);

    if !ctx.errors.is_empty() {
        let _ = writeln!(s, "RECENT ERRORS\n{sub}");
        for e in ctx.errors.iter().take(2) {
            let excerpt: String = e.content.chars().take(200).collect();
            let _ = writeln!(s, "From: {}\nTime: {}\nError: {}...\n", e.file, e.timestamp, excerpt);
        }
    }

    let counts = ctx.workspace.file_counts;
    let _ = writeln!(s, "FILE STATISTICS\n{sub}");
    let _ = writeln!(s, "Log Files: {}", counts.logs);
    let _ = writeln!(s, "Context Files: {}", counts.context);
    let _ = writeln!(s, "Version Backups: {}", counts.versions);
    let _ = writeln!(s, "\n{rule}\nFull context saved in: debug_{timestamp}.json\n{rule}");
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_environment_masks_sensitive_values() {
        let vars = collect_environment(env(&[
            ("N8N_API_KEY", "secret"),
            ("N8N_ENCRYPTION_SECRET", "s"),
            ("N8N_PORT", "5678"),
            ("HOME", "/home/op"),
            ("UNRELATED", "x"),
            ("NODE_ENV", ""),
        ]));
        assert_eq!(vars["N8N_API_KEY"], MASKED);
        assert_eq!(vars["N8N_ENCRYPTION_SECRET"], MASKED);
        assert_eq!(vars["N8N_PORT"], "5678");
        assert_eq!(vars["HOME"], "/home/op");
        assert!(!vars.contains_key("UNRELATED"));
        assert!(!vars.contains_key("NODE_ENV"));
    }

    #[test]
    fn test_meminfo_parse() {
        let text = "MemTotal:       16384000 kB\nMemFree:         1024000 kB\nMemAvailable:    4096000 kB\n";
        let mem = MemoryInfo::parse(text).unwrap();
        assert_eq!(mem.total_mb, 16000);
        assert_eq!(mem.available_mb, 4000);
        assert_eq!(mem.percent_used, 75);

        assert_eq!(MemoryInfo::parse("MemTotal: 100 kB\n"), None);
    }

    #[test]
    fn test_log_patterns() {
        let p = LogPatterns::count("ERROR one\nerror two\nNode: A\nNode: B\nAPI call\nsuccess");
        assert_eq!(p.errors, 2);
        assert_eq!(p.node_executions, 2);
        assert_eq!(p.api_calls, 1);
        assert_eq!(p.success, 1);
    }

    #[test]
    fn test_analyze_without_logs() {
        let dir = TempDir::new().unwrap();
        let analysis = analyze_recent_log(&dir.path().join("logs"));
        assert_eq!(analysis.message.as_deref(), Some("No logs directory found"));

        fs::create_dir_all(dir.path().join("logs")).unwrap();
        let analysis = analyze_recent_log(&dir.path().join("logs"));
        assert_eq!(analysis.message.as_deref(), Some("No execution logs found"));
    }

    #[test]
    fn test_analyze_tail() {
        let dir = TempDir::new().unwrap();
        let content: String = (1..=15).map(|i| format!("line {i}\n")).collect();
        fs::write(dir.path().join("execution_20240101_000000.log"), content).unwrap();

        let analysis = analyze_recent_log(dir.path());
        assert_eq!(analysis.last_10_lines.len(), 10);
        assert_eq!(analysis.last_10_lines[0], "line 6");
        assert_eq!(analysis.last_10_lines[9], "line 15");
    }

    #[test]
    fn test_recent_errors_skip_empty_and_truncate() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("errors_1.log"), "x".repeat(1500)).unwrap();
        fs::write(dir.path().join("errors_2.log"), "   ").unwrap();

        let errors = collect_recent_errors(dir.path());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].file, "errors_1.log");
        assert_eq!(errors[0].content.len(), 1000);
    }

    #[tokio::test]
    async fn test_missing_executable_reports_unknown() {
        assert_eq!(engine_version("/nonexistent/engine-binary").await, "unknown");
    }

    #[tokio::test]
    async fn test_collect_all_writes_files() {
        let dir = TempDir::new().unwrap();
        let ws = Workspace::create(dir.path().join("wf")).unwrap();
        fs::write(
            ws.workflow_path(),
            r#"{ "name": "Demo", "nodes": [{ "name": "A", "type": "x.manualTrigger", "position": [0,0] }], "connections": {} }"#,
        )
        .unwrap();
        ws.execution_logs("20240101_000000").log_error("boom").unwrap();

        let options = CollectorOptions {
            executable: "/nonexistent/engine-binary".into(),
            engine_port: 1,
            ..Default::default()
        };
        let collected = ContextCollector::new(&ws, options).collect_all().await.unwrap();

        assert!(collected.json_path.is_file());
        let summary = fs::read_to_string(&collected.summary_path).unwrap();
        assert!(summary.contains("Name: Demo"));
        assert!(summary.contains("RECENT ERRORS"));
        assert_eq!(collected.context.engine.version, "unknown");
        assert!(!collected.context.engine.is_running);
        assert_eq!(collected.context.workspace.file_counts.logs, 1);
    }
}
