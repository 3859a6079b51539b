//! Workspace commands - setup, list, validate, context, cleanup.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use console::Style;
use serde_json::json;

use flowbench_runner::Workbench;
use flowbench_workspace::{ContextCollector, DEFAULT_KEEP_LOGS};

use super::{Context, field, heading, ok, print_json};

#[derive(Args, Debug)]
pub struct SetupArgs {
    /// Workflow definition JSON to copy into the workspace
    #[arg(value_name = "JSON")]
    pub file: PathBuf,
}

/// A workspace by name (or directory path).
#[derive(Args, Debug)]
pub struct WorkspaceArg {
    /// Workspace name
    #[arg(short, long, visible_alias = "name")]
    pub workspace: String,
}

#[derive(Args, Debug)]
pub struct CleanupArgs {
    /// Workspace name
    #[arg(short, long, visible_alias = "workspace")]
    pub name: String,

    /// Number of newest log files to keep
    #[arg(long, default_value_t = DEFAULT_KEEP_LOGS)]
    pub keep: usize,
}

pub async fn setup(args: SetupArgs, ctx: &Context) -> Result<()> {
    let outcome = ctx.manager().setup(&args.file)?;
    let ws = &outcome.workspace;

    if ctx.json_output {
        return print_json(&json!({
            "workspace": ws.name(),
            "path": ws.root(),
            "created": outcome.created,
            "backup": outcome.backup,
        }));
    }

    if outcome.created {
        ok(format!("Workspace created: {}", ws.name()));
    } else {
        ok(format!("Workspace updated: {}", ws.name()));
    }
    field("path", ws.root().display());
    if let Some(backup) = &outcome.backup {
        field("backup", backup.display());
    }
    Ok(())
}

pub async fn list(ctx: &Context) -> Result<()> {
    let summaries = ctx.manager().list()?;
    if ctx.json_output {
        return print_json(&summaries);
    }

    let dim = Style::new().dim();
    heading("Workspaces");
    if summaries.is_empty() {
        println!("{}", dim.apply_to("No workspaces found"));
        return Ok(());
    }
    for s in &summaries {
        println!(
            "{:<30} {:<12} {} {}",
            s.name,
            s.workflow_id.as_deref().unwrap_or("-"),
            dim.apply_to(format!("v{}", s.version_count)),
            dim.apply_to(s.last_modified.as_deref().unwrap_or("")),
        );
    }
    Ok(())
}

pub async fn validate(args: WorkspaceArg, ctx: &Context) -> Result<()> {
    let ws = ctx.workspace(&args.workspace)?;
    let definition = flowbench_runner::validate(&ws)?;

    if ctx.json_output {
        return print_json(&json!({
            "valid": true,
            "name": definition.name(),
            "node_count": definition.node_count(),
            "has_credentials": definition.has_credentials(),
            "node_types": definition.node_types(),
        }));
    }

    ok(format!("{} is valid", definition.name()));
    field("nodes", definition.node_count());
    field("credentials", definition.has_credentials());
    if ctx.verbose {
        field("node types", definition.node_types().join(", "));
    }
    Ok(())
}

pub async fn context(args: WorkspaceArg, ctx: &Context) -> Result<()> {
    let ws = ctx.workspace(&args.workspace)?;
    let workbench = Workbench::new(ctx.client()?, ctx.config.clone(), &ctx.base_dir);
    let collected = ContextCollector::new(&ws, workbench.collector_options())
        .collect_all()
        .await?;

    if ctx.json_output {
        return print_json(&collected.context);
    }

    let c = &collected.context;
    ok("Debug context collected");
    field("engine", format!("{} (running: {})", c.engine.version, c.engine.is_running));
    field("logs", c.workspace.file_counts.logs);
    field("recent errors", c.errors.len());
    field("json", collected.json_path.display());
    field("summary", collected.summary_path.display());
    Ok(())
}

pub async fn cleanup(args: CleanupArgs, ctx: &Context) -> Result<()> {
    let removed = ctx.manager().cleanup_logs(&args.name, args.keep)?;

    if ctx.json_output {
        return print_json(&json!({ "removed": removed }));
    }

    ok(format!("Removed {} log file(s), kept the newest {}", removed.len(), args.keep));
    if ctx.verbose {
        let dim = Style::new().dim();
        for path in &removed {
            println!("  {}", dim.apply_to(path.display()));
        }
    }
    Ok(())
}
