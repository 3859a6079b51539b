//! Execution commands - execute, run, debug.

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Args;
use console::Style;
use serde_json::json;

use flowbench_runner::{
    ExecuteOptions, ExecutionOutcome, Orchestrator, RunReport, RunnerError, Workbench,
};
use flowbench_types::{ExecutionMethod, ExecutionResult, ExecutionStatus};

use super::{Context, fail, field, heading, ok, print_json, warn};

#[derive(Args, Debug)]
pub struct ExecuteArgs {
    /// Workspace that records the run
    #[arg(short, long, visible_alias = "name")]
    pub workspace: String,

    /// Workflow id (defaults to the id stored by import)
    #[arg(long)]
    pub workflow_id: Option<String>,

    /// auto, api, cli or webhook
    #[arg(short, long, default_value = "auto")]
    pub method: ExecutionMethod,

    /// Log per-node output and run the engine CLI at debug level
    #[arg(short, long)]
    pub debug: bool,

    /// Activate the workflow first if it is inactive
    #[arg(long)]
    pub auto_activate: bool,

    /// Use test webhook URLs
    #[arg(long)]
    pub test_mode: bool,

    /// Trigger this webhook URL instead of the stored endpoints
    #[arg(long)]
    pub webhook_url: Option<String>,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Workspace name
    #[arg(short, long, visible_alias = "workspace")]
    pub name: String,

    #[arg(short, long)]
    pub debug: bool,
}

#[derive(Args, Debug)]
pub struct DebugArgs {
    /// Workflow definition JSON
    #[arg(value_name = "JSON")]
    pub file: PathBuf,

    /// Give up after this many runs
    #[arg(long, default_value_t = 3)]
    pub max_iterations: usize,
}

pub async fn execute(args: ExecuteArgs, ctx: &Context) -> Result<()> {
    let ws = ctx.workspace(&args.workspace)?;
    let workflow_id = match args.workflow_id {
        Some(id) => id,
        None => ws
            .load_metadata()?
            .workflow_id
            .ok_or_else(|| RunnerError::MissingWorkflowId(ws.name()))?,
    };

    let options = ExecuteOptions {
        method: args.method,
        debug: args.debug,
        auto_activate: args.auto_activate,
        test_mode: args.test_mode,
        webhook_url: args.webhook_url,
    };
    let orchestrator = Orchestrator::new(ctx.client()?, ctx.config.clone());
    let outcome = orchestrator.execute(&ws, &workflow_id, &options).await?;

    if ctx.json_output {
        print_json(&outcome.result)?;
    } else {
        print_execution(&outcome, ctx);
    }
    require_success(&outcome.result)
}

pub async fn run(args: RunArgs, ctx: &Context) -> Result<()> {
    let workbench = Workbench::new(ctx.client()?, ctx.config.clone(), &ctx.base_dir);
    let report = workbench.run(&args.name, args.debug).await?;

    if ctx.json_output {
        print_json(&run_json(&report))?;
    } else {
        print_run(&report, ctx);
    }
    if !report.succeeded() {
        bail!("run did not succeed");
    }
    Ok(())
}

pub async fn debug(args: DebugArgs, ctx: &Context) -> Result<()> {
    let workbench = Workbench::new(ctx.client()?, ctx.config.clone(), &ctx.base_dir);
    let report = workbench
        .debug_cycle(&args.file, args.max_iterations)
        .await?;

    if ctx.json_output {
        print_json(&json!({
            "workspace": report.workspace.name(),
            "iterations": report.iterations,
            "succeeded": report.succeeded,
            "removed_logs": report.removed_logs,
            "last_run": report.last_run.as_ref().map(run_json),
        }))?;
    } else {
        heading(&format!("Debug cycle: {}", report.workspace.name()));
        if let Some(last) = &report.last_run {
            print_run(last, ctx);
        }
        println!();
        field("iterations", report.iterations);
        field("logs removed", report.removed_logs.len());
        if report.succeeded {
            ok("Workflow ran successfully");
        } else {
            fail(format!("No successful run after {} iteration(s)", report.iterations));
        }
    }
    if !report.succeeded {
        bail!("debug cycle ended without a successful run");
    }
    Ok(())
}

fn require_success(result: &ExecutionResult) -> Result<()> {
    if !result.is_success() {
        bail!("execution finished with status {}", result.status);
    }
    Ok(())
}

fn run_json(report: &RunReport) -> serde_json::Value {
    json!({
        "import": report.import,
        "execution": report.execution.as_ref().map(|e| &e.result),
        "execution_error": report.execution_error,
        "context": report.context.as_ref().map(|c| &c.json_path),
        "succeeded": report.succeeded(),
    })
}

fn print_run(report: &RunReport, ctx: &Context) {
    ok(format!("Imported workflow {}", report.import.workflow_id));
    for warning in &report.import.warnings {
        warn(warning);
    }
    match (&report.execution, &report.execution_error) {
        (Some(outcome), _) => print_execution(outcome, ctx),
        (None, Some(e)) => fail(e),
        (None, None) => {}
    }
    if let Some(context) = &report.context {
        field("context", context.summary_path.display());
    }
}

fn print_execution(outcome: &ExecutionOutcome, ctx: &Context) {
    let result = &outcome.result;
    let status = match result.status {
        ExecutionStatus::Success => Style::new().green().apply_to(result.status.as_str()),
        ExecutionStatus::Error => Style::new().red().apply_to(result.status.as_str()),
        _ => Style::new().yellow().apply_to(result.status.as_str()),
    };

    heading("Execution");
    field("status", status);
    field("method", result.method);
    if let Some(id) = &result.execution_id {
        field("execution id", id);
    }
    field("duration", format!("{:.2}s", result.duration));
    if let Some(url) = &result.webhook_url {
        field("webhook", url);
    }
    if let Some(code) = result.return_code {
        field("exit code", code);
    }
    if let Some(error) = &result.error {
        field("error", error);
    }
    field("log", outcome.logs.execution_log.display());
    if ctx.verbose {
        field("errors", outcome.logs.error_log.display());
        field("context", outcome.context_file.display());
    }
}
