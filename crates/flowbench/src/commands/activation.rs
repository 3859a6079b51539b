//! Activation commands - activate, deactivate, status, workflows.

use anyhow::{Result, bail};
use clap::{ArgGroup, Args};
use console::Style;

use flowbench_runner::{ActivationController, ActivationOutcome, BatchReport, RunnerError};

use super::{Context, fail, field, heading, ok, print_json};

/// Which workflows to change.
#[derive(Args, Debug)]
#[command(group(
    ArgGroup::new("target")
        .required(true)
        .args(["workflow_id", "workspace", "batch", "all"])
))]
pub struct StateArgs {
    /// Workflow id on the engine
    #[arg(long)]
    pub workflow_id: Option<String>,

    /// Use the workflow id stored in this workspace
    #[arg(short, long)]
    pub workspace: Option<String>,

    /// Several workflow ids
    #[arg(long, num_args = 1..)]
    pub batch: Vec<String>,

    /// Every workflow on the engine
    #[arg(long)]
    pub all: bool,

    /// Confirm --all
    #[arg(long)]
    pub yes: bool,
}

#[derive(Args, Debug)]
#[command(group(
    ArgGroup::new("target")
        .required(true)
        .args(["workflow_id", "workspace"])
))]
pub struct StatusArgs {
    /// Workflow id on the engine
    #[arg(long)]
    pub workflow_id: Option<String>,

    /// Use the workflow id stored in this workspace
    #[arg(short, long)]
    pub workspace: Option<String>,
}

pub async fn set_state(args: StateArgs, desired: bool, ctx: &Context) -> Result<()> {
    let controller = ActivationController::new(ctx.client()?);

    let ids = if args.all {
        if !args.yes {
            bail!("--all changes every workflow on the engine; pass --yes to confirm");
        }
        controller
            .list()
            .await?
            .into_iter()
            .map(|w| w.id)
            .collect()
    } else if !args.batch.is_empty() {
        args.batch
    } else {
        let outcome = match (&args.workflow_id, &args.workspace) {
            (Some(id), _) => controller.set_active(id, desired).await?,
            (None, Some(name)) => {
                let ws = ctx.workspace(name)?;
                controller.set_active_from_workspace(&ws, desired).await?
            }
            (None, None) => bail!("no workflow selected"),
        };
        return print_outcome(&outcome, ctx);
    };

    let report = controller.batch(&ids, desired).await;
    print_report(&report, desired, ctx)?;
    if report.failed > 0 {
        bail!("{} of {} workflow(s) failed", report.failed, report.results.len());
    }
    Ok(())
}

fn print_outcome(outcome: &ActivationOutcome, ctx: &Context) -> Result<()> {
    if ctx.json_output {
        return print_json(outcome);
    }
    let state = if outcome.active { "active" } else { "inactive" };
    if outcome.changed {
        ok(format!("{} ({}) is now {state}", outcome.name, outcome.id));
    } else {
        ok(format!("{} ({}) was already {state}", outcome.name, outcome.id));
    }
    Ok(())
}

fn print_report(report: &BatchReport, desired: bool, ctx: &Context) -> Result<()> {
    if ctx.json_output {
        return print_json(report);
    }
    let action = if desired { "Activation" } else { "Deactivation" };
    heading(&format!("Batch {action}"));
    for item in &report.results {
        match (&item.outcome, &item.error) {
            (Some(o), _) if o.changed => ok(format!("{} changed", item.id)),
            (Some(_), _) => ok(format!("{} unchanged", item.id)),
            (None, Some(e)) => fail(format!("{}: {e}", item.id)),
            (None, None) => fail(&item.id),
        }
    }
    println!();
    field("changed", report.changed);
    field("unchanged", report.unchanged);
    field("failed", report.failed);
    Ok(())
}

pub async fn status(args: StatusArgs, ctx: &Context) -> Result<()> {
    let id = match (args.workflow_id, args.workspace) {
        (Some(id), _) => id,
        (None, Some(name)) => {
            let ws = ctx.workspace(&name)?;
            ws.load_metadata()?
                .workflow_id
                .ok_or(RunnerError::MissingWorkflowId(name))?
        }
        (None, None) => bail!("no workflow selected"),
    };

    let status = ActivationController::new(ctx.client()?).status(&id).await?;
    if ctx.json_output {
        return print_json(&status);
    }

    let state = if status.active {
        Style::new().green().apply_to("active")
    } else {
        Style::new().dim().apply_to("inactive")
    };
    heading(&status.name);
    field("id", &status.id);
    field("state", state);
    field("nodes", status.node_count);
    if let Some(updated) = &status.updated_at {
        field("updated", updated);
    }
    Ok(())
}

pub async fn workflows(ctx: &Context) -> Result<()> {
    let list = ActivationController::new(ctx.client()?).list().await?;
    if ctx.json_output {
        return print_json(&list);
    }

    let dim = Style::new().dim();
    heading("Workflows");
    if list.is_empty() {
        println!("{}", dim.apply_to("No workflows found"));
    }
    for wf in &list {
        let marker = if wf.active {
            Style::new().green().apply_to("●")
        } else {
            dim.apply_to("○")
        };
        println!("{marker} {:<12} {}", wf.id, wf.name);
    }
    Ok(())
}
