//! Import command - push a workspace definition to the engine.

use anyhow::Result;
use clap::Args;

use flowbench_runner::{ImportOptions, Importer};

use super::{Context, field, ok, print_json, warn};

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Workspace name
    #[arg(short, long, visible_alias = "name")]
    pub workspace: String,

    /// Do not store webhook endpoints in metadata
    #[arg(long)]
    pub no_webhooks: bool,

    /// Activate the workflow after import
    #[arg(long)]
    pub activate: bool,
}

pub async fn run(args: ImportArgs, ctx: &Context) -> Result<()> {
    let ws = ctx.workspace(&args.workspace)?;
    let options = ImportOptions {
        extract_webhooks: !args.no_webhooks,
        activate: args.activate,
    };
    let outcome = Importer::new(ctx.client()?).import(&ws, options).await?;

    if ctx.json_output {
        return print_json(&outcome);
    }

    let verb = if outcome.updated { "updated" } else { "created" };
    ok(format!("Workflow {verb}: {}", outcome.workflow_id));
    field("webhooks", outcome.webhook_count);
    if args.activate {
        field("active", outcome.activated);
    }
    for check in &outcome.registrations {
        let state = if check.registration.registered {
            "registered".to_string()
        } else {
            check
                .registration
                .reason
                .clone()
                .unwrap_or_else(|| "not registered".to_string())
        };
        field(&check.method, format!("{} ({state})", check.url));
    }
    for warning in &outcome.warnings {
        warn(warning);
    }
    Ok(())
}
