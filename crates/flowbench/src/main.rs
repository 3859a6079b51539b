//! flowbench - workbench for engine workflows
//!
//! Main entry point for the flowbench CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{activation, config, execute, import, webhook, workspace};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// flowbench - import, run and debug workflows on a remote engine
#[derive(Parser)]
#[command(name = "flowbench")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Config file (skips discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Workbench base directory; workspaces live in <base-dir>/workflows
    #[arg(long, global = true, default_value = ".")]
    pub base_dir: PathBuf,

    /// Engine URL (overrides config and N8N_API_URL)
    #[arg(long, global = true)]
    pub server: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create or refresh a workspace from a workflow JSON file
    Setup(workspace::SetupArgs),

    /// List workspaces
    List,

    /// Validate a workspace's workflow definition
    Validate(workspace::WorkspaceArg),

    /// Create or update the workflow on the engine
    Import(import::ImportArgs),

    /// Activate workflows
    Activate(activation::StateArgs),

    /// Deactivate workflows
    Deactivate(activation::StateArgs),

    /// Show a workflow's state on the engine
    Status(activation::StatusArgs),

    /// List workflows on the engine
    Workflows,

    /// Execute a workflow (webhook, API or CLI)
    Execute(execute::ExecuteArgs),

    /// Webhook endpoint tools
    Webhook(webhook::WebhookArgs),

    /// Collect debug context for a workspace
    Context(workspace::WorkspaceArg),

    /// Delete old log files
    Cleanup(workspace::CleanupArgs),

    /// Import, execute and collect context in one pass
    Run(execute::RunArgs),

    /// Set up a workspace and run it until it succeeds
    Debug(execute::DebugArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Console (human-readable, stderr) + rotating JSON file
    let filter = if cli.verbose {
        "flowbench=debug,flowbench_runner=debug,flowbench_client=debug,flowbench_workspace=debug,flowbench_config=debug,warn"
    } else {
        "flowbench=warn,flowbench_runner=warn,flowbench_client=warn,flowbench_workspace=warn,warn"
    };

    let log_dir = flowbench_config::user_config_dir()
        .map(|d| d.join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"));
    let file_appender = tracing_appender::rolling::daily(&log_dir, "flowbench.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "flowbench=trace,flowbench_runner=trace,flowbench_client=trace,flowbench_workspace=trace,flowbench_config=trace,info",
                )),
        )
        .init();

    let ctx = commands::Context::load(
        cli.config,
        cli.base_dir,
        cli.server,
        cli.json,
        cli.verbose,
    )?;

    match cli.command {
        Commands::Setup(args) => workspace::setup(args, &ctx).await,
        Commands::List => workspace::list(&ctx).await,
        Commands::Validate(args) => workspace::validate(args, &ctx).await,
        Commands::Import(args) => import::run(args, &ctx).await,
        Commands::Activate(args) => activation::set_state(args, true, &ctx).await,
        Commands::Deactivate(args) => activation::set_state(args, false, &ctx).await,
        Commands::Status(args) => activation::status(args, &ctx).await,
        Commands::Workflows => activation::workflows(&ctx).await,
        Commands::Execute(args) => execute::execute(args, &ctx).await,
        Commands::Webhook(args) => webhook::run(args, &ctx).await,
        Commands::Context(args) => workspace::context(args, &ctx).await,
        Commands::Cleanup(args) => workspace::cleanup(args, &ctx).await,
        Commands::Run(args) => execute::run(args, &ctx).await,
        Commands::Debug(args) => execute::debug(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}
