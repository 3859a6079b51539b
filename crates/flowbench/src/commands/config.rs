//! Config command - configuration management.

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use console::Style;
use serde_json::json;

use flowbench_config::{FlowbenchConfig, save_config, user_config_path};

use super::{Context, field, heading, ok, print_json};

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the resolved configuration and where it came from
    Show,

    /// Write a config file with defaults
    Init {
        /// Create <base-dir>/config.json instead of the user config
        #[arg(long)]
        local: bool,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show the user configuration file path
    Path,
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Init { local, force } => cmd_init(ctx, local, force),
        ConfigCommand::Path => cmd_path(ctx),
    }
}

fn masked(config: &FlowbenchConfig) -> FlowbenchConfig {
    let mut shown = config.clone();
    if shown.n8n_api.has_api_key() {
        shown.n8n_api.api_key = "***".to_string();
    }
    shown
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let loaded = &ctx.loaded;
    let config = masked(&ctx.config);

    if ctx.json_output {
        return print_json(&json!({
            "config": config,
            "loaded_from": loaded.loaded_from(),
            "env_overrides": loaded.env_overrides,
            "warnings": loaded.warnings,
        }));
    }

    let dim = Style::new().dim();
    heading("Configuration");
    match loaded.loaded_from() {
        Some(path) => field("loaded from", path.display()),
        None => field("loaded from", dim.apply_to("defaults")),
    }
    if !loaded.env_overrides.is_empty() {
        field("env overrides", loaded.env_overrides.join(", "));
    }
    if ctx.verbose {
        for source in &loaded.sources {
            let mark = if source.loaded { "●" } else { "○" };
            println!("  {} {}", mark, dim.apply_to(source.path.display()));
        }
    }
    println!();
    field("base_url", config.n8n_api.base_url());
    field(
        "api_key",
        if config.n8n_api.has_api_key() { "set" } else { "not set" },
    );
    field("log_level", &config.debug.log_level);
    field("capture_env", config.debug.capture_env);
    field("executable", &config.cli.executable);
    field("read_timeout", format!("{}s", config.cli.read_timeout_secs));
    field(
        "polling",
        format!("{}ms x {}", config.polling.interval_ms, config.polling.max_polls),
    );
    Ok(())
}

fn cmd_init(ctx: &Context, local: bool, force: bool) -> Result<()> {
    let path = if local {
        ctx.base_dir.join("config.json")
    } else {
        match user_config_path() {
            Some(path) => path,
            None => bail!("no user config directory on this platform; use --local"),
        }
    };
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }

    save_config(&FlowbenchConfig::default(), &path)?;
    if ctx.json_output {
        return print_json(&json!({ "path": path }));
    }
    ok(format!("Config written to {}", path.display()));
    Ok(())
}

fn cmd_path(ctx: &Context) -> Result<()> {
    let path: Option<PathBuf> = user_config_path();
    if ctx.json_output {
        return print_json(&json!({ "path": path }));
    }
    match path {
        Some(path) => println!("{}", path.display()),
        None => bail!("no user config directory on this platform"),
    }
    Ok(())
}
