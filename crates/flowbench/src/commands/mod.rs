//! CLI command handlers.

pub mod activation;
pub mod config;
pub mod execute;
pub mod import;
pub mod webhook;
pub mod workspace;

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use console::Style;
use serde::Serialize;

use flowbench_client::EngineClient;
use flowbench_config::{ConfigOptions, FlowbenchConfig, LoadedConfig};
use flowbench_workspace::{Workspace, WorkspaceManager};

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Resolved configuration, with `--server` applied.
    pub config: FlowbenchConfig,
    /// Discovery report for `config show`.
    pub loaded: LoadedConfig,
    pub base_dir: PathBuf,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    pub fn load(
        explicit: Option<PathBuf>,
        base_dir: PathBuf,
        server: Option<String>,
        json_output: bool,
        verbose: bool,
    ) -> Result<Self> {
        let options = ConfigOptions {
            explicit,
            base_dir: Some(base_dir.clone()),
            ..ConfigOptions::default()
        };
        let loaded = flowbench_config::load_config(&options)?;
        for warning in &loaded.warnings {
            tracing::warn!("{warning}");
        }

        let mut config = loaded.config.clone();
        if let Some(url) = server {
            config.n8n_api.base_url = url;
        }

        Ok(Self {
            config,
            loaded,
            base_dir,
            json_output,
            verbose,
        })
    }

    pub fn client(&self) -> Result<EngineClient> {
        let mut builder = EngineClient::builder().base_url(self.config.n8n_api.base_url());
        if self.config.n8n_api.has_api_key() {
            builder = builder.api_key(&self.config.n8n_api.api_key);
        }
        builder.build().context("failed to build engine client")
    }

    pub fn manager(&self) -> WorkspaceManager {
        WorkspaceManager::new(&self.base_dir)
    }

    /// Open a workspace by name under `<base>/workflows/`, or by path.
    pub fn workspace(&self, name: &str) -> Result<Workspace> {
        let manager = self.manager();
        match manager.get(name) {
            Ok(ws) => Ok(ws),
            Err(e) => {
                let path = PathBuf::from(name);
                if path.is_dir() {
                    Ok(Workspace::open(path)?)
                } else {
                    Err(e.into())
                }
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Output helpers
// ─────────────────────────────────────────────────────────────────────────────

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn heading(title: &str) {
    let dim = Style::new().dim();
    println!("{}", console::style(title).bold());
    println!("{}", dim.apply_to("─".repeat(50)));
}

pub fn ok(message: impl std::fmt::Display) {
    println!("{} {}", Style::new().green().apply_to("✓"), message);
}

pub fn fail(message: impl std::fmt::Display) {
    eprintln!("{} {}", Style::new().red().apply_to("✗"), message);
}

pub fn warn(message: impl std::fmt::Display) {
    eprintln!("{} {}", Style::new().yellow().apply_to("!"), message);
}

pub fn field(label: &str, value: impl std::fmt::Display) {
    let dim = Style::new().dim();
    println!("  {:<16} {}", dim.apply_to(label), value);
}
