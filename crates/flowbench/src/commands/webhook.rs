//! Webhook command - endpoint extraction, triggering and probing.

use std::time::Duration;

use anyhow::{Context as _, Result, bail};
use clap::{Args, Subcommand};
use console::Style;
use serde_json::{Value, json};

use flowbench_client::WebhookResponse;
use flowbench_runner::{TRIGGER_TIMEOUT, WebhookResolver};
use flowbench_types::WebhookConfig;

use super::{Context, fail, field, heading, ok, print_json};

#[derive(Args, Debug)]
pub struct WebhookArgs {
    #[command(subcommand)]
    pub command: WebhookCommand,
}

#[derive(Subcommand, Debug)]
pub enum WebhookCommand {
    /// Find webhook nodes in a workspace and store their URLs
    Extract {
        /// Workspace name
        #[arg(short, long, visible_alias = "name")]
        workspace: String,
    },

    /// Send a payload to a webhook URL
    Trigger {
        /// Webhook URL (defaults to the workspace's first endpoint)
        #[arg(long, required_unless_present = "workspace")]
        url: Option<String>,

        /// Use the stored endpoint of this workspace
        #[arg(short, long)]
        workspace: Option<String>,

        /// GET, POST, PUT or DELETE
        #[arg(short, long, default_value = "POST")]
        method: String,

        /// JSON payload (default: a manual trigger marker)
        #[arg(long)]
        data: Option<String>,

        /// Request timeout in seconds
        #[arg(long, default_value_t = TRIGGER_TIMEOUT.as_secs())]
        timeout: u64,
    },

    /// Check whether the engine has registered a webhook URL
    Verify {
        url: String,

        #[arg(short, long, default_value = "GET")]
        method: String,
    },

    /// POST a sample payload to a webhook URL
    Test { url: String },

    /// Trigger several webhook URLs in sequence
    Batch {
        #[arg(required = true)]
        urls: Vec<String>,

        /// JSON payload sent to every URL
        #[arg(long)]
        data: Option<String>,

        /// Pause between requests in milliseconds
        #[arg(long, default_value_t = 1000)]
        delay_ms: u64,
    },
}

pub async fn run(args: WebhookArgs, ctx: &Context) -> Result<()> {
    let resolver = WebhookResolver::new(ctx.client()?);

    match args.command {
        WebhookCommand::Extract { workspace } => extract(&resolver, &workspace, ctx),
        WebhookCommand::Trigger {
            url,
            workspace,
            method,
            data,
            timeout,
        } => {
            let url = match (url, workspace) {
                (Some(url), _) => url,
                (None, Some(name)) => stored_url(ctx, &name)?,
                (None, None) => bail!("pass --url or --workspace"),
            };
            let payload = parse_payload(data.as_deref())?;
            let response = resolver
                .trigger(&url, &method, payload, Duration::from_secs(timeout))
                .await?;
            report_response(&url, &response, ctx)
        }
        WebhookCommand::Verify { url, method } => {
            let registration = resolver.verify_registration(&url, &method).await;
            if ctx.json_output {
                print_json(&registration)?;
            } else if registration.registered {
                ok(format!("{method} {url} is registered"));
            } else {
                fail(format!(
                    "{method} {url} is not registered: {}",
                    registration.reason.as_deref().unwrap_or("unknown")
                ));
                if let Some(allowed) = &registration.allowed {
                    field("allowed", allowed);
                }
            }
            if !registration.registered {
                bail!("webhook not registered");
            }
            Ok(())
        }
        WebhookCommand::Test { url } => {
            let response = resolver.test(&url).await?;
            report_response(&url, &response, ctx)
        }
        WebhookCommand::Batch {
            urls,
            data,
            delay_ms,
        } => {
            let payload = parse_payload(data.as_deref())?;
            let outcomes = resolver
                .batch_trigger(&urls, payload, Duration::from_millis(delay_ms))
                .await;
            let failed = outcomes.iter().filter(|o| !o.success).count();

            if ctx.json_output {
                print_json(&outcomes)?;
            } else {
                heading("Batch Trigger");
                for o in &outcomes {
                    let status = o.status.map_or("-".to_string(), |s| s.to_string());
                    if o.success {
                        ok(format!("{} [{status}]", o.url));
                    } else {
                        fail(format!(
                            "{} [{status}] {}",
                            o.url,
                            o.error.as_deref().unwrap_or("")
                        ));
                    }
                }
                println!();
                field("succeeded", outcomes.len() - failed);
                field("failed", failed);
            }
            if failed > 0 {
                bail!("{failed} of {} webhook(s) failed", outcomes.len());
            }
            Ok(())
        }
    }
}

fn extract(resolver: &WebhookResolver, name: &str, ctx: &Context) -> Result<()> {
    let ws = ctx.workspace(name)?;
    let definition = ws.load_definition()?;
    let endpoints = resolver.extract(&definition);
    ws.update_metadata(|m| {
        m.webhook_config = Some(WebhookConfig::new(endpoints.clone()));
    })?;

    if ctx.json_output {
        return print_json(&endpoints);
    }

    let dim = Style::new().dim();
    heading(&format!("Webhooks in {}", definition.name()));
    if endpoints.is_empty() {
        println!("{}", dim.apply_to("No webhook nodes found"));
    }
    for ep in &endpoints {
        println!("{} {}", console::style(&ep.method).bold(), ep.node_name);
        match (&ep.production_url, &ep.test_url) {
            (Some(prod), Some(test)) => {
                field("production", prod);
                field("test", test);
            }
            _ => println!("  {}", dim.apply_to("no path or webhook id; URL unknown")),
        }
    }
    Ok(())
}

fn stored_url(ctx: &Context, name: &str) -> Result<String> {
    let ws = ctx.workspace(name)?;
    let meta = ws.load_metadata()?;
    meta.webhook_config
        .as_ref()
        .and_then(|c| c.first_usable())
        .and_then(|e| e.preferred_url())
        .map(str::to_string)
        .with_context(|| format!("no webhook endpoint stored for {name}; run `webhook extract` first"))
}

fn parse_payload(data: Option<&str>) -> Result<Option<Value>> {
    data.map(|d| serde_json::from_str(d).context("--data is not valid JSON"))
        .transpose()
}

fn report_response(url: &str, response: &WebhookResponse, ctx: &Context) -> Result<()> {
    if ctx.json_output {
        print_json(&json!({ "url": url, "response": response }))?;
    } else {
        if response.is_success() {
            ok(format!("{url} answered {}", response.status));
        } else {
            fail(format!("{url} answered {}", response.status));
        }
        if let Some(id) = &response.execution_id {
            field("execution id", id);
        }
        field("elapsed", format!("{:.2}s", response.elapsed.as_secs_f64()));
        if !response.body.is_null() {
            println!("{}", serde_json::to_string_pretty(&response.body)?);
        }
    }
    if !response.is_success() {
        bail!("webhook returned status {}", response.status);
    }
    Ok(())
}
