//! Execution through the engine's command-line tool.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use flowbench_types::{ExecutionMethod, ExecutionResult, ExecutionStatus, iso_now};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::strategy::{AttemptContext, ExecutionStrategy};
use crate::error::{Result, RunnerError};

pub struct CliStrategy {
    executable: String,
    read_timeout: Duration,
}

impl CliStrategy {
    pub fn new(executable: impl Into<String>, read_timeout: Duration) -> Self {
        Self {
            executable: executable.into(),
            read_timeout,
        }
    }

    fn args(&self, workflow_id: &str, debug: bool) -> Vec<String> {
        let mut args = vec![
            "execute".to_string(),
            "--id".to_string(),
            workflow_id.to_string(),
        ];
        if debug {
            args.extend(["--log-level".to_string(), "debug".to_string()]);
        }
        args
    }
}

#[async_trait]
impl ExecutionStrategy for CliStrategy {
    fn method(&self) -> ExecutionMethod {
        ExecutionMethod::Cli
    }

    async fn attempt(&self, ctx: &mut AttemptContext<'_>) -> Result<ExecutionResult> {
        let logs = ctx.logs;
        let args = self.args(ctx.workflow_id, ctx.debug);

        logs.append_execution(&format!(
            "=== CLI Workflow Execution ===\nTimestamp: {}\nCommand: {} {}\n{}\n",
            iso_now(),
            self.executable,
            args.join(" "),
            "=".repeat(50)
        ))?;

        let mut cmd = Command::new(&self.executable);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if ctx.debug {
            cmd.env("N8N_LOG_LEVEL", "debug");
        }

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(source) => {
                logs.log_error(&format!("CLI Execution Error: {source}"))?;
                return Err(RunnerError::Spawn {
                    program: self.executable.clone(),
                    source,
                });
            }
        };
        info!(program = %self.executable, workflow_id = ctx.workflow_id, "engine CLI started");

        // Drain stderr concurrently so a chatty process cannot block on a full pipe.
        let stderr_task = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                if let Err(e) = stderr.read_to_end(&mut buf).await {
                    warn!(error = %e, "failed reading CLI stderr");
                }
                String::from_utf8_lossy(&buf).into_owned()
            })
        });

        let mut stalled = false;
        if let Some(stdout) = child.stdout.take() {
            // Split on raw bytes so output in other encodings is still logged.
            let mut lines = BufReader::new(stdout).split(b'\n');
            loop {
                match timeout(self.read_timeout, lines.next_segment()).await {
                    Ok(Ok(Some(raw))) => {
                        let line = String::from_utf8_lossy(&raw);
                        let line = line.trim_end_matches('\r');
                        if ctx.debug {
                            debug!(target: "flowbench::cli_output", "{line}");
                        }
                        logs.append_execution(line)?;
                    }
                    Ok(Ok(None)) => break,
                    Ok(Err(e)) => {
                        warn!(error = %e, "failed reading CLI output");
                        break;
                    }
                    Err(_) => {
                        stalled = true;
                        break;
                    }
                }
            }
        }

        let exit = if stalled {
            None
        } else {
            match timeout(self.read_timeout, child.wait()).await {
                Ok(Ok(status)) => Some(status),
                Ok(Err(e)) => {
                    logs.log_error(&format!("CLI Execution Error: {e}"))?;
                    return Err(RunnerError::Spawn {
                        program: self.executable.clone(),
                        source: e,
                    });
                }
                Err(_) => None,
            }
        };

        if exit.is_none()
            && let Err(e) = child.kill().await
        {
            warn!(error = %e, "failed to kill stalled CLI");
        }

        if let Some(task) = stderr_task
            && let Ok(Ok(stderr)) = timeout(self.read_timeout, task).await
            && !stderr.trim().is_empty()
        {
            logs.append_error(stderr.trim_end())?;
        }

        let result = match exit {
            None => {
                let message = format!(
                    "CLI produced no output for {}s; process killed",
                    self.read_timeout.as_secs_f64()
                );
                warn!(program = %self.executable, "{message}");
                logs.log_error(&message)?;
                ExecutionResult::new(ExecutionMethod::Cli, ExecutionStatus::Error, 0.0)
                    .with_error(message)
            }
            Some(status) => {
                let status_kind = if status.success() {
                    ExecutionStatus::Success
                } else {
                    ExecutionStatus::Error
                };
                let mut result = ExecutionResult::new(ExecutionMethod::Cli, status_kind, 0.0);
                result.return_code = status.code();
                if !status.success() {
                    result = result.with_error(format!(
                        "CLI exited with code {}",
                        status.code().map_or("none".to_string(), |c| c.to_string())
                    ));
                }
                result
            }
        };

        Ok(ExecutionResult {
            duration: ctx.elapsed_secs(),
            ..result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_include_debug_level() {
        let cli = CliStrategy::new("n8n", Duration::from_secs(1));
        assert_eq!(cli.args("7", false), vec!["execute", "--id", "7"]);
        assert_eq!(
            cli.args("7", true),
            vec!["execute", "--id", "7", "--log-level", "debug"]
        );
    }
}
