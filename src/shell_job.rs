use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

use crate::binder::{BindingError, Bindings};
use crate::context::InvocationContext;
use crate::job::{Job, JobError};
use crate::params::Parameters;

#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("missing required parameter: Command")]
    MissingCommand,

    #[error("command exited {exit_code}: {stderr}")]
    Exit { exit_code: i32, stderr: String },

    #[error("command timed out after {0:?}")]
    Timeout(Duration),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Runs `Command` through `sh -c`.
///
/// Fields: `Command` (required), `WorkingDirectory`, `Timeout` (seconds).
/// Request parameters that are not fields are exported to the child as
/// environment variables, so commands can read their inputs. A non-zero
/// exit is a failure carrying the exit code and stderr.
#[derive(Debug, Default)]
pub struct ShellJob {
    pub command: String,
    pub working_directory: Option<PathBuf>,
    pub timeout: Option<Duration>,
    /// Stdout lines of the last successful run.
    pub output: Vec<String>,
}

static FIELDS: LazyLock<Bindings<ShellJob>> = LazyLock::new(|| {
    Bindings::new()
        .field("Command", |job: &mut ShellJob, v: String| job.command = v)
        .field("WorkingDirectory", |job: &mut ShellJob, v: Option<PathBuf>| {
            job.working_directory = v
        })
        .field("Timeout", |job: &mut ShellJob, v: Option<Duration>| {
            job.timeout = v
        })
});

impl ShellJob {
    pub const JOB_TYPE: &'static str = "shell";
}

#[async_trait]
impl Job for ShellJob {
    fn bind(&mut self, params: &Parameters) -> Result<usize, BindingError> {
        FIELDS.bind(self, params)
    }

    async fn execute(&mut self, ctx: &InvocationContext) -> Result<(), JobError> {
        if self.command.trim().is_empty() {
            return Err(ShellError::MissingCommand.into());
        }
        debug!(command = %self.command, "executing shell command");

        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(&self.command).kill_on_drop(true);
        if let Some(dir) = &self.working_directory {
            cmd.current_dir(dir);
        }
        let declared: Vec<&str> = FIELDS.names().collect();
        for (k, v) in ctx.request().parameters.iter() {
            if !declared.contains(&k) {
                cmd.env(k, v);
            }
        }

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, cmd.output())
                .await
                .map_err(|_| ShellError::Timeout(limit))?,
            None => cmd.output().await,
        }
        .map_err(ShellError::from)?;

        let exit_code = output.status.code().unwrap_or(1);
        if exit_code != 0 {
            info!(exit_code, "shell command failed");
            return Err(ShellError::Exit {
                exit_code,
                stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
            }
            .into());
        }

        self.output = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(String::from)
            .collect();
        info!(lines = self.output.len(), "shell command completed");
        Ok(())
    }
}
