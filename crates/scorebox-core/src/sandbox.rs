//! Sandboxed execution of the job image.

use crate::config::{JobContext, PipelineConfig};
use crate::error::{RunnerError, StageError};
use crate::network::NetworkLease;
use crate::pipeline::StageOutcome;
use crate::runner::{CommandOutput, CommandRunner};
use crate::stage::RuntimeStage;
use std::time::Duration;
use tracing::{error, info, warn};

pub struct SandboxStage<'a> {
    runner: &'a dyn CommandRunner,
    config: &'a PipelineConfig,
}

impl<'a> SandboxStage<'a> {
    pub fn new(runner: &'a dyn CommandRunner, config: &'a PipelineConfig) -> Self {
        Self { runner, config }
    }

    /// Run the image inside `network` and wait for it to exit.
    ///
    /// The result channel is (re)created empty first; it is the only
    /// writable path the sandbox gets.
    pub async fn execute(&self, job: &JobContext, network: &NetworkLease) -> StageOutcome<CommandOutput> {
        let channel = job.result_channel(self.config);
        if let Err(e) = tokio::fs::File::create(&channel).await {
            error!(path = %channel.display(), error = %e, "Could not create the result channel");
            return StageOutcome::Abort(StageError::Execution {
                reason: format!("cannot create {}: {}", channel.display(), e),
            });
        }

        let deadline = match self.config.execution_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        info!(network = %network.name(), "Launching the job");
        let command = RuntimeStage::Run.command(job, self.config);
        let output = match self.runner.run(&command, deadline).await {
            Ok(output) => output,
            Err(RunnerError::Timeout { secs }) => {
                self.kill(job).await;
                return StageOutcome::Abort(StageError::ExecutionTimeout { secs });
            }
            Err(e) => {
                error!(error = %e, "Sandbox could not be started");
                return StageOutcome::Abort(StageError::Execution {
                    reason: e.to_string(),
                });
            }
        };

        if output.passed() {
            info!(duration_ms = output.duration_ms, "Sandbox exited");
        } else {
            warn!(
                exit_code = output.exit_code,
                stderr = %output.stderr.trim(),
                "Sandbox exited with a non-zero code"
            );
            if self.config.strict_exit_code {
                return StageOutcome::Abort(StageError::SandboxExit {
                    exit_code: output.exit_code,
                });
            }
        }

        StageOutcome::Continue(output)
    }

    /// Force-stop the sandbox container after the deadline passed.
    async fn kill(&self, job: &JobContext) {
        warn!(
            timeout_secs = self.config.execution_timeout_secs,
            "Execution deadline exceeded, killing the sandbox"
        );
        let command = RuntimeStage::Kill.command(job, self.config);
        match self.runner.run(&command, None).await {
            Ok(output) if output.passed() => {}
            Ok(output) => error!(stderr = %output.stderr.trim(), "Failed to kill the sandbox"),
            Err(e) => error!(error = %e, "Failed to kill the sandbox"),
        }
    }
}
