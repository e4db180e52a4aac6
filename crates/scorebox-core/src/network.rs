//! Network lifecycle: one isolated network per job, released exactly once.
//!
//! `provision` hands out a [`NetworkLease`]. The lease is the only way to
//! remove the network, and `release` consumes it, so a network can be torn
//! down at most once and only if it was created. A lease dropped without
//! being released schedules the removal on the current runtime.

use crate::config::{JobContext, PipelineConfig};
use crate::error::StageError;
use crate::pipeline::StageOutcome;
use crate::runner::CommandRunner;
use crate::stage::{RuntimeCommand, RuntimeStage};
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct NetworkManager {
    runner: Arc<dyn CommandRunner>,
}

impl NetworkManager {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Create the job's isolated network.
    pub async fn provision(
        &self,
        job: &JobContext,
        config: &PipelineConfig,
    ) -> StageOutcome<NetworkLease> {
        let network = job.network_name().to_string();
        let command = RuntimeStage::NetworkCreate.command(job, config);

        let failure = match self.runner.run(&command, None).await {
            Ok(output) if output.passed() => {
                info!(network = %network, "Created isolated network");
                return StageOutcome::Continue(NetworkLease {
                    name: network,
                    remove: Some(RuntimeStage::NetworkRemove.command(job, config)),
                    runner: Arc::clone(&self.runner),
                });
            }
            Ok(output) => output.stderr,
            Err(e) => e.to_string(),
        };

        error!(network = %network, reason = %failure.trim(), "Got an error while creating the network");
        StageOutcome::Abort(StageError::NetworkProvision {
            network,
            reason: failure,
        })
    }
}

/// Ownership of a provisioned network.
pub struct NetworkLease {
    name: String,
    /// Taken on release; `None` afterwards.
    remove: Option<RuntimeCommand>,
    runner: Arc<dyn CommandRunner>,
}

impl NetworkLease {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Remove the network.
    pub async fn release(mut self) -> Result<(), StageError> {
        let Some(command) = self.remove.take() else {
            return Ok(());
        };

        let failure = match self.runner.run(&command, None).await {
            Ok(output) if output.passed() => {
                info!(network = %self.name, "Removed the isolated network");
                return Ok(());
            }
            Ok(output) => output.stderr,
            Err(e) => e.to_string(),
        };

        error!(network = %self.name, reason = %failure.trim(), "Got an error while removing the network");
        Err(StageError::NetworkTeardown {
            network: self.name.clone(),
            reason: failure,
        })
    }
}

impl Drop for NetworkLease {
    fn drop(&mut self) {
        let Some(command) = self.remove.take() else {
            return;
        };

        warn!(network = %self.name, "Network lease dropped without release, removing in background");
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let runner = Arc::clone(&self.runner);
                let name = self.name.clone();
                handle.spawn(async move {
                    match runner.run(&command, None).await {
                        Ok(output) if output.passed() => {}
                        Ok(output) => {
                            error!(network = %name, stderr = %output.stderr.trim(), "Background network removal failed")
                        }
                        Err(e) => error!(network = %name, error = %e, "Background network removal failed"),
                    }
                });
            }
            Err(_) => {
                error!(network = %self.name, "No async runtime available, network leaked");
            }
        }
    }
}
