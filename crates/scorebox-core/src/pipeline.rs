//! Job pipeline orchestration.
//!
//! ```text
//! build -> scan -> network -> run -> extract -> teardown
//! ```
//!
//! Each stage yields a [`StageOutcome`]. On `Abort` the controller marks the
//! job failed and stops advancing. Once the network is provisioned the
//! remaining stages run inside a scope that always releases it.

use crate::builder::BuildStage;
use crate::config::{JobContext, PipelineConfig};
use crate::error::{PipelineError, StageError};
use crate::extract::extract_score;
use crate::gate::VulnerabilityGate;
use crate::network::{NetworkLease, NetworkManager};
use crate::reporter::StatusReporter;
use crate::runner::CommandRunner;
use crate::sandbox::SandboxStage;
use futures::future::join_all;
use scorebox_state::{JobId, JobRegistry, JobStatus};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, info_span, Instrument};

/// Result of one stage: hand over to the next stage, or stop the job.
#[derive(Debug)]
pub enum StageOutcome<T> {
    Continue(T),
    Abort(StageError),
}

/// How a job ended when the pipeline itself completed normally.
#[derive(Debug)]
pub enum JobOutcome {
    /// Job reported `Finished` with its score.
    Finished { score: f64 },

    /// Job reported `Failed` before the sandbox ran.
    Failed { error: StageError },
}

impl JobOutcome {
    pub fn is_finished(&self) -> bool {
        matches!(self, JobOutcome::Finished { .. })
    }

    /// Process exit code for supervisors.
    pub fn exit_code(&self) -> i32 {
        match self {
            JobOutcome::Finished { .. } => 0,
            JobOutcome::Failed { .. } => 1,
        }
    }
}

/// Runs one job from build context to score.
pub struct JobPipeline {
    job: JobContext,
    config: PipelineConfig,
    registry: Arc<dyn JobRegistry>,
    runner: Arc<dyn CommandRunner>,
}

impl JobPipeline {
    pub fn new(
        job: JobContext,
        config: PipelineConfig,
        registry: Arc<dyn JobRegistry>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            job,
            config,
            registry,
            runner,
        }
    }

    pub fn job_id(&self) -> &JobId {
        &self.job.id
    }

    /// Run every stage in order and report the outcome to the registry.
    pub async fn run(&self) -> Result<JobOutcome, PipelineError> {
        let span = info_span!("job", job = %self.job.id.short());
        async {
            let start = Instant::now();
            let outcome = self.run_stages().await;
            match &outcome {
                Ok(JobOutcome::Finished { score }) => {
                    info!(score, duration_ms = start.elapsed().as_millis() as u64, "Finished job")
                }
                Ok(JobOutcome::Failed { error }) => {
                    info!(stage = error.stage(), "Job failed")
                }
                Err(e) => error!(error = %e, "Job pipeline aborted"),
            }
            outcome
        }
        .instrument(span)
        .await
    }

    async fn run_stages(&self) -> Result<JobOutcome, PipelineError> {
        let mut reporter = StatusReporter::new(Arc::clone(&self.registry), self.job.id.clone());
        reporter.report(JobStatus::Running, None).await?;

        let runner = self.runner.as_ref();

        if let StageOutcome::Abort(e) = BuildStage::new(runner, &self.config).build(&self.job).await {
            return abort(&mut reporter, e).await;
        }

        if let StageOutcome::Abort(e) = VulnerabilityGate::new(runner, &self.config)
            .check(&self.job)
            .await
        {
            return abort(&mut reporter, e).await;
        }

        let network = match NetworkManager::new(Arc::clone(&self.runner))
            .provision(&self.job, &self.config)
            .await
        {
            StageOutcome::Continue(lease) => lease,
            StageOutcome::Abort(e) => return abort(&mut reporter, e).await,
        };

        let outcome = self.run_isolated(&mut reporter, &network).await;
        // Teardown failures are logged by the lease and do not change the
        // job's reported status.
        let _ = network.release().await;
        outcome
    }

    /// Stages that need the isolated network.
    async fn run_isolated(
        &self,
        reporter: &mut StatusReporter,
        network: &NetworkLease,
    ) -> Result<JobOutcome, PipelineError> {
        let sandbox = SandboxStage::new(self.runner.as_ref(), &self.config);
        if let StageOutcome::Abort(e) = sandbox.execute(&self.job, network).await {
            return abort(reporter, e).await;
        }

        let channel = self.job.result_channel(&self.config);
        match extract_score(&channel, &self.config.result_key).await {
            StageOutcome::Continue(score) => {
                reporter.report(JobStatus::Finished, Some(score)).await?;
                Ok(JobOutcome::Finished { score })
            }
            StageOutcome::Abort(e) => abort(reporter, e).await,
        }
    }
}

/// Mark the job failed, then stop.
async fn abort(reporter: &mut StatusReporter, error: StageError) -> Result<JobOutcome, PipelineError> {
    reporter.fail().await?;
    if error.after_execution() {
        Err(PipelineError::Aborted(error))
    } else {
        Ok(JobOutcome::Failed { error })
    }
}

/// Run independent job pipelines concurrently.
///
/// Results are returned in input order.
pub async fn run_all(
    pipelines: Vec<JobPipeline>,
) -> Vec<(JobId, Result<JobOutcome, PipelineError>)> {
    join_all(pipelines.iter().map(|p| async move {
        let outcome = p.run().await;
        (p.job_id().clone(), outcome)
    }))
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_outcome_exit_codes() {
        assert_eq!(JobOutcome::Finished { score: 1.0 }.exit_code(), 0);
        let failed = JobOutcome::Failed {
            error: StageError::Build {
                reason: "x".into(),
            },
        };
        assert_eq!(failed.exit_code(), 1);
        assert!(!failed.is_finished());
    }
}
