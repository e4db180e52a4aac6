//! Build stage: staged build context to tagged image.

use crate::config::{JobContext, PipelineConfig};
use crate::error::StageError;
use crate::pipeline::StageOutcome;
use crate::runner::CommandRunner;
use crate::stage::RuntimeStage;
use tracing::{error, info};

pub struct BuildStage<'a> {
    runner: &'a dyn CommandRunner,
    config: &'a PipelineConfig,
}

impl<'a> BuildStage<'a> {
    pub fn new(runner: &'a dyn CommandRunner, config: &'a PipelineConfig) -> Self {
        Self { runner, config }
    }

    /// Build and tag the job's image. Returns the tag.
    pub async fn build(&self, job: &JobContext) -> StageOutcome<String> {
        if let Err(e) = validate_context(job) {
            error!(error = %e, "Build context is not usable");
            return StageOutcome::Abort(e);
        }

        let command = RuntimeStage::Build.command(job, self.config);
        let output = match self.runner.run(&command, None).await {
            Ok(output) => output,
            Err(e) => {
                error!(error = %e, "Image build could not be started");
                return StageOutcome::Abort(StageError::Build {
                    reason: e.to_string(),
                });
            }
        };

        if !output.passed() {
            error!(
                exit_code = output.exit_code,
                stderr = %output.stderr.trim(),
                "Got an error while building the image"
            );
            return StageOutcome::Abort(StageError::Build {
                reason: output.stderr,
            });
        }

        let tag = job.image_tag(self.config);
        info!(image = %tag, duration_ms = output.duration_ms, "Image built");
        StageOutcome::Continue(tag)
    }
}

/// A build context is a directory holding a `Dockerfile`.
fn validate_context(job: &JobContext) -> Result<(), StageError> {
    if !job.dir.is_dir() {
        return Err(StageError::Build {
            reason: format!("job directory {} does not exist", job.dir.display()),
        });
    }
    if !job.dockerfile().is_file() {
        return Err(StageError::Build {
            reason: format!("no Dockerfile in {}", job.dir.display()),
        });
    }
    Ok(())
}
