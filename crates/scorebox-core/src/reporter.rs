//! Status reporting to the job registry.

use scorebox_state::{JobId, JobRecord, JobRegistry, JobStatus, JobUpdate, RegistryError};
use std::sync::Arc;
use tracing::{error, info};

/// Sends a job's status transitions to the registry.
///
/// Tracks the last acknowledged status and refuses transitions that would
/// move the job backwards before the registry is contacted.
pub struct StatusReporter {
    registry: Arc<dyn JobRegistry>,
    job_id: JobId,
    current: JobStatus,
}

impl StatusReporter {
    /// The job is expected to be in `Init` when its pipeline starts.
    pub fn new(registry: Arc<dyn JobRegistry>, job_id: JobId) -> Self {
        Self {
            registry,
            job_id,
            current: JobStatus::Init,
        }
    }

    /// Last status the registry confirmed.
    pub fn current(&self) -> JobStatus {
        self.current
    }

    /// Record a transition and wait for the registry to confirm it.
    pub async fn report(
        &mut self,
        status: JobStatus,
        result: Option<f64>,
    ) -> Result<JobRecord, RegistryError> {
        if !self.current.can_transition_to(status) {
            return Err(RegistryError::InvalidTransition {
                job_id: self.job_id.to_string(),
                current: self.current,
                requested: status,
            });
        }

        let update = JobUpdate::new(self.job_id.clone(), status, result);
        match self.registry.update(update).await {
            Ok(record) => {
                info!(status = %status, result = ?result, "Reported job status");
                self.current = status;
                Ok(record)
            }
            Err(e) => {
                error!(status = %status, error = %e, "Registry did not confirm the job update");
                Err(e)
            }
        }
    }

    /// Mark the job failed, without a result.
    pub async fn fail(&mut self) -> Result<JobRecord, RegistryError> {
        self.report(JobStatus::Failed, None).await
    }
}
