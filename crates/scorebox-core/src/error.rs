//! Error types for the job pipeline.

use scorebox_state::RegistryError;

/// Failure to execute a runtime command at all.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("command has no program")]
    EmptyCommand,

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("command timed out after {secs} seconds")]
    Timeout { secs: u64 },
}

/// A stage failure. Every variant is terminal for the job.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("image build failed: {reason}")]
    Build { reason: String },

    #[error("vulnerability scanner failed to run: {reason}")]
    ScanExecution { reason: String },

    #[error("image rejected by vulnerability gate: {findings} high-severity finding(s)")]
    AdmissionRejected { findings: usize, report: String },

    #[error("failed to create network {network}: {reason}")]
    NetworkProvision { network: String, reason: String },

    #[error("failed to remove network {network}: {reason}")]
    NetworkTeardown { network: String, reason: String },

    #[error("sandbox could not be started: {reason}")]
    Execution { reason: String },

    #[error("sandbox exceeded its {secs}s execution deadline")]
    ExecutionTimeout { secs: u64 },

    #[error("sandbox exited with code {exit_code}")]
    SandboxExit { exit_code: i32 },

    #[error("result channel protocol violation: {reason}")]
    ResultProtocol { reason: String },
}

impl StageError {
    /// Name of the stage that produced this error.
    pub fn stage(&self) -> &'static str {
        match self {
            StageError::Build { .. } => "build",
            StageError::ScanExecution { .. } | StageError::AdmissionRejected { .. } => "scan",
            StageError::NetworkProvision { .. } | StageError::NetworkTeardown { .. } => "network",
            StageError::Execution { .. }
            | StageError::ExecutionTimeout { .. }
            | StageError::SandboxExit { .. } => "execute",
            StageError::ResultProtocol { .. } => "extract",
        }
    }

    /// Whether the failure happened after untrusted code already ran.
    ///
    /// These are surfaced to the caller as an aborted run rather than an
    /// ordinary failed job.
    pub fn after_execution(&self) -> bool {
        matches!(
            self,
            StageError::ExecutionTimeout { .. }
                | StageError::SandboxExit { .. }
                | StageError::ResultProtocol { .. }
        )
    }
}

/// Errors that end a pipeline abnormally.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The registry did not confirm a status transition.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// The job was marked failed after the sandbox ran.
    #[error("job aborted after execution: {0}")]
    Aborted(StageError),
}

impl PipelineError {
    /// Process exit code for supervisors.
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::Aborted(_) => 2,
            PipelineError::Registry(_) => 3,
        }
    }
}
