//! Pipeline configuration and per-job identity.

use scorebox_state::JobId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Limits and runtime settings shared by every job a process runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    /// Container runtime binary.
    pub runtime: String,

    /// Repository part of the image tag; the job id is the tag.
    pub image_repository: String,

    /// Memory ceiling passed to the runtime (`--memory`).
    pub memory_limit: String,

    /// CPU ceiling passed to the runtime (`--cpus`).
    pub cpu_limit: String,

    /// Host user the sandbox runs as (`--user`).
    pub sandbox_user: String,

    /// Execution deadline in seconds. 0 disables it.
    pub execution_timeout_secs: u64,

    /// Fail the job when the sandbox exits non-zero, even if it wrote a
    /// valid result.
    pub strict_exit_code: bool,

    /// Result channel file name inside the job directory.
    pub result_file: String,

    /// Where the result channel is mounted inside the sandbox.
    pub result_mount: String,

    /// Numeric field holding the score.
    pub result_key: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            runtime: "docker".to_string(),
            image_repository: "job_runner".to_string(),
            memory_limit: "500M".to_string(),
            cpu_limit: "0.8".to_string(),
            sandbox_user: nix::unistd::getuid().as_raw().to_string(),
            execution_timeout_secs: 3600,
            strict_exit_code: false,
            result_file: "perf.json".to_string(),
            result_mount: "/data/perf.json".to_string(),
            result_key: "perf".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Defaults overridden by `SCOREBOX_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(runtime) = std::env::var("SCOREBOX_RUNTIME") {
            config.runtime = runtime;
        }
        if let Ok(memory) = std::env::var("SCOREBOX_MEMORY_LIMIT") {
            config.memory_limit = memory;
        }
        if let Ok(cpus) = std::env::var("SCOREBOX_CPU_LIMIT") {
            config.cpu_limit = cpus;
        }
        if let Some(secs) = std::env::var("SCOREBOX_EXECUTION_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.execution_timeout_secs = secs;
        }
        config
    }

    /// Set the execution deadline.
    pub fn with_execution_timeout(mut self, secs: u64) -> Self {
        self.execution_timeout_secs = secs;
        self
    }

    /// Set the sandbox user.
    pub fn with_sandbox_user(mut self, user: impl Into<String>) -> Self {
        self.sandbox_user = user.into();
        self
    }

    /// Enable or disable strict sandbox exit code handling.
    pub fn with_strict_exit_code(mut self, strict: bool) -> Self {
        self.strict_exit_code = strict;
        self
    }
}

/// Identity and on-disk location of a single job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobContext {
    pub id: JobId,
    /// Directory holding the build context; the result channel lives here.
    pub dir: PathBuf,
}

impl JobContext {
    pub fn new(id: JobId, dir: impl Into<PathBuf>) -> Self {
        Self {
            id,
            dir: dir.into(),
        }
    }

    /// Use the directory's name as the job id.
    pub fn from_dir(dir: impl Into<PathBuf>) -> Option<Self> {
        let dir = dir.into();
        let name = dir.file_name()?.to_str()?.to_string();
        Some(Self::new(JobId(name), dir))
    }

    /// Tag of the image built for this job.
    pub fn image_tag(&self, config: &PipelineConfig) -> String {
        format!("{}:{}", config.image_repository, self.id)
    }

    /// Name of the job's isolated network.
    pub fn network_name(&self) -> &str {
        self.id.as_str()
    }

    /// Name given to the sandbox container so it can be killed on deadline.
    pub fn container_name(&self, config: &PipelineConfig) -> String {
        format!("{}-{}", config.image_repository, self.id)
    }

    /// Host path of the result channel.
    pub fn result_channel(&self, config: &PipelineConfig) -> PathBuf {
        self.dir.join(&config.result_file)
    }

    pub fn dockerfile(&self) -> PathBuf {
        self.dir.join("Dockerfile")
    }
}
