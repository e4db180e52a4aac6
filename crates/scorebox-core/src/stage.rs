//! Container runtime operations and their command lines.

use crate::config::{JobContext, PipelineConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Runtime operations a job pipeline invokes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeStage {
    /// docker build -t <tag> .
    Build,

    /// docker scan --accept-license --json --severity high <tag>
    Scan,

    /// docker network create <id>
    NetworkCreate,

    /// docker run ... <tag>
    Run,

    /// docker network rm <id>
    NetworkRemove,

    /// docker kill <container>
    Kill,
}

impl RuntimeStage {
    /// Get the stage name as a string.
    pub fn name(&self) -> &'static str {
        match self {
            RuntimeStage::Build => "build",
            RuntimeStage::Scan => "scan",
            RuntimeStage::NetworkCreate => "network_create",
            RuntimeStage::Run => "run",
            RuntimeStage::NetworkRemove => "network_remove",
            RuntimeStage::Kill => "kill",
        }
    }

    /// Recognise which operation a runtime argument list performs.
    pub fn classify(args: &[String]) -> Option<RuntimeStage> {
        match args.first().map(String::as_str)? {
            "build" => Some(RuntimeStage::Build),
            "scan" => Some(RuntimeStage::Scan),
            "run" => Some(RuntimeStage::Run),
            "kill" => Some(RuntimeStage::Kill),
            "network" => match args.get(1).map(String::as_str)? {
                "create" => Some(RuntimeStage::NetworkCreate),
                "rm" => Some(RuntimeStage::NetworkRemove),
                _ => None,
            },
            _ => None,
        }
    }

    /// Build the runtime command for this operation on `job`.
    pub fn command(&self, job: &JobContext, config: &PipelineConfig) -> RuntimeCommand {
        let tag = job.image_tag(config);
        let args: Vec<String> = match self {
            RuntimeStage::Build => vec!["build".into(), "-t".into(), tag, ".".into()],
            RuntimeStage::Scan => vec![
                "scan".into(),
                "--accept-license".into(),
                "--json".into(),
                "--severity".into(),
                "high".into(),
                tag,
            ],
            RuntimeStage::NetworkCreate => vec![
                "network".into(),
                "create".into(),
                job.network_name().to_string(),
            ],
            RuntimeStage::Run => vec![
                "run".into(),
                "--name".into(),
                job.container_name(config),
                "-v".into(),
                format!(
                    "{}:{}",
                    job.result_channel(config).display(),
                    config.result_mount
                ),
                "--user".into(),
                config.sandbox_user.clone(),
                "--network".into(),
                job.network_name().to_string(),
                "--memory".into(),
                config.memory_limit.clone(),
                "--cpus".into(),
                config.cpu_limit.clone(),
                "--read-only".into(),
                tag,
            ],
            RuntimeStage::NetworkRemove => vec![
                "network".into(),
                "rm".into(),
                job.network_name().to_string(),
            ],
            RuntimeStage::Kill => vec!["kill".into(), job.container_name(config)],
        };

        let command = RuntimeCommand::new(&config.runtime, args);
        match self {
            RuntimeStage::Build => command.in_dir(job.dir.clone()),
            _ => command,
        }
    }
}

/// A runtime invocation: program, arguments and optional working directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeCommand {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl RuntimeCommand {
    pub fn new(program: &str, args: Vec<String>) -> Self {
        Self {
            program: program.to_string(),
            args,
            cwd: None,
        }
    }

    /// Run the command from `dir`.
    pub fn in_dir(mut self, dir: PathBuf) -> Self {
        self.cwd = Some(dir);
        self
    }

    /// Operation performed, if recognised.
    pub fn stage(&self) -> Option<RuntimeStage> {
        RuntimeStage::classify(&self.args)
    }

    /// Value following `flag` in the argument list.
    pub fn flag_value(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }
}

impl std::fmt::Display for RuntimeCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.program, self.args.join(" "))
    }
}
