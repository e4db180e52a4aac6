//! Scorebox CLI - run untrusted container jobs and talk to the job registry
//!
//! ## Commands
//!
//! - `run`: build, scan, sandbox and score one or more job directories
//! - `job create`: register a new job and print its id
//! - `job get`: show a job record
//! - `job list`: list registered job ids
//!
//! `run` exits with the most severe job outcome: 0 finished, 1 failed,
//! 2 aborted after execution, 3 registry unreachable or refusing updates.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use scorebox_core::{
    run_all, JobContext, JobOutcome, JobPipeline, PipelineConfig, PipelineError, ProcessRunner,
};
use scorebox_state::{
    HttpJobRegistry, JobId, JobRecord, JobRegistry, RegistryConfig, DEFAULT_REGISTRY_URL,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "scorebox")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Build, screen, sandbox and score container jobs", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Job registry base URL
    #[arg(long, global = true, env = "SCOREBOX_REGISTRY_URL", default_value = DEFAULT_REGISTRY_URL)]
    registry_url: String,

    /// Registry request timeout in seconds
    #[arg(long, global = true, default_value = "30")]
    registry_timeout_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run job directories through the full pipeline
    Run(RunArgs),

    /// Job registry operations
    Job {
        #[command(subcommand)]
        action: JobAction,
    },
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    /// Job directories, each containing a Dockerfile
    #[arg(required = true)]
    dirs: Vec<PathBuf>,

    /// Job id (default: the directory name). Only valid with one directory.
    #[arg(long)]
    job_id: Option<String>,

    /// Container runtime binary
    #[arg(long, env = "SCOREBOX_RUNTIME")]
    runtime: Option<String>,

    /// Sandbox memory ceiling
    #[arg(long, env = "SCOREBOX_MEMORY_LIMIT")]
    memory: Option<String>,

    /// Sandbox CPU ceiling
    #[arg(long, env = "SCOREBOX_CPU_LIMIT")]
    cpus: Option<String>,

    /// Execution deadline in seconds, 0 disables it
    #[arg(long, env = "SCOREBOX_EXECUTION_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Fail the job when the sandbox exits non-zero
    #[arg(long)]
    strict_exit_code: bool,
}

#[derive(Subcommand)]
enum JobAction {
    /// Register a new job in INIT status
    Create,

    /// Show a job record as JSON
    Get {
        /// Job id
        id: String,
    },

    /// List registered job ids
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    scorebox_core::init_tracing(cli.json, level);

    let registry_config =
        RegistryConfig::new(&cli.registry_url).with_timeout(cli.registry_timeout_secs);
    let registry = Arc::new(
        HttpJobRegistry::new(registry_config).context("Failed to build registry client")?,
    );

    match cli.command {
        Commands::Run(args) => {
            let code = cmd_run(registry, &args).await?;
            if code != 0 {
                std::process::exit(code);
            }
            Ok(())
        }
        Commands::Job { action } => match action {
            JobAction::Create => cmd_job_create(registry.as_ref()).await,
            JobAction::Get { id } => cmd_job_get(registry.as_ref(), &id).await,
            JobAction::List => cmd_job_list(registry.as_ref()).await,
        },
    }
}

/// Environment defaults with command-line overrides applied.
fn pipeline_config(args: &RunArgs) -> PipelineConfig {
    let mut config = PipelineConfig::from_env();
    if let Some(runtime) = &args.runtime {
        config.runtime = runtime.clone();
    }
    if let Some(memory) = &args.memory {
        config.memory_limit = memory.clone();
    }
    if let Some(cpus) = &args.cpus {
        config.cpu_limit = cpus.clone();
    }
    if let Some(secs) = args.timeout_secs {
        config.execution_timeout_secs = secs;
    }
    config.with_strict_exit_code(args.strict_exit_code)
}

fn resolve_dir(dir: &Path) -> Result<PathBuf> {
    dir.canonicalize()
        .with_context(|| format!("Failed to resolve job directory {}", dir.display()))
}

/// One context per directory. Ids must be unique within a run since the id
/// names the job's network, image and container.
fn job_contexts(dirs: &[PathBuf], job_id: Option<&str>) -> Result<Vec<JobContext>> {
    if let Some(id) = job_id {
        anyhow::ensure!(
            dirs.len() == 1,
            "--job-id can only be used with a single job directory"
        );
        return Ok(vec![JobContext::new(JobId::from(id), resolve_dir(&dirs[0])?)]);
    }

    let jobs = dirs
        .iter()
        .map(|dir| {
            JobContext::from_dir(resolve_dir(dir)?).with_context(|| {
                format!("Cannot derive a job id from {}", dir.display())
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut seen = HashSet::new();
    for job in &jobs {
        anyhow::ensure!(
            seen.insert(job.id.clone()),
            "Job {} is given more than once ({})",
            job.id,
            job.dir.display()
        );
    }
    Ok(jobs)
}

/// Exit code for a finished pipeline.
fn outcome_exit_code(outcome: &Result<JobOutcome, PipelineError>) -> i32 {
    match outcome {
        Ok(outcome) => outcome.exit_code(),
        Err(e) => e.exit_code(),
    }
}

fn outcome_line(id: &JobId, outcome: &Result<JobOutcome, PipelineError>) -> String {
    match outcome {
        Ok(JobOutcome::Finished { score }) => format!("{id}\tFINISHED\t{score}"),
        Ok(JobOutcome::Failed { error }) => format!("{id}\tFAILED\t{}: {error}", error.stage()),
        Err(e) => format!("{id}\tABORTED\t{e}"),
    }
}

async fn cmd_run(registry: Arc<dyn JobRegistry>, args: &RunArgs) -> Result<i32> {
    let config = pipeline_config(args);
    let jobs = job_contexts(&args.dirs, args.job_id.as_deref())?;
    let runner = Arc::new(ProcessRunner);

    info!(
        jobs = jobs.len(),
        runtime = %config.runtime,
        timeout_secs = config.execution_timeout_secs,
        "Starting scorebox run"
    );

    let pipelines = jobs
        .into_iter()
        .map(|job| JobPipeline::new(job, config.clone(), registry.clone(), runner.clone()))
        .collect();

    let results = run_all(pipelines).await;
    for (id, outcome) in &results {
        println!("{}", outcome_line(id, outcome));
    }

    Ok(results
        .iter()
        .map(|(_, outcome)| outcome_exit_code(outcome))
        .max()
        .unwrap_or(0))
}

async fn cmd_job_create(registry: &dyn JobRegistry) -> Result<()> {
    let record = registry
        .create()
        .await
        .context("Failed to create job")?;
    println!("{}", record.id);
    Ok(())
}

async fn cmd_job_get(registry: &dyn JobRegistry, id: &str) -> Result<()> {
    let record = fetch_job(registry, id).await?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

async fn fetch_job(registry: &dyn JobRegistry, id: &str) -> Result<JobRecord> {
    registry
        .get(&JobId::from(id))
        .await
        .with_context(|| format!("Failed to fetch job {id}"))
}

async fn cmd_job_list(registry: &dyn JobRegistry) -> Result<()> {
    let ids = registry.list().await.context("Failed to list jobs")?;
    for id in ids {
        println!("{id}");
    }
    Ok(())
}
