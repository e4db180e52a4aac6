//! Scorebox core - the per-job execution pipeline
//!
//! Takes a staged build context and:
//! - Builds it into an image tagged with the job id
//! - Blocks images with high-severity vulnerabilities
//! - Runs the image on an isolated, per-job network with capped resources
//! - Reads the score the job wrote to its result channel
//! - Reports every status transition to the job registry

pub mod builder;
pub mod config;
pub mod error;
pub mod extract;
pub mod fakes;
pub mod gate;
pub mod network;
pub mod pipeline;
pub mod reporter;
pub mod runner;
pub mod sandbox;
pub mod stage;
pub mod telemetry;

// Re-export key types
pub use config::{JobContext, PipelineConfig};
pub use error::{PipelineError, RunnerError, StageError};
pub use gate::{Finding, ScanVerdict};
pub use network::{NetworkLease, NetworkManager};
pub use pipeline::{run_all, JobOutcome, JobPipeline, StageOutcome};
pub use reporter::StatusReporter;
pub use runner::{CommandOutput, CommandRunner, ProcessRunner};
pub use stage::{RuntimeCommand, RuntimeStage};
pub use telemetry::init_tracing;
