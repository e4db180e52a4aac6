//! Job model and registry trait definitions
//!
//! A job is owned by an external registry service. The pipeline only ever
//! appends status transitions to it:
//!
//! ```text
//! Init -> Running -> Finished | Failed
//! ```
//!
//! `JobRegistry` abstracts the registry so the pipeline can run against the
//! HTTP service or against the in-memory fake in [`crate::fakes`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

/// Result type for registry operations
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

// ---------------------------------------------------------------------------
// JobId
// ---------------------------------------------------------------------------

/// Opaque unique job identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random JobId
    pub fn new() -> Self {
        JobId(uuid::Uuid::new_v4().to_string())
    }

    /// Return the full identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form: everything before the first `-`.
    pub fn short(&self) -> &str {
        self.0.split('-').next().unwrap_or(&self.0)
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        JobId(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// JobStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Init,
    Running,
    Finished,
    Failed,
}

impl JobStatus {
    /// Wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Init => "INIT",
            JobStatus::Running => "RUNNING",
            JobStatus::Finished => "FINISHED",
            JobStatus::Failed => "FAILED",
        }
    }

    /// Finished and Failed never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Finished | JobStatus::Failed)
    }

    /// Whether moving from `self` to `next` keeps the lifecycle monotonic.
    ///
    /// Re-reporting the same terminal status is accepted so that a repeated
    /// update is a no-op rather than an error.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        match (self, next) {
            (JobStatus::Init, JobStatus::Running) => true,
            (JobStatus::Running, JobStatus::Finished | JobStatus::Failed) => true,
            (current, next) if current.is_terminal() => *current == next,
            _ => false,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "INIT" => Ok(JobStatus::Init),
            "RUNNING" => Ok(JobStatus::Running),
            "FINISHED" => Ok(JobStatus::Finished),
            "FAILED" => Ok(JobStatus::Failed),
            other => Err(format!("unknown job status: {}", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A job record as held by the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    pub status: JobStatus,
    pub result: Option<f64>,
}

/// Payload of a registry update.
///
/// `result` is always serialized, as `null` when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobUpdate {
    pub id: JobId,
    pub status: JobStatus,
    pub result: Option<f64>,
}

impl JobUpdate {
    pub fn new(id: JobId, status: JobStatus, result: Option<f64>) -> Self {
        Self { id, status, result }
    }
}

// ---------------------------------------------------------------------------
// JobRegistry
// ---------------------------------------------------------------------------

/// Job registry.
///
/// Guarantees:
/// - `update` returns only after the registry confirmed persistence.
/// - Any non-success acknowledgement is surfaced as an error.
/// - Updating a job to the terminal status it already holds does not change
///   the observed record.
#[async_trait]
pub trait JobRegistry: Send + Sync {
    /// Create a new job in `Init` status.
    async fn create(&self) -> RegistryResult<JobRecord>;

    /// Fetch a job by ID. Returns `RegistryError::NotFound` if absent.
    async fn get(&self, id: &JobId) -> RegistryResult<JobRecord>;

    /// List all known job IDs.
    async fn list(&self) -> RegistryResult<Vec<JobId>>;

    /// Persist a status/result transition and return the stored record.
    async fn update(&self, update: JobUpdate) -> RegistryResult<JobRecord>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_short() {
        let id = JobId::from("3f2a9c1e-0b7d-4c55-9a0e-8f1d2b3c4d5e");
        assert_eq!(id.short(), "3f2a9c1e");

        let plain = JobId::from("nodashes");
        assert_eq!(plain.short(), "nodashes");
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(serde_json::to_string(&JobStatus::Init).unwrap(), "\"INIT\"");
        assert_eq!(
            serde_json::to_string(&JobStatus::Finished).unwrap(),
            "\"FINISHED\""
        );
        let parsed: JobStatus = serde_json::from_str("\"FAILED\"").unwrap();
        assert_eq!(parsed, JobStatus::Failed);
    }

    #[test]
    fn test_status_from_str_case_insensitive() {
        assert_eq!("running".parse::<JobStatus>().unwrap(), JobStatus::Running);
        assert!("paused".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_forward_transitions_allowed() {
        assert!(JobStatus::Init.can_transition_to(JobStatus::Running));
        assert!(JobStatus::Running.can_transition_to(JobStatus::Finished));
        assert!(JobStatus::Running.can_transition_to(JobStatus::Failed));
    }

    #[test]
    fn test_backward_and_skipping_transitions_rejected() {
        assert!(!JobStatus::Running.can_transition_to(JobStatus::Init));
        assert!(!JobStatus::Init.can_transition_to(JobStatus::Finished));
        assert!(!JobStatus::Running.can_transition_to(JobStatus::Running));
        assert!(!JobStatus::Finished.can_transition_to(JobStatus::Failed));
        assert!(!JobStatus::Failed.can_transition_to(JobStatus::Running));
    }

    #[test]
    fn test_terminal_self_transition_is_idempotent() {
        assert!(JobStatus::Finished.can_transition_to(JobStatus::Finished));
        assert!(JobStatus::Failed.can_transition_to(JobStatus::Failed));
    }

    #[test]
    fn test_update_serializes_null_result() {
        let update = JobUpdate::new(JobId::from("abc"), JobStatus::Failed, None);
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "id": "abc", "status": "FAILED", "result": null })
        );
    }
}
