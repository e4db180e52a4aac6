//! Error types for scorebox-state

use thiserror::Error;

use crate::registry_traits::JobStatus;

/// Errors that can occur while talking to the job registry
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Transport-level failure (connection refused, timeout, TLS, ...)
    #[error("Registry request failed: {0}")]
    Http(String),

    /// The registry answered but did not acknowledge the request
    #[error("Registry rejected request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// Job not known to the registry
    #[error("Job not found: {job_id}")]
    NotFound { job_id: String },

    /// Response body could not be decoded
    #[error("Failed to decode registry response: {0}")]
    Decode(String),

    /// Status transition would break monotonicity
    #[error("Invalid status transition for job {job_id}: {current} -> {requested}")]
    InvalidTransition {
        job_id: String,
        current: JobStatus,
        requested: JobStatus,
    },
}

impl From<reqwest::Error> for RegistryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RegistryError::Decode(err.to_string())
        } else {
            RegistryError::Http(err.to_string())
        }
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        RegistryError::Decode(err.to_string())
    }
}
