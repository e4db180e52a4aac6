//! In-memory fake for the job registry (testing only)
//!
//! `MemoryJobRegistry` satisfies the `JobRegistry` contract without a
//! running registry service. It additionally records every accepted
//! transition so tests can assert on the observed status sequence, and can
//! be told to refuse updates to exercise the pipeline's fatal registry path.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::RegistryError;
use crate::registry_traits::*;

/// One accepted update, as observed by the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub status: JobStatus,
    pub result: Option<f64>,
    pub at: DateTime<Utc>,
}

#[derive(Debug)]
struct JobState {
    record: JobRecord,
    transitions: Vec<Transition>,
    order: usize,
}

/// In-memory job registry backed by a `HashMap<JobId, JobState>`.
#[derive(Debug, Default)]
pub struct MemoryJobRegistry {
    jobs: Mutex<HashMap<String, JobState>>,
    rejected_statuses: Mutex<HashSet<JobStatus>>,
    update_calls: Mutex<Vec<JobUpdate>>,
}

impl MemoryJobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a job with the given ID in `Init` status.
    pub fn insert(&self, id: &JobId) -> JobRecord {
        let record = JobRecord {
            id: id.clone(),
            status: JobStatus::Init,
            result: None,
        };
        let mut jobs = self.jobs.lock().unwrap();
        let order = jobs.len();
        jobs.insert(
            id.0.clone(),
            JobState {
                record: record.clone(),
                transitions: Vec::new(),
                order,
            },
        );
        record
    }

    /// Make every update to `status` fail with a 503 rejection.
    pub fn reject_status(&self, status: JobStatus) {
        self.rejected_statuses.lock().unwrap().insert(status);
    }

    /// All accepted transitions for a job, oldest first.
    pub fn transitions(&self, id: &JobId) -> Vec<Transition> {
        let jobs = self.jobs.lock().unwrap();
        jobs.get(&id.0)
            .map(|s| s.transitions.clone())
            .unwrap_or_default()
    }

    /// Accepted status sequence for a job, oldest first.
    pub fn statuses(&self, id: &JobId) -> Vec<JobStatus> {
        self.transitions(id).iter().map(|t| t.status).collect()
    }

    /// Every update call received, accepted or not.
    pub fn update_calls(&self) -> Vec<JobUpdate> {
        self.update_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobRegistry for MemoryJobRegistry {
    async fn create(&self) -> RegistryResult<JobRecord> {
        Ok(self.insert(&JobId::new()))
    }

    async fn get(&self, id: &JobId) -> RegistryResult<JobRecord> {
        let jobs = self.jobs.lock().unwrap();
        jobs.get(&id.0)
            .map(|s| s.record.clone())
            .ok_or_else(|| RegistryError::NotFound {
                job_id: id.0.clone(),
            })
    }

    async fn list(&self) -> RegistryResult<Vec<JobId>> {
        let jobs = self.jobs.lock().unwrap();
        let mut states: Vec<&JobState> = jobs.values().collect();
        states.sort_by_key(|s| s.order);
        Ok(states.iter().map(|s| s.record.id.clone()).collect())
    }

    async fn update(&self, update: JobUpdate) -> RegistryResult<JobRecord> {
        self.update_calls.lock().unwrap().push(update.clone());

        if self
            .rejected_statuses
            .lock()
            .unwrap()
            .contains(&update.status)
        {
            return Err(RegistryError::Rejected {
                status: 503,
                body: format!("update to {} refused", update.status),
            });
        }

        let mut jobs = self.jobs.lock().unwrap();
        let state = jobs
            .get_mut(&update.id.0)
            .ok_or_else(|| RegistryError::NotFound {
                job_id: update.id.0.clone(),
            })?;

        let current = state.record.status;
        if !current.can_transition_to(update.status) {
            return Err(RegistryError::InvalidTransition {
                job_id: update.id.0.clone(),
                current,
                requested: update.status,
            });
        }

        // A terminal record is never overwritten, repeated reports are no-ops.
        if current.is_terminal() {
            return Ok(state.record.clone());
        }

        state.record.status = update.status;
        state.record.result = update.result;
        state.transitions.push(Transition {
            status: update.status,
            result: update.result,
            at: Utc::now(),
        });
        Ok(state.record.clone())
    }
}
