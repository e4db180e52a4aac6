//! Trait contract tests for JobRegistry.
//!
//! These tests verify the behavioral contract of the registry trait using the
//! in-memory fake. Any conforming implementation must pass these.

use scorebox_state::fakes::MemoryJobRegistry;
use scorebox_state::registry_traits::*;
use scorebox_state::RegistryError;

// ===========================================================================
// create / get / list
// ===========================================================================

#[tokio::test]
async fn create_starts_in_init() {
    let registry = MemoryJobRegistry::new();
    let job = registry.create().await.unwrap();

    assert_eq!(job.status, JobStatus::Init);
    assert!(job.result.is_none());
}

#[tokio::test]
async fn get_round_trip() {
    let registry = MemoryJobRegistry::new();
    let job = registry.create().await.unwrap();
    let fetched = registry.get(&job.id).await.unwrap();

    assert_eq!(fetched, job);
}

#[tokio::test]
async fn get_not_found() {
    let registry = MemoryJobRegistry::new();
    let err = registry.get(&JobId::from("missing")).await.unwrap_err();

    assert!(matches!(err, RegistryError::NotFound { .. }));
}

#[tokio::test]
async fn list_returns_ids_in_creation_order() {
    let registry = MemoryJobRegistry::new();
    let a = registry.create().await.unwrap();
    let b = registry.create().await.unwrap();

    assert_eq!(registry.list().await.unwrap(), vec![a.id, b.id]);
}

// ===========================================================================
// update
// ===========================================================================

#[tokio::test]
async fn update_walks_lifecycle() {
    let registry = MemoryJobRegistry::new();
    let id = registry.create().await.unwrap().id;

    registry
        .update(JobUpdate::new(id.clone(), JobStatus::Running, None))
        .await
        .unwrap();
    let done = registry
        .update(JobUpdate::new(id.clone(), JobStatus::Finished, Some(0.5)))
        .await
        .unwrap();

    assert_eq!(done.status, JobStatus::Finished);
    assert_eq!(done.result, Some(0.5));
    assert_eq!(
        registry.statuses(&id),
        vec![JobStatus::Running, JobStatus::Finished]
    );
}

#[tokio::test]
async fn update_unknown_job_fails() {
    let registry = MemoryJobRegistry::new();
    let err = registry
        .update(JobUpdate::new(JobId::from("ghost"), JobStatus::Running, None))
        .await
        .unwrap_err();

    assert!(matches!(err, RegistryError::NotFound { .. }));
}

#[tokio::test]
async fn terminal_status_is_never_overwritten() {
    let registry = MemoryJobRegistry::new();
    let id = registry.create().await.unwrap().id;
    registry
        .update(JobUpdate::new(id.clone(), JobStatus::Running, None))
        .await
        .unwrap();
    registry
        .update(JobUpdate::new(id.clone(), JobStatus::Failed, None))
        .await
        .unwrap();

    let err = registry
        .update(JobUpdate::new(id.clone(), JobStatus::Finished, Some(1.0)))
        .await
        .unwrap_err();

    assert!(matches!(err, RegistryError::InvalidTransition { .. }));
    let job = registry.get(&id).await.unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.result, None);
}

#[tokio::test]
async fn repeated_terminal_update_is_idempotent() {
    let registry = MemoryJobRegistry::new();
    let id = registry.create().await.unwrap().id;
    registry
        .update(JobUpdate::new(id.clone(), JobStatus::Running, None))
        .await
        .unwrap();
    registry
        .update(JobUpdate::new(id.clone(), JobStatus::Finished, Some(0.99)))
        .await
        .unwrap();
    let before = registry.get(&id).await.unwrap();

    let again = registry
        .update(JobUpdate::new(id.clone(), JobStatus::Finished, Some(0.99)))
        .await
        .unwrap();

    assert_eq!(again, before);
    assert_eq!(registry.get(&id).await.unwrap(), before);
    assert_eq!(registry.statuses(&id).len(), 2);
}

#[tokio::test]
async fn backward_transition_rejected() {
    let registry = MemoryJobRegistry::new();
    let id = registry.create().await.unwrap().id;
    registry
        .update(JobUpdate::new(id.clone(), JobStatus::Running, None))
        .await
        .unwrap();

    let err = registry
        .update(JobUpdate::new(id.clone(), JobStatus::Init, None))
        .await
        .unwrap_err();

    assert!(matches!(err, RegistryError::InvalidTransition { .. }));
}

#[tokio::test]
async fn rejected_status_surfaces_as_error() {
    let registry = MemoryJobRegistry::new();
    registry.reject_status(JobStatus::Running);
    let id = registry.create().await.unwrap().id;

    let err = registry
        .update(JobUpdate::new(id.clone(), JobStatus::Running, None))
        .await
        .unwrap_err();

    assert!(matches!(err, RegistryError::Rejected { status: 503, .. }));
    assert_eq!(registry.get(&id).await.unwrap().status, JobStatus::Init);
    assert_eq!(registry.update_calls().len(), 1);
}
