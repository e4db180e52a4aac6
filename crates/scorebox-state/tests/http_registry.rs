//! HttpJobRegistry against a mock registry service.

use scorebox_state::{
    HttpJobRegistry, JobId, JobRegistry, JobStatus, JobUpdate, RegistryConfig, RegistryError,
};
use serde_json::json;

fn client_for(server: &mockito::Server) -> HttpJobRegistry {
    HttpJobRegistry::new(RegistryConfig::new(&server.url()).with_timeout(5))
        .expect("client builds")
}

#[tokio::test]
async fn update_posts_payload_and_decodes_record() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/job/update")
        .match_body(mockito::Matcher::Json(json!({
            "id": "job-1",
            "status": "FINISHED",
            "result": 0.99
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"job-1","status":"FINISHED","result":0.99}"#)
        .create_async()
        .await;

    let registry = client_for(&server);
    let record = registry
        .update(JobUpdate::new(
            JobId::from("job-1"),
            JobStatus::Finished,
            Some(0.99),
        ))
        .await
        .expect("update acknowledged");

    mock.assert_async().await;
    assert_eq!(record.status, JobStatus::Finished);
    assert_eq!(record.result, Some(0.99));
}

#[tokio::test]
async fn update_sends_null_result_on_failure() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/job/update")
        .match_body(mockito::Matcher::Json(json!({
            "id": "job-2",
            "status": "FAILED",
            "result": null
        })))
        .with_status(200)
        .with_body(r#"{"id":"job-2","status":"FAILED","result":null}"#)
        .create_async()
        .await;

    let registry = client_for(&server);
    let record = registry
        .update(JobUpdate::new(JobId::from("job-2"), JobStatus::Failed, None))
        .await
        .expect("update acknowledged");

    mock.assert_async().await;
    assert!(record.result.is_none());
}

#[tokio::test]
async fn non_success_status_is_rejected() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/job/update")
        .with_status(500)
        .with_body("boom")
        .create_async()
        .await;

    let registry = client_for(&server);
    let err = registry
        .update(JobUpdate::new(JobId::from("job-3"), JobStatus::Running, None))
        .await
        .unwrap_err();

    match err {
        RegistryError::Rejected { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn update_of_unknown_job_is_not_found() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/job/update")
        .with_status(404)
        .with_body(r#"{"detail":"Job not found"}"#)
        .create_async()
        .await;

    let registry = client_for(&server);
    let err = registry
        .update(JobUpdate::new(JobId::from("job-4"), JobStatus::Running, None))
        .await
        .unwrap_err();

    assert!(matches!(err, RegistryError::NotFound { .. }));
}

#[tokio::test]
async fn get_and_list() {
    let mut server = mockito::Server::new_async().await;
    let _get = server
        .mock("GET", "/job/job-5")
        .with_status(200)
        .with_body(r#"{"id":"job-5","status":"RUNNING","result":null}"#)
        .create_async()
        .await;
    let _list = server
        .mock("GET", "/jobs")
        .with_status(200)
        .with_body(r#"["job-5","job-6"]"#)
        .create_async()
        .await;

    let registry = client_for(&server);
    let job = registry.get(&JobId::from("job-5")).await.unwrap();
    assert_eq!(job.status, JobStatus::Running);

    let ids = registry.list().await.unwrap();
    assert_eq!(ids, vec![JobId::from("job-5"), JobId::from("job-6")]);
}

#[tokio::test]
async fn create_returns_init_record() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/job/create")
        .with_status(200)
        .with_body(r#"{"id":"job-7","status":"INIT","result":null}"#)
        .create_async()
        .await;

    let registry = client_for(&server);
    let job = registry.create().await.unwrap();

    assert_eq!(job.id, JobId::from("job-7"));
    assert_eq!(job.status, JobStatus::Init);
}

#[tokio::test]
async fn garbage_body_is_decode_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/jobs")
        .with_status(200)
        .with_body("not json")
        .create_async()
        .await;

    let registry = client_for(&server);
    let err = registry.list().await.unwrap_err();

    assert!(matches!(err, RegistryError::Decode(_)));
}

#[tokio::test]
async fn unreachable_registry_is_http_error() {
    let registry =
        HttpJobRegistry::new(RegistryConfig::new("http://127.0.0.1:1").with_timeout(2)).unwrap();
    let err = registry.list().await.unwrap_err();

    assert!(matches!(err, RegistryError::Http(_)));
}
