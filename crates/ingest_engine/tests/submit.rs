use std::sync::Arc;
use std::time::Duration;

use ingest_core::{ClientError, FileUpload, TaskId};
use ingest_engine::{
    Credential, CredentialStore, EngineConfig, MemoryCredentialStore, ReqwestSubmitter,
    TaskSubmitter,
};
use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> EngineConfig {
    EngineConfig::with_base(format!("{}/api", server.uri()))
}

fn store(token: Option<&str>) -> Arc<MemoryCredentialStore> {
    Arc::new(MemoryCredentialStore::new(token.map(Credential::new)))
}

fn pdf() -> FileUpload {
    FileUpload::new("manual.pdf", "application/pdf", b"%PDF-1.7 body".to_vec())
}

#[tokio::test]
async fn file_upload_returns_task_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload-and-process"))
        .and(header("authorization", "Bearer tok-123"))
        .and(body_string_contains("filename=\"manual.pdf\""))
        .and(body_string_contains("%PDF-1.7 body"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "task_id": "t1" })))
        .expect(1)
        .mount(&server)
        .await;

    let submitter = ReqwestSubmitter::new(config(&server), store(Some("tok-123"))).unwrap();
    let task = submitter.submit_file(pdf()).await.expect("submit ok");

    assert_eq!(task, TaskId::new("t1"));
}

#[tokio::test]
async fn url_scrape_posts_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/scrape-and-ingest"))
        .and(header("authorization", "Bearer tok"))
        .and(body_json(json!({ "url": "https://example.com/docs" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "task_id": "scrape-9" })))
        .expect(1)
        .mount(&server)
        .await;

    let submitter = ReqwestSubmitter::new(config(&server), store(Some("tok"))).unwrap();
    let task = submitter
        .submit_url("https://example.com/docs")
        .await
        .expect("submit ok");

    assert_eq!(task.as_str(), "scrape-9");
}

#[tokio::test]
async fn missing_credential_fails_without_network_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "task_id": "x" })))
        .expect(0)
        .mount(&server)
        .await;

    let submitter = ReqwestSubmitter::new(config(&server), store(None)).unwrap();

    assert_eq!(
        submitter.submit_file(pdf()).await,
        Err(ClientError::AuthenticationRequired)
    );
    assert_eq!(
        submitter.submit_url("https://example.com").await,
        Err(ClientError::AuthenticationRequired)
    );
}

#[tokio::test]
async fn malformed_url_is_rejected_before_sending() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let submitter = ReqwestSubmitter::new(config(&server), store(Some("tok"))).unwrap();

    assert!(matches!(
        submitter.submit_url("").await,
        Err(ClientError::Validation(_))
    ));
    assert!(matches!(
        submitter.submit_url("example.com/no-scheme").await,
        Err(ClientError::Validation(_))
    ));
}

#[tokio::test]
async fn unauthorized_maps_to_expired_credential() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/scrape-and-ingest"))
        .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
        .mount(&server)
        .await;

    let credentials = store(Some("old"));
    let submitter = ReqwestSubmitter::new(config(&server), credentials.clone()).unwrap();

    assert_eq!(
        submitter.submit_url("https://example.com").await,
        Err(ClientError::AuthenticationExpired)
    );
    // Clearing is the caller's decision.
    assert!(credentials.get().is_some());
}

#[tokio::test]
async fn server_errors_carry_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload-and-process"))
        .respond_with(ResponseTemplate::new(422).set_body_string("unsupported pdf"))
        .expect(1)
        .mount(&server)
        .await;

    let submitter = ReqwestSubmitter::new(config(&server), store(Some("tok"))).unwrap();

    assert_eq!(
        submitter.submit_file(pdf()).await,
        Err(ClientError::Remote {
            status: 422,
            body: "unsupported pdf".to_string(),
        })
    );
}

#[tokio::test]
async fn body_without_task_id_is_a_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "queued" })))
        .mount(&server)
        .await;

    let submitter = ReqwestSubmitter::new(config(&server), store(Some("tok"))).unwrap();

    assert!(matches!(
        submitter.submit_url("https://example.com").await,
        Err(ClientError::Protocol(_))
    ));
}

#[tokio::test]
async fn unreachable_server_is_a_network_error() {
    // Nothing listens on the discard port.
    let settings = EngineConfig {
        connect_timeout: Duration::from_millis(500),
        ..EngineConfig::with_base("http://127.0.0.1:9/api")
    };
    let submitter = ReqwestSubmitter::new(settings, store(Some("tok"))).unwrap();

    assert!(matches!(
        submitter.submit_url("https://example.com").await,
        Err(ClientError::Network(_))
    ));
}
