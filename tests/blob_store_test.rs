//! Integration tests for the HTTP blob store against a mock server

use fhir_relay::adapters::storage::{BlobStore, HttpBlobStore};
use fhir_relay::config::{secret_string, StorageConfig};
use fhir_relay::domain::StorageError;
use test_case::test_case;

fn store(endpoint: String, token: Option<&str>) -> HttpBlobStore {
    HttpBlobStore::new(&StorageConfig {
        endpoint: Some(endpoint),
        access_token: token.map(|t| secret_string(t.to_string())),
        ..Default::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_fetches_object_by_path() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/bucket1/cx1/patientA.json")
        .with_status(200)
        .with_body(r#"{"resourceType":"Bundle"}"#)
        .create_async()
        .await;

    let bytes = store(server.url(), None)
        .get("bucket1", "cx1/patientA.json")
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(bytes, br#"{"resourceType":"Bundle"}"#);
}

#[tokio::test]
async fn test_sends_access_token() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/bucket1/patientA.json")
        .match_header("authorization", "Bearer storage-token")
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    store(server.url(), Some("storage-token"))
        .get("bucket1", "patientA.json")
        .await
        .unwrap();

    mock.assert_async().await;
}

#[test_case(404, false ; "not found")]
#[test_case(403, false ; "access denied")]
#[test_case(400, false ; "rejected")]
#[test_case(429, true ; "throttled")]
#[test_case(503, true ; "unavailable")]
#[tokio::test]
async fn test_status_classification(status: usize, transient: bool) {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/bucket1/patientA.json")
        .with_status(status)
        .create_async()
        .await;

    let err = store(server.url(), None)
        .get("bucket1", "patientA.json")
        .await
        .unwrap_err();

    assert_eq!(err.is_transient(), transient);
    if status == 404 {
        assert_eq!(err, StorageError::NotFound("bucket1/patientA.json".to_string()));
    }
}
