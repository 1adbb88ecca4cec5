//! HTTP blob store
//!
//! Reads objects from an S3-compatible endpoint using path-style addressing
//! (`{endpoint}/{bucket}/{key}`), optionally with a bearer token.

use super::traits::BlobStore;
use crate::config::StorageConfig;
use crate::domain::{RelayError, Result, StorageError};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, StatusCode};
use secrecy::ExposeSecret;
use std::time::Duration;
use url::Url;

/// Blob store backed by an HTTP object endpoint
pub struct HttpBlobStore {
    endpoint: Url,
    client: Client,
    access_token: Option<String>,
}

impl HttpBlobStore {
    /// Create a new HTTP blob store from configuration
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the endpoint is missing or is not a
    /// base URL, or if the HTTP client cannot be built.
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let raw = config.endpoint.as_deref().ok_or_else(|| {
            RelayError::Configuration("storage.endpoint is required".to_string())
        })?;

        let endpoint = Url::parse(raw)
            .map_err(|e| RelayError::Configuration(format!("Invalid storage endpoint: {e}")))?;
        if endpoint.cannot_be_a_base() {
            return Err(RelayError::Configuration(format!(
                "Storage endpoint cannot be used as a base URL: {raw}"
            )));
        }

        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| {
                RelayError::Configuration(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            endpoint,
            client,
            access_token: config
                .access_token
                .as_ref()
                .map(|token| token.expose_secret().to_string()),
        })
    }

    /// URL of `bucket/key`, with each key segment percent-encoded
    fn object_url(&self, bucket: &str, key: &str) -> std::result::Result<Url, StorageError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| StorageError::Rejected(format!("Invalid endpoint for {bucket}/{key}")))?
            .pop_if_empty()
            .push(bucket)
            .extend(key.split('/'));
        Ok(url)
    }
}

/// Maps a non-success status to a storage error
fn status_error(status: StatusCode, location: &str, body: &str) -> StorageError {
    match status {
        StatusCode::NOT_FOUND => StorageError::NotFound(location.to_string()),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            StorageError::AccessDenied(format!("{location} ({status})"))
        }
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
            StorageError::Transient(format!("{location}: {status}"))
        }
        s if s.is_server_error() => StorageError::Transient(format!("{location}: {status} {body}")),
        _ => StorageError::Rejected(format!("{location}: {status} {body}")),
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn get(&self, bucket: &str, key: &str) -> std::result::Result<Vec<u8>, StorageError> {
        let location = format!("{bucket}/{key}");
        let url = self.object_url(bucket, key)?;

        let mut request = self.client.get(url);
        if let Some(ref token) = self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            StorageError::Transient(format!("Request for {location} failed: {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &location, body.trim()));
        }

        let bytes = response.bytes().await.map_err(|e| {
            StorageError::Transient(format!("Failed to read body of {location}: {e}"))
        })?;

        tracing::debug!(location = %location, size = bytes.len(), "Fetched object");
        Ok(bytes.to_vec())
    }

    fn provider_name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn store(endpoint: &str) -> HttpBlobStore {
        HttpBlobStore::new(&StorageConfig {
            endpoint: Some(endpoint.to_string()),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_object_url_path_style() {
        let store = store("https://s3.example.com/");
        let url = store.object_url("bucket1", "cx1/patient A.json").unwrap();
        assert_eq!(
            url.as_str(),
            "https://s3.example.com/bucket1/cx1/patient%20A.json"
        );
    }

    #[test]
    fn test_object_url_keeps_endpoint_prefix() {
        let store = store("http://localhost:9000/storage");
        let url = store.object_url("b", "k.json").unwrap();
        assert_eq!(url.as_str(), "http://localhost:9000/storage/b/k.json");
    }

    #[test]
    fn test_rejects_missing_endpoint() {
        assert!(HttpBlobStore::new(&StorageConfig::default()).is_err());
    }

    #[test]
    fn test_rejects_non_base_endpoint() {
        let config = StorageConfig {
            endpoint: Some("mailto:ops@example.com".to_string()),
            ..Default::default()
        };
        assert!(HttpBlobStore::new(&config).is_err());
    }

    #[test_case(StatusCode::NOT_FOUND, false ; "not found is terminal")]
    #[test_case(StatusCode::FORBIDDEN, false ; "forbidden is terminal")]
    #[test_case(StatusCode::BAD_REQUEST, false ; "bad request is terminal")]
    #[test_case(StatusCode::TOO_MANY_REQUESTS, true ; "throttled is transient")]
    #[test_case(StatusCode::SERVICE_UNAVAILABLE, true ; "unavailable is transient")]
    fn test_status_classification(status: StatusCode, transient: bool) {
        assert_eq!(status_error(status, "b/k", "").is_transient(), transient);
    }

    #[test]
    fn test_not_found_maps_to_not_found() {
        assert_eq!(
            status_error(StatusCode::NOT_FOUND, "b/k", ""),
            StorageError::NotFound("b/k".to_string())
        );
    }
}
