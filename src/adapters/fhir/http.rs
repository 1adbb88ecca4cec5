//! HTTP FHIR client
//!
//! Posts batch bundles to `{base_url}/{cxId}` as `application/fhir+json`.
//! Transport failures, timeouts, throttling and 5xx responses are retried per
//! `[fhir.retry]`; everything else is returned to the caller on first sight.

use super::traits::FhirClient;
use crate::adapters::retry::{retry_with_backoff, RetryPolicy};
use crate::config::{FhirAuthType, FhirConfig};
use crate::domain::{Bundle, CxId, FhirError, RelayError, Result};
use crate::logging::JobLogger;
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, ClientBuilder, StatusCode};
use secrecy::ExposeSecret;
use std::time::Duration;
use url::Url;

const FHIR_JSON: &str = "application/fhir+json";

/// FHIR client speaking the REST batch interaction over HTTP
///
/// # Example
///
/// ```no_run
/// use fhir_relay::adapters::fhir::HttpFhirClient;
/// use fhir_relay::config::FhirConfig;
///
/// # fn example() -> fhir_relay::domain::Result<()> {
/// let client = HttpFhirClient::new(&FhirConfig::default())?;
/// # Ok(())
/// # }
/// ```
pub struct HttpFhirClient {
    base_url: Url,
    client: Client,
    auth_header: Option<String>,
    retry: RetryPolicy,
}

impl HttpFhirClient {
    /// Create a new FHIR client from configuration
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the base URL is invalid or the HTTP
    /// client cannot be built.
    pub fn new(config: &FhirConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| RelayError::Configuration(format!("Invalid fhir.base_url: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(RelayError::Configuration(format!(
                "fhir.base_url cannot be used as a base URL: {}",
                config.base_url
            )));
        }

        let mut client_builder = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(30));

        if !config.tls_verify {
            tracing::warn!("TLS certificate verification is disabled for the FHIR server");
            client_builder = client_builder.danger_accept_invalid_certs(true);
        }

        let client = client_builder.build().map_err(|e| {
            RelayError::Configuration(format!("Failed to create HTTP client: {e}"))
        })?;

        Ok(Self {
            base_url,
            client,
            auth_header: auth_header_value(config),
            retry: RetryPolicy::from(&config.retry),
        })
    }

    /// Replace the network-level retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Tenant-scoped batch endpoint
    fn batch_url(&self, tenant: &CxId) -> std::result::Result<Url, FhirError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FhirError::InvalidResponse("Invalid FHIR base URL".to_string()))?
            .pop_if_empty()
            .push(tenant.as_str());
        Ok(url)
    }

    /// One POST, without retry
    async fn post_once(&self, url: &Url, body: &[u8]) -> std::result::Result<Bundle, FhirError> {
        let mut request = self
            .client
            .post(url.clone())
            .header(CONTENT_TYPE, FHIR_JSON)
            .header(ACCEPT, FHIR_JSON)
            .body(body.to_vec());

        if let Some(ref auth) = self.auth_header {
            request = request.header(AUTHORIZATION, auth);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                FhirError::Timeout(e.to_string())
            } else {
                FhirError::ConnectionFailed(e.to_string())
            }
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            if e.is_timeout() {
                FhirError::Timeout(e.to_string())
            } else {
                FhirError::ConnectionFailed(format!("Failed to read response body: {e}"))
            }
        })?;

        classify_response(status, &text)
    }
}

/// Build the Authorization header for the configured scheme
fn auth_header_value(config: &FhirConfig) -> Option<String> {
    match config.auth_type {
        FhirAuthType::None => None,
        FhirAuthType::Basic => {
            let username = config.username.as_deref()?;
            let password = config.password.as_ref()?;
            let credentials = format!("{username}:{}", password.expose_secret());
            let encoded = general_purpose::STANDARD.encode(credentials.as_bytes());
            Some(format!("Basic {encoded}"))
        }
        FhirAuthType::Bearer => config
            .api_token
            .as_ref()
            .map(|token| format!("Bearer {}", token.expose_secret())),
    }
}

/// Turns a status and body into a response bundle or a transport error
fn classify_response(status: StatusCode, body: &str) -> std::result::Result<Bundle, FhirError> {
    if status.is_success() {
        return serde_json::from_str(body).map_err(|e| {
            FhirError::InvalidResponse(format!("Response is not a bundle ({status}): {e}"))
        });
    }

    let message = truncate(body, 512);
    match status {
        StatusCode::TOO_MANY_REQUESTS => Err(FhirError::RateLimited(message)),
        StatusCode::REQUEST_TIMEOUT => Err(FhirError::Timeout(message)),
        s if s.is_server_error() => Err(FhirError::ServerError {
            status: s.as_u16(),
            message,
        }),
        s => match serde_json::from_str::<Bundle>(body) {
            Ok(bundle) if bundle.resource_type == "Bundle" => Ok(bundle),
            _ => Err(FhirError::ClientError {
                status: s.as_u16(),
                message,
            }),
        },
    }
}

fn truncate(body: &str, max_chars: usize) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

#[async_trait]
impl FhirClient for HttpFhirClient {
    async fn execute_batch(
        &self,
        tenant: &CxId,
        bundle: &Bundle,
        log: &JobLogger,
    ) -> std::result::Result<Bundle, FhirError> {
        let url = self.batch_url(tenant)?;
        let body = serde_json::to_vec(bundle)
            .map_err(|e| FhirError::InvalidResponse(format!("Failed to encode bundle: {e}")))?;

        tracing::debug!(
            parent: log.span(),
            url = %url,
            entries = bundle.len(),
            "Submitting batch transaction"
        );

        retry_with_backoff(&self.retry, log, FhirError::is_retryable, || {
            self.post_once(&url, &body)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::secret_string;
    use test_case::test_case;

    #[test]
    fn test_batch_url_appends_tenant() {
        let client = HttpFhirClient::new(&FhirConfig {
            base_url: "http://fhir.internal:8888/fhir/".to_string(),
            ..Default::default()
        })
        .unwrap();

        let url = client.batch_url(&CxId::new("cx 1").unwrap()).unwrap();
        assert_eq!(url.as_str(), "http://fhir.internal:8888/fhir/cx%201");
    }

    #[test]
    fn test_basic_auth_header() {
        let config = FhirConfig {
            auth_type: FhirAuthType::Basic,
            username: Some("relay".to_string()),
            password: Some(secret_string("s3cret".to_string())),
            ..Default::default()
        };
        let expected = format!("Basic {}", general_purpose::STANDARD.encode("relay:s3cret"));
        assert_eq!(auth_header_value(&config), Some(expected));
    }

    #[test]
    fn test_bearer_auth_header() {
        let config = FhirConfig {
            auth_type: FhirAuthType::Bearer,
            api_token: Some(secret_string("tok".to_string())),
            ..Default::default()
        };
        assert_eq!(auth_header_value(&config), Some("Bearer tok".to_string()));
        assert_eq!(auth_header_value(&FhirConfig::default()), None);
    }

    #[test]
    fn test_success_parses_bundle() {
        let body = r#"{"resourceType":"Bundle","type":"batch-response","entry":[{"response":{"status":"200 OK"}}]}"#;
        let bundle = classify_response(StatusCode::OK, body).unwrap();
        assert_eq!(bundle.len(), 1);
    }

    #[test]
    fn test_success_with_garbage_is_invalid_response() {
        let err = classify_response(StatusCode::OK, "<html>").unwrap_err();
        assert!(matches!(err, FhirError::InvalidResponse(_)));
    }

    #[test]
    fn test_client_error_with_bundle_is_passed_through() {
        let body = r#"{"resourceType":"Bundle","type":"batch-response","entry":[{"response":{"status":"400 Bad Request"}}]}"#;
        let bundle = classify_response(StatusCode::BAD_REQUEST, body).unwrap();
        assert_eq!(bundle.entry[0].status(), Some("400 Bad Request"));
    }

    #[test_case(StatusCode::BAD_REQUEST, "not a bundle", false ; "plain 400")]
    #[test_case(StatusCode::UNAUTHORIZED, "", false ; "unauthorized")]
    #[test_case(StatusCode::TOO_MANY_REQUESTS, "", true ; "throttled")]
    #[test_case(StatusCode::REQUEST_TIMEOUT, "", true ; "request timeout")]
    #[test_case(StatusCode::BAD_GATEWAY, "upstream", true ; "bad gateway")]
    fn test_error_classification(status: StatusCode, body: &str, retryable: bool) {
        let err = classify_response(status, body).unwrap_err();
        assert_eq!(err.is_retryable(), retryable);
    }

    #[test]
    fn test_truncate_long_bodies() {
        let long = "x".repeat(600);
        let truncated = truncate(&long, 512);
        assert_eq!(truncated.len(), 515);
        assert!(truncated.ends_with("..."));
        assert_eq!(truncate(" short ", 512), "short");
    }
}
