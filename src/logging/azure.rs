//! Azure Log Analytics integration
//!
//! Sends metric and error records to a Log Analytics workspace through the
//! Logs Ingestion API, authenticating with an Azure AD client secret. Used as
//! the production sink behind [`crate::core::metrics::MetricsSink`] and
//! [`crate::core::escalation::ErrorReporter`] when configured with
//! `sink = "azure"`.

use crate::config::LoggingConfig;
use crate::domain::{RelayError, Result};
use azure_core::credentials::TokenCredential;
use azure_identity::ClientSecretCredential;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error};

/// One row of the custom log table
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LogRecord {
    pub time_generated: String,
    pub operation_type: String,
    pub cx_id: String,
    pub patient_id: String,
    pub job_id: String,
    pub stage: String,
    pub count: i64,
    pub duration_ms: i64,
    pub status: String,
    pub message: String,
}

impl LogRecord {
    /// Create a record stamped with `timestamp`
    pub fn new(operation_type: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            time_generated: timestamp.to_rfc3339(),
            operation_type: operation_type.into(),
            ..Default::default()
        }
    }
}

/// Azure logger for Log Analytics using the Logs Ingestion API
pub struct AzureLogger {
    /// Azure AD credential for authentication
    credential: Arc<ClientSecretCredential>,
    /// Data Collection Rule (DCR) immutable ID
    dcr_immutable_id: String,
    /// Data Collection Endpoint (DCE) URL
    dce_endpoint: String,
    /// Stream name for custom logs
    stream_name: String,
    /// HTTP client for API calls
    http_client: reqwest::Client,
}

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
    value.as_deref().ok_or_else(|| {
        RelayError::Configuration(format!("{name} is required when Azure logging is enabled"))
    })
}

impl AzureLogger {
    /// Create a new Azure logger from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if Azure logging is not enabled, a required setting is
    /// missing, or the credential cannot be built.
    pub fn new(config: &LoggingConfig) -> Result<Self> {
        if !config.azure_enabled {
            return Err(RelayError::Configuration(
                "Azure logging is not enabled".to_string(),
            ));
        }

        let tenant_id = required(&config.azure_tenant_id, "azure_tenant_id")?;
        let client_id = required(&config.azure_client_id, "azure_client_id")?;
        let dcr_immutable_id = required(&config.azure_dcr_immutable_id, "azure_dcr_immutable_id")?;
        let dce_endpoint = required(&config.azure_dce_endpoint, "azure_dce_endpoint")?;
        let stream_name = required(&config.azure_stream_name, "azure_stream_name")?;
        let client_secret = config.azure_client_secret.as_ref().ok_or_else(|| {
            RelayError::Configuration(
                "azure_client_secret is required when Azure logging is enabled".to_string(),
            )
        })?;

        let secret =
            azure_core::credentials::Secret::new(client_secret.expose_secret().to_string());

        let credential =
            ClientSecretCredential::new(tenant_id, client_id.to_string(), secret, None).map_err(
                |e| RelayError::Reporting(format!("Failed to create Azure AD credential: {e}")),
            )?;

        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| {
                RelayError::Configuration(format!("Failed to create HTTP client: {e}"))
            })?;

        debug!(
            dcr_id = %dcr_immutable_id,
            stream = %stream_name,
            "Azure Log Analytics logger initialized"
        );

        Ok(Self {
            credential,
            dcr_immutable_id: dcr_immutable_id.to_string(),
            dce_endpoint: dce_endpoint.to_string(),
            stream_name: stream_name.to_string(),
            http_client,
        })
    }

    async fn get_access_token(&self) -> Result<String> {
        const MONITOR_SCOPE: &str = "https://monitor.azure.com/.default";

        let token = TokenCredential::get_token(&*self.credential, &[MONITOR_SCOPE], None)
            .await
            .map_err(|e| RelayError::Reporting(format!("Failed to acquire Azure AD token: {e}")))?;

        Ok(token.token.secret().to_string())
    }

    /// Send records to Azure Log Analytics
    ///
    /// # Errors
    ///
    /// Returns a `Reporting` error if the token or the API call fails
    pub async fn send_logs(&self, records: &[LogRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let token = self.get_access_token().await?;

        let url = format!(
            "{}/dataCollectionRules/{}/streams/{}?api-version=2023-01-01",
            self.dce_endpoint.trim_end_matches('/'),
            self.dcr_immutable_id,
            self.stream_name
        );

        debug!(url = %url, record_count = records.len(), "Sending logs to Azure Log Analytics");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(token)
            .json(records)
            .send()
            .await
            .map_err(|e| RelayError::Reporting(format!("Failed to send logs to Azure: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let error_body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        error!(
            status = %status,
            error = %error_body,
            "Failed to send logs to Azure Log Analytics"
        );
        Err(RelayError::Reporting(format!(
            "Azure Log Analytics API returned status {status}: {error_body}"
        )))
    }
}
