//! Error reporters
//!
//! An [`ErrorReporter`] forwards an [`ErrorContext`] to a capture backend.
//! Capture is fire-and-forget: a failed capture is logged by the caller and
//! never changes the outcome of the invocation.

use super::context::{ErrorContext, Severity};
use crate::domain::{RelayError, Result};
use crate::logging::azure::{AzureLogger, LogRecord};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, ClientBuilder};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Destination for error and notification context
#[async_trait]
pub trait ErrorReporter: Send + Sync {
    /// Capture one event
    ///
    /// # Errors
    ///
    /// Returns a `Reporting` error if the backend could not be reached
    async fn capture(&self, context: &ErrorContext) -> Result<()>;
}

/// Writes captures to the structured log
#[derive(Debug, Clone, Default)]
pub struct LogErrorReporter;

#[async_trait]
impl ErrorReporter for LogErrorReporter {
    async fn capture(&self, context: &ErrorContext) -> Result<()> {
        let cause = context.cause.as_deref().unwrap_or("-");
        let cx_id = context.cx_id.as_deref().unwrap_or("-");
        let patient_id = context.patient_id.as_deref().unwrap_or("-");

        match context.level {
            Severity::Error => tracing::error!(
                target: "fhir_relay::capture",
                invocation_id = %context.invocation_id,
                stage = %context.stage,
                cx_id,
                patient_id,
                cause,
                "{}",
                context.message
            ),
            Severity::Warning => tracing::warn!(
                target: "fhir_relay::capture",
                invocation_id = %context.invocation_id,
                stage = %context.stage,
                cx_id,
                patient_id,
                "{}",
                context.message
            ),
            Severity::Info => tracing::info!(
                target: "fhir_relay::capture",
                invocation_id = %context.invocation_id,
                stage = %context.stage,
                "{}",
                context.message
            ),
        }
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CaptureEvent<'a> {
    event_id: String,
    timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    environment: Option<&'a str>,
    #[serde(flatten)]
    context: &'a ErrorContext,
}

/// Posts captures as JSON to an HTTP endpoint
pub struct HttpErrorReporter {
    endpoint: String,
    api_key: Option<String>,
    environment: Option<String>,
    client: Client,
}

impl HttpErrorReporter {
    /// Create a reporter posting to `endpoint`
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the HTTP client cannot be built
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        environment: Option<String>,
    ) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| {
                RelayError::Configuration(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            endpoint: endpoint.into(),
            api_key,
            environment,
            client,
        })
    }
}

#[async_trait]
impl ErrorReporter for HttpErrorReporter {
    async fn capture(&self, context: &ErrorContext) -> Result<()> {
        let event = CaptureEvent {
            event_id: Uuid::new_v4().simple().to_string(),
            timestamp: Utc::now().to_rfc3339(),
            environment: self.environment.as_deref(),
            context,
        };

        let mut request = self.client.post(&self.endpoint).json(&event);
        if let Some(ref key) = self.api_key {
            request = request.header("X-Capture-Key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RelayError::Reporting(format!("Failed to send capture: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(RelayError::Reporting(format!(
            "Capture endpoint returned status {status}: {body}"
        )))
    }
}

/// Sends captures to Azure Log Analytics
pub struct AzureErrorReporter {
    logger: Arc<AzureLogger>,
}

impl AzureErrorReporter {
    pub fn new(logger: Arc<AzureLogger>) -> Self {
        Self { logger }
    }
}

fn to_log_record(context: &ErrorContext) -> LogRecord {
    let mut row = LogRecord::new("error_capture", Utc::now());
    row.cx_id = context.cx_id.clone().unwrap_or_default();
    row.patient_id = context.patient_id.clone().unwrap_or_default();
    row.job_id = context.job_id.clone().unwrap_or_default();
    row.stage = context.stage.clone();
    row.status = context.level.to_string();
    row.message = match context.cause {
        Some(ref cause) => format!("{}: {cause}", context.message),
        None => context.message.clone(),
    };
    row
}

#[async_trait]
impl ErrorReporter for AzureErrorReporter {
    async fn capture(&self, context: &ErrorContext) -> Result<()> {
        self.logger.send_logs(&[to_log_record(context)]).await
    }
}
