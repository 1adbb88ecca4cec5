//! Invocation handler - entry point for one queue-triggered invocation
//!
//! Jobs are processed strictly one after another. The first fatal job error
//! is captured exactly once and returned so the hosting runtime can redeliver
//! the message; records after it are left for redelivery.

use super::fetch::ContentFetcher;
use super::processor::{JobOutcome, JobProcessor};
use super::retry::RetryController;
use crate::adapters::fhir::{FhirClient, HttpFhirClient};
use crate::adapters::queue::{QueueEvent, QueueRecord};
use crate::adapters::retry::RetryPolicy;
use crate::adapters::storage::create_blob_store;
use crate::config::{ErrorSinkKind, MetricsSinkKind, RelayConfig};
use crate::core::escalation::{create_error_reporter, ErrorContext, ErrorReporter, Severity};
use crate::core::metrics::create_metrics_sink;
use crate::domain::{JobReference, RelayError, Result, Stage};
use crate::logging::azure::AzureLogger;
use crate::logging::JobLogger;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Jobs completed by one invocation
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationSummary {
    pub invocation_id: String,
    pub jobs: Vec<JobOutcome>,
}

/// Handles queue events, escalating failures to the error reporter
#[derive(Clone)]
pub struct InvocationHandler {
    processor: JobProcessor,
    reporter: Arc<dyn ErrorReporter>,
}

impl InvocationHandler {
    pub fn new(processor: JobProcessor, reporter: Arc<dyn ErrorReporter>) -> Self {
        Self {
            processor,
            reporter,
        }
    }

    /// Wire up the production collaborators described by `config`
    ///
    /// # Errors
    ///
    /// Returns a configuration error if any collaborator cannot be built
    pub fn from_config(config: &RelayConfig) -> Result<Self> {
        let needs_azure = config.metrics.sink == MetricsSinkKind::Azure
            || config.error_reporting.sink == ErrorSinkKind::Azure;
        let azure = if needs_azure {
            Some(Arc::new(AzureLogger::new(&config.logging)?))
        } else {
            None
        };

        let fetcher = ContentFetcher::new(
            create_blob_store(&config.storage)?,
            RetryPolicy::from(&config.storage.retry),
        );

        let client: Arc<dyn FhirClient> = Arc::new(HttpFhirClient::new(&config.fhir)?);
        let controller = RetryController::new(
            client,
            config.pipeline.max_attempts,
            Duration::from_millis(config.pipeline.attempt_delay_ms),
        );

        let metrics_sink = create_metrics_sink(&config.metrics, azure.clone())?;
        let reporter = create_error_reporter(config, azure)?;

        tracing::debug!(
            max_attempts = config.pipeline.max_attempts,
            fhir_base_url = %config.fhir.base_url,
            "Invocation handler configured"
        );

        Ok(Self::new(
            JobProcessor::new(fetcher, controller, metrics_sink),
            reporter,
        ))
    }

    /// Handle an event given as JSON text
    ///
    /// # Errors
    ///
    /// An envelope that cannot be decoded is captured and returned as a
    /// `Job` error at the invocation stage. See [`InvocationHandler::handle`]
    /// for job failures.
    pub async fn handle_raw(&self, raw: &str) -> Result<InvocationSummary> {
        let invocation_id = Uuid::new_v4().to_string();

        match QueueEvent::from_json(raw) {
            Ok(event) => self.run(&event, invocation_id).await,
            Err(e) => {
                let error = RelayError::job(Stage::Invocation, invocation_id.clone(), e);
                self.escalate(ErrorContext::from_error(&error, Stage::Invocation, invocation_id))
                    .await;
                Err(error)
            }
        }
    }

    /// Handle a decoded event
    ///
    /// # Errors
    ///
    /// Returns the first fatal job error, wrapped in `RelayError::Job`
    pub async fn handle(&self, event: &QueueEvent) -> Result<InvocationSummary> {
        self.run(event, Uuid::new_v4().to_string()).await
    }

    async fn run(&self, event: &QueueEvent, invocation_id: String) -> Result<InvocationSummary> {
        let records = &event.records;
        let mut summary = InvocationSummary {
            invocation_id,
            jobs: Vec::with_capacity(records.len()),
        };

        tracing::info!(
            invocation_id = %summary.invocation_id,
            records = records.len(),
            "Invocation started"
        );

        if records.is_empty() {
            tracing::warn!(invocation_id = %summary.invocation_id, "Event contains no records");
            return Ok(summary);
        }

        if records.len() > 1 {
            let message = format!(
                "Expected 1 record per invocation, received {}; processing all",
                records.len()
            );
            tracing::warn!(invocation_id = %summary.invocation_id, "{message}");
            self.escalate(ErrorContext::new(
                message,
                Stage::Invocation,
                summary.invocation_id.clone(),
                Severity::Warning,
            ))
            .await;
        }

        for (index, record) in records.iter().enumerate() {
            let job = self.parse_record(index, record, &summary.invocation_id).await?;
            let log = JobLogger::for_job(&job, &summary.invocation_id);

            match self.processor.process(&job, &log).await {
                Ok(outcome) => summary.jobs.push(outcome),
                Err(error) => {
                    let stage = match &error {
                        RelayError::Job { stage, .. } => *stage,
                        _ => Stage::Invocation,
                    };
                    tracing::error!(parent: log.span(), stage = %stage, error = %error, "Job failed");
                    self.escalate(
                        ErrorContext::from_error(&error, stage, summary.invocation_id.clone())
                            .with_job(&job),
                    )
                    .await;
                    return Err(error);
                }
            }
        }

        tracing::info!(
            invocation_id = %summary.invocation_id,
            jobs = summary.jobs.len(),
            "Invocation completed"
        );
        Ok(summary)
    }

    async fn parse_record(
        &self,
        index: usize,
        record: &QueueRecord,
        invocation_id: &str,
    ) -> Result<JobReference> {
        match JobReference::from_record(record) {
            Ok(job) => Ok(job),
            Err(e) => {
                let label = record
                    .message_id
                    .clone()
                    .unwrap_or_else(|| format!("record {index}"));
                let error = RelayError::job(Stage::Parse, label, e);
                tracing::error!(invocation_id = %invocation_id, error = %error, "Invalid queue record");
                self.escalate(ErrorContext::from_error(&error, Stage::Parse, invocation_id))
                    .await;
                Err(error)
            }
        }
    }

    /// Capture `context`; a failed capture is logged and otherwise ignored
    async fn escalate(&self, context: ErrorContext) {
        if let Err(e) = self.reporter.capture(&context).await {
            tracing::warn!(
                invocation_id = %context.invocation_id,
                error = %e,
                "Failed to capture error context"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{StorageConfig, StorageProvider};

    #[test]
    fn test_from_config_with_local_store() {
        let config = RelayConfig {
            storage: StorageConfig {
                provider: StorageProvider::Local,
                local_root: Some("/tmp/bundles".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(InvocationHandler::from_config(&config).is_ok());
    }

    #[test]
    fn test_from_config_requires_azure_settings_for_azure_sink() {
        let mut config = RelayConfig {
            storage: StorageConfig {
                provider: StorageProvider::Local,
                local_root: Some("/tmp/bundles".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        config.metrics.sink = MetricsSinkKind::Azure;
        assert!(InvocationHandler::from_config(&config).is_err());
    }
}
