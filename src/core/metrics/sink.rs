//! Metrics sinks
//!
//! A sink receives one [`MetricsRecord`] per successful job. Delivery is best
//! effort: callers log a failed report and carry on.

use super::record::MetricsRecord;
use crate::domain::{JobReference, RelayError, Result};
use crate::logging::azure::{AzureLogger, LogRecord};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

/// Destination for per-job metrics
#[async_trait]
pub trait MetricsSink: Send + Sync {
    /// Report the metrics of a finished job
    ///
    /// # Errors
    ///
    /// Returns a `Reporting` error if the backend rejects the record
    async fn report(&self, record: &MetricsRecord, job: &JobReference) -> Result<()>;
}

/// Emits metrics as a structured log event
#[derive(Debug, Clone)]
pub struct LogMetricsSink {
    namespace: String,
    service_name: String,
}

impl LogMetricsSink {
    pub fn new(namespace: impl Into<String>, service_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            service_name: service_name.into(),
        }
    }
}

#[async_trait]
impl MetricsSink for LogMetricsSink {
    async fn report(&self, record: &MetricsRecord, job: &JobReference) -> Result<()> {
        let metrics = serde_json::to_string(record)?;

        tracing::info!(
            target: "fhir_relay::metrics",
            namespace = %self.namespace,
            service = %self.service_name,
            cx_id = %job.cx_id,
            patient_id = %job.patient_id,
            job_id = job.job_id.as_ref().map(|id| id.as_str()).unwrap_or("-"),
            metrics = %metrics,
            "Job metrics"
        );
        Ok(())
    }
}

/// Sends one Log Analytics row per metric
pub struct AzureMetricsSink {
    logger: Arc<AzureLogger>,
    namespace: String,
}

impl AzureMetricsSink {
    pub fn new(logger: Arc<AzureLogger>, namespace: impl Into<String>) -> Self {
        Self {
            logger,
            namespace: namespace.into(),
        }
    }

    fn to_log_records(&self, record: &MetricsRecord, job: &JobReference) -> Vec<LogRecord> {
        let now = Utc::now();
        record
            .iter()
            .map(|(name, value)| {
                let mut row = LogRecord::new(format!("{}.{name}", self.namespace), now);
                row.cx_id = job.cx_id.to_string();
                row.patient_id = job.patient_id.to_string();
                row.job_id = job.job_id.as_ref().map(|id| id.to_string()).unwrap_or_default();
                row.stage = name.to_string();
                row.duration_ms = value.duration_ms().unwrap_or_default() as i64;
                row.count = value.count_value().unwrap_or_default() as i64;
                row.status = "metric".to_string();
                row
            })
            .collect()
    }
}

#[async_trait]
impl MetricsSink for AzureMetricsSink {
    async fn report(&self, record: &MetricsRecord, job: &JobReference) -> Result<()> {
        let rows = self.to_log_records(record, job);
        self.logger
            .send_logs(&rows)
            .await
            .map_err(|e| RelayError::Reporting(format!("Failed to send metrics: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{secret_string, LoggingConfig};
    use crate::core::metrics::record::{JobMetrics, ERROR_COUNT};
    use crate::domain::{BlobLocation, CxId, PatientId};
    use std::time::Duration;

    fn job() -> JobReference {
        JobReference::new(
            CxId::new("cx1").unwrap(),
            PatientId::new("pat1").unwrap(),
            BlobLocation::new("bucket1", "patientA.json"),
        )
    }

    #[tokio::test]
    async fn test_log_sink_accepts_record() {
        let mut metrics = JobMetrics::new();
        metrics.record_attempt(Duration::from_millis(10), 0);

        let sink = LogMetricsSink::new("FhirRelay", "fhir-relay");
        assert!(sink.report(&metrics.finish(&job(), Utc::now()), &job()).await.is_ok());
    }

    #[test]
    fn test_azure_rows_carry_job_identity() {
        let config = LoggingConfig {
            azure_enabled: true,
            azure_tenant_id: Some("tenant".to_string()),
            azure_client_id: Some("client".to_string()),
            azure_client_secret: Some(secret_string("secret".to_string())),
            azure_dcr_immutable_id: Some("dcr-1".to_string()),
            azure_dce_endpoint: Some("https://dce.example.com".to_string()),
            azure_stream_name: Some("Custom-FhirRelay_CL".to_string()),
            ..Default::default()
        };
        let sink = AzureMetricsSink::new(Arc::new(AzureLogger::new(&config).unwrap()), "FhirRelay");

        let mut metrics = JobMetrics::new();
        metrics.record_download(Duration::from_millis(3));
        metrics.record_attempt(Duration::from_millis(10), 2);
        metrics.record_attempt(Duration::from_millis(10), 0);

        let rows = sink.to_log_records(&metrics.finish(&job(), Utc::now()), &job());
        assert_eq!(rows.len(), 3);

        let error_count = rows.iter().find(|r| r.stage == ERROR_COUNT).unwrap();
        assert_eq!(error_count.operation_type, "FhirRelay.errorCount");
        assert_eq!(error_count.count, 2);
        assert_eq!(error_count.cx_id, "cx1");
    }
}
