//! Job processor - runs one job through every pipeline stage
//!
//! fetch → normalize → submit/evaluate (retry controller) → report metrics.
//! Any failure is wrapped in `RelayError::Job` carrying the stage it came
//! from; metrics are reported only for jobs that succeed.

use super::fetch::ContentFetcher;
use super::normalize::normalize_bundle;
use super::retry::RetryController;
use crate::core::metrics::{JobMetrics, MetricsRecord, MetricsSink};
use crate::domain::{JobReference, RelayError, Result, Stage};
use crate::log_stage_complete;
use crate::logging::JobLogger;
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Outcome of a successfully processed job
#[derive(Debug, Clone, PartialEq)]
pub struct JobOutcome {
    /// Batch submissions made
    pub attempts: u32,
    /// Entries in the submitted bundle
    pub entries: usize,
    /// Metrics reported for the job
    pub metrics: MetricsRecord,
    /// Wall-clock time spent on the job
    pub duration: Duration,
}

/// Runs the pipeline stages for one job at a time
#[derive(Clone)]
pub struct JobProcessor {
    fetcher: ContentFetcher,
    controller: RetryController,
    metrics_sink: Arc<dyn MetricsSink>,
}

impl JobProcessor {
    pub fn new(
        fetcher: ContentFetcher,
        controller: RetryController,
        metrics_sink: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            fetcher,
            controller,
            metrics_sink,
        }
    }

    /// Process `job`
    ///
    /// # Errors
    ///
    /// Returns `RelayError::Job` with the failing stage and the original
    /// cause. Metrics sink failures do not fail the job.
    pub async fn process(&self, job: &JobReference, log: &JobLogger) -> Result<JobOutcome> {
        let started = Instant::now();
        let mut metrics = JobMetrics::new();
        let fail = |stage: Stage, source: RelayError| RelayError::job(stage, job.label(), source);

        tracing::info!(parent: log.span(), "Processing job");

        let download_started = Instant::now();
        let raw = self
            .fetcher
            .fetch(&job.location, log)
            .await
            .map_err(|e| fail(Stage::Download, e.into()))?;
        let download = download_started.elapsed();
        metrics.record_download(download);
        log_stage_complete!(log.span(), Stage::Download.as_str(), download);

        let bundle = normalize_bundle(&raw, &job.patient_id).map_err(|e| fail(Stage::Normalize, e))?;
        drop(raw);
        tracing::debug!(parent: log.span(), entries = bundle.len(), "Bundle normalized");

        let attempts = self
            .controller
            .run(&job.cx_id, &bundle, &mut metrics, log)
            .await
            .map_err(|e| fail(Stage::Upsert, e))?;
        log_stage_complete!(log.span(), Stage::Upsert.as_str(), metrics.upsert_duration());

        let record = metrics.finish(job, Utc::now());
        if let Err(e) = self.metrics_sink.report(&record, job).await {
            tracing::warn!(parent: log.span(), error = %e, "Failed to report job metrics");
        }

        let duration = started.elapsed();
        tracing::info!(
            parent: log.span(),
            attempts,
            entries = bundle.len(),
            duration_ms = duration.as_millis() as u64,
            "Job completed"
        );

        Ok(JobOutcome {
            attempts,
            entries: bundle.len(),
            metrics: record,
            duration,
        })
    }
}
