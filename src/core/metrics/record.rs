//! Per-job metrics aggregation
//!
//! [`JobMetrics`] accumulates timings and counts while a job runs and turns
//! them into a [`MetricsRecord`] once the job finishes.

use crate::domain::JobReference;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Time spent reading the bundle from blob storage
pub const DOWNLOAD: &str = "download";
/// Time spent in batch submissions, summed across attempts
pub const UPSERT: &str = "upsert";
/// Number of batch submissions made
pub const ERROR_COUNT: &str = "errorCount";
/// Age of the originating job when this one finished
pub const JOB: &str = "job";

/// A single measurement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Duration {
        /// Milliseconds
        duration: u64,
        timestamp: DateTime<Utc>,
    },
    Count {
        count: u64,
        timestamp: DateTime<Utc>,
    },
}

impl MetricValue {
    pub fn duration(duration: Duration, timestamp: DateTime<Utc>) -> Self {
        MetricValue::Duration {
            duration: duration.as_millis() as u64,
            timestamp,
        }
    }

    pub fn count(count: u64, timestamp: DateTime<Utc>) -> Self {
        MetricValue::Count { count, timestamp }
    }

    /// Duration in milliseconds, for duration metrics
    pub fn duration_ms(&self) -> Option<u64> {
        match self {
            MetricValue::Duration { duration, .. } => Some(*duration),
            MetricValue::Count { .. } => None,
        }
    }

    /// Count, for count metrics
    pub fn count_value(&self) -> Option<u64> {
        match self {
            MetricValue::Count { count, .. } => Some(*count),
            MetricValue::Duration { .. } => None,
        }
    }
}

/// Metrics of one finished job, keyed by metric name
///
/// Serializes as a flat JSON object, e.g.
/// `{"download": {"duration": 12, "timestamp": "..."}, "errorCount": {"count": 1, ...}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MetricsRecord {
    values: BTreeMap<String, MetricValue>,
}

impl MetricsRecord {
    pub fn insert(&mut self, name: impl Into<String>, value: MetricValue) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&MetricValue> {
        self.values.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetricValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Running metrics for the job currently being processed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobMetrics {
    download: Option<Duration>,
    upsert: Duration,
    attempts: u32,
    failed_entries: u64,
}

impl JobMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_download(&mut self, duration: Duration) {
        self.download = Some(duration);
    }

    /// Record one batch submission and the failures it produced
    pub fn record_attempt(&mut self, duration: Duration, failures: usize) {
        self.attempts += 1;
        self.upsert += duration;
        self.failed_entries += failures as u64;
    }

    /// Submissions made so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Failing entries summed across all submissions
    pub fn failed_entries(&self) -> u64 {
        self.failed_entries
    }

    pub fn upsert_duration(&self) -> Duration {
        self.upsert
    }

    /// Build the record for `job`, stamped at `now`
    pub fn finish(&self, job: &JobReference, now: DateTime<Utc>) -> MetricsRecord {
        let mut record = MetricsRecord::default();

        if let Some(download) = self.download {
            record.insert(DOWNLOAD, MetricValue::duration(download, now));
        }
        record.insert(UPSERT, MetricValue::duration(self.upsert, now));
        record.insert(ERROR_COUNT, MetricValue::count(self.attempts as u64, now));
        if let Some(age) = job.age_at(now) {
            record.insert(JOB, MetricValue::duration(age, now));
        }

        record
    }
}
