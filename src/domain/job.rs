//! Job reference domain model
//!
//! A job is one unit of work derived from one queue message: the tenant and
//! patient the bundle belongs to, and where the bundle is stored.

use super::ids::{CxId, JobId, PatientId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Location of a bundle in blob storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobLocation {
    /// Bucket or container name
    pub bucket: String,

    /// Object key within the bucket
    pub key: String,
}

impl BlobLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for BlobLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// Reference to one queued job
///
/// Immutable once parsed from the queue record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobReference {
    /// Tenant the bundle is upserted for
    pub cx_id: CxId,

    /// Patient every resource in the bundle belongs to
    pub patient_id: PatientId,

    /// Where the converted bundle is stored
    pub location: BlobLocation,

    /// Originating conversion job, if known
    pub job_id: Option<JobId>,

    /// When the originating job started, if known
    pub started_at: Option<DateTime<Utc>>,
}

impl JobReference {
    /// Create a new job reference without the optional origin fields
    pub fn new(cx_id: CxId, patient_id: PatientId, location: BlobLocation) -> Self {
        Self {
            cx_id,
            patient_id,
            location,
            job_id: None,
            started_at: None,
        }
    }

    /// Set the originating job ID
    pub fn with_job_id(mut self, job_id: JobId) -> Self {
        self.job_id = Some(job_id);
        self
    }

    /// Set the originating job start time
    pub fn with_started_at(mut self, started_at: DateTime<Utc>) -> Self {
        self.started_at = Some(started_at);
        self
    }

    /// Short label used when wrapping errors
    pub fn label(&self) -> String {
        match &self.job_id {
            Some(job_id) => format!("{job_id} ({}/{})", self.cx_id, self.patient_id),
            None => format!("{}/{}", self.cx_id, self.patient_id),
        }
    }

    /// Elapsed time since the originating job started
    ///
    /// Returns `None` when the job carries no start time. A start time in the
    /// future yields a zero duration.
    pub fn age_at(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.started_at
            .map(|started| (now - started).to_std().unwrap_or(Duration::ZERO))
    }
}
