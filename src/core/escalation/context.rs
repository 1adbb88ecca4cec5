//! Error context sent to the capture service

use crate::domain::{JobReference, RelayError, Stage};
use serde::Serialize;
use std::error::Error as _;
use std::fmt;

/// Capture severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured description of a failure or anomaly
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorContext {
    pub message: String,
    /// Chain of underlying causes, outermost first
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    pub stage: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cx_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub invocation_id: String,
    pub level: Severity,
}

impl ErrorContext {
    /// Context for an invocation-level event not tied to a job
    pub fn new(
        message: impl Into<String>,
        stage: Stage,
        invocation_id: impl Into<String>,
        level: Severity,
    ) -> Self {
        Self {
            message: message.into(),
            cause: None,
            stage: stage.as_str().to_string(),
            cx_id: None,
            patient_id: None,
            job_id: None,
            bucket: None,
            key: None,
            invocation_id: invocation_id.into(),
            level,
        }
    }

    /// Context for a fatal error, with the cause chain of `error`
    pub fn from_error(error: &RelayError, stage: Stage, invocation_id: impl Into<String>) -> Self {
        let mut context = Self::new(error.to_string(), stage, invocation_id, Severity::Error);
        context.cause = cause_chain(error);
        context
    }

    /// Attach the identity of `job`
    pub fn with_job(mut self, job: &JobReference) -> Self {
        self.cx_id = Some(job.cx_id.to_string());
        self.patient_id = Some(job.patient_id.to_string());
        self.job_id = job.job_id.as_ref().map(|id| id.to_string());
        self.bucket = Some(job.location.bucket.clone());
        self.key = Some(job.location.key.clone());
        self
    }
}

fn cause_chain(error: &RelayError) -> Option<String> {
    let mut causes = Vec::new();
    let mut source = error.source();
    while let Some(cause) = source {
        causes.push(cause.to_string());
        source = cause.source();
    }

    if causes.is_empty() {
        None
    } else {
        Some(causes.join(": "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BlobLocation, CxId, JobId, PatientId, StorageError};

    #[test]
    fn test_from_job_error_keeps_cause_and_identity() {
        let job = JobReference::new(
            CxId::new("cx1").unwrap(),
            PatientId::new("pat1").unwrap(),
            BlobLocation::new("bucket1", "patientA.json"),
        )
        .with_job_id(JobId::new("job-1").unwrap());

        let error = RelayError::job(
            Stage::Download,
            job.label(),
            StorageError::Transient("503".to_string()).into(),
        );
        let context = ErrorContext::from_error(&error, Stage::Download, "inv-1").with_job(&job);

        assert_eq!(context.stage, "download");
        assert_eq!(context.level, Severity::Error);
        assert_eq!(context.job_id.as_deref(), Some("job-1"));
        assert_eq!(context.key.as_deref(), Some("patientA.json"));
        assert!(context.cause.unwrap().contains("Transient storage failure: 503"));
    }

    #[test]
    fn test_serializes_camel_case_without_empty_fields() {
        let context = ErrorContext::new("2 records", Stage::Invocation, "inv-1", Severity::Warning);
        let value = serde_json::to_value(&context).unwrap();

        assert_eq!(value["invocationId"], "inv-1");
        assert_eq!(value["level"], "warning");
        assert!(value.get("cxId").is_none());
    }
}
