//! Per-job structured logger
//!
//! A [`JobLogger`] owns a span carrying the job's identity. It is created once
//! per job and handed by reference to each stage, which emits events with
//! `parent: log.span()` so every line is attributable to its job.

use crate::domain::JobReference;
use tracing::Span;

/// Structured logger bound to one job
#[derive(Debug, Clone)]
pub struct JobLogger {
    span: Span,
}

impl JobLogger {
    /// Create a logger for `job` within invocation `invocation_id`
    pub fn for_job(job: &JobReference, invocation_id: &str) -> Self {
        let span = tracing::info_span!(
            "job",
            invocation_id = %invocation_id,
            cx_id = %job.cx_id,
            patient_id = %job.patient_id,
            job_id = job.job_id.as_ref().map(|id| id.as_str()).unwrap_or("-"),
            bucket = %job.location.bucket,
            key = %job.location.key,
        );
        Self { span }
    }

    /// A logger without job context
    pub fn detached() -> Self {
        Self { span: Span::none() }
    }

    /// The job span; pass as `parent:` to tracing macros
    pub fn span(&self) -> &Span {
        &self.span
    }
}
