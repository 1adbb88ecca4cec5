//! FHIR client trait definition
//!
//! Abstracts batch submission so the retry controller can be driven against
//! a real server or a scripted fake.

use crate::domain::{Bundle, CxId, FhirError};
use crate::logging::JobLogger;
use async_trait::async_trait;

/// Submits batch transactions to a tenant-scoped FHIR endpoint
#[async_trait]
pub trait FhirClient: Send + Sync {
    /// Submit `bundle` as one batch transaction for `tenant`
    ///
    /// Returns the server's response bundle, which holds one entry per
    /// submitted entry in submission order. Well-formed 4xx bundle responses
    /// are returned rather than raised so their entries can be evaluated.
    ///
    /// # Errors
    ///
    /// Returns a `FhirError` once network-level retries are exhausted or on a
    /// non-retryable transport failure.
    async fn execute_batch(
        &self,
        tenant: &CxId,
        bundle: &Bundle,
        log: &JobLogger,
    ) -> Result<Bundle, FhirError>;
}
