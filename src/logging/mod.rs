//! Logging and observability
//!
//! This module provides:
//! - Structured console and rotating JSON file logs ([`init_logging`])
//! - A per-job logger carrying job identity ([`JobLogger`])
//! - Azure Log Analytics ingestion ([`azure::AzureLogger`])
//!
//! # Example
//!
//! ```no_run
//! use fhir_relay::logging::init_logging;
//! use fhir_relay::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Relay started");
//! ```

pub mod azure;
pub mod job;
pub mod structured;

// Re-export commonly used items
pub use job::JobLogger;
pub use structured::{init_logging, LoggingGuard};

/// Log a retry attempt under a job span
///
/// # Example
///
/// ```no_run
/// use fhir_relay::log_retry_attempt;
/// use fhir_relay::logging::JobLogger;
///
/// let log = JobLogger::detached();
/// log_retry_attempt!(log.span(), 2, 3, 500u64, "connection reset");
/// ```
#[macro_export]
macro_rules! log_retry_attempt {
    ($span:expr, $attempt:expr, $max_attempts:expr, $delay_ms:expr, $reason:expr) => {
        tracing::warn!(
            parent: $span,
            attempt = $attempt,
            max_attempts = $max_attempts,
            delay_ms = $delay_ms,
            reason = %$reason,
            "Retrying operation"
        );
    };
}

/// Log the completion of a pipeline stage under a job span
///
/// # Example
///
/// ```no_run
/// use fhir_relay::log_stage_complete;
/// use fhir_relay::logging::JobLogger;
/// use std::time::Duration;
///
/// let log = JobLogger::detached();
/// log_stage_complete!(log.span(), "download", Duration::from_millis(42));
/// ```
#[macro_export]
macro_rules! log_stage_complete {
    ($span:expr, $stage:expr, $duration:expr) => {
        tracing::info!(
            parent: $span,
            stage = $stage,
            duration_ms = $duration.as_millis() as u64,
            "Stage completed"
        );
    };
}
