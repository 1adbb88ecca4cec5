//! Domain error types
//!
//! This module defines the error hierarchy for the relay. All errors are
//! domain-specific and don't expose third-party types.

use std::fmt;
use thiserror::Error;

/// Main relay error type
///
/// This is the primary error type used throughout the application.
/// It wraps specific error types and provides context for error handling.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Malformed queue event, body or message attributes
    #[error("Invalid queue message: {0}")]
    QueueMessage(String),

    /// Blob storage errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Bundle content is not valid or not scoped to the job's patient
    #[error("Malformed bundle: {0}")]
    MalformedBundle(String),

    /// FHIR server transport errors
    #[error("FHIR server error: {0}")]
    Fhir(#[from] FhirError),

    /// Application-level failures persisted through every batch attempt
    #[error("Too many errors after {count} attempts (maxRetries={max_retries})")]
    TooManyErrors { count: u32, max_retries: u32 },

    /// Metrics or error-capture sink errors
    #[error("Reporting error: {0}")]
    Reporting(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// A job failed fatally; carries the stage and the original cause
    #[error("Job {job} failed during {stage}: {source}")]
    Job {
        stage: Stage,
        job: String,
        #[source]
        source: Box<RelayError>,
    },
}

impl RelayError {
    /// Wraps an error raised while processing a job
    pub fn job(stage: Stage, job: impl Into<String>, source: RelayError) -> Self {
        RelayError::Job {
            stage,
            job: job.into(),
            source: Box::new(source),
        }
    }

    /// Returns the innermost cause, unwrapping `Job` layers
    pub fn root_cause(&self) -> &RelayError {
        match self {
            RelayError::Job { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Blob storage errors
///
/// Only `Transient` is retried; every other variant is terminal.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    /// Object or container does not exist
    #[error("Object not found: {0}")]
    NotFound(String),

    /// Credentials rejected for the object
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// Any other client-side rejection of the request
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// Connection, timeout, throttling or server-side failure
    #[error("Transient storage failure: {0}")]
    Transient(String),
}

impl StorageError {
    /// Whether the failure may succeed on a later attempt
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::Transient(_))
    }
}

/// FHIR server errors
///
/// Errors that occur when submitting batch transactions. These errors don't
/// expose third-party HTTP client types.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FhirError {
    /// Failed to connect to the FHIR server
    #[error("Failed to connect to FHIR server: {0}")]
    ConnectionFailed(String),

    /// Request timeout
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Server error (5xx)
    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    /// Rate limit exceeded (429)
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// Client error (4xx) without a bundle body to evaluate
    #[error("Client error: {status} - {message}")]
    ClientError { status: u16, message: String },

    /// Response body was not a bundle
    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),
}

impl FhirError {
    /// Whether the network-level retry policy should try again
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FhirError::ConnectionFailed(_)
                | FhirError::Timeout(_)
                | FhirError::ServerError { .. }
                | FhirError::RateLimited(_)
        )
    }
}

/// Pipeline stage at which a failure occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Decoding the invocation event
    Invocation,
    /// Parsing a queue record into a job reference
    Parse,
    /// Fetching bundle bytes from blob storage
    Download,
    /// Parsing and scoping the bundle
    Normalize,
    /// Submitting batch transactions
    Upsert,
}

impl Stage {
    /// Stable identifier used in error context and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Invocation => "invocation",
            Stage::Parse => "parse",
            Stage::Download => "download",
            Stage::Normalize => "normalize",
            Stage::Upsert => "upsert",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for RelayError {
    fn from(err: std::io::Error) -> Self {
        RelayError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        RelayError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for RelayError {
    fn from(err: toml::de::Error) -> Self {
        RelayError::Configuration(format!("TOML parse error: {err}"))
    }
}
