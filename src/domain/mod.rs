//! Domain models and types for the relay.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`CxId`], [`PatientId`], [`JobId`])
//! - **Job model** ([`JobReference`], [`BlobLocation`])
//! - **FHIR bundle model** ([`Bundle`], [`BundleEntry`])
//! - **Error types** ([`RelayError`], [`StorageError`], [`FhirError`])
//! - **Result type alias** ([`Result`])
//!
//! # Type Safety
//!
//! Identifiers use the newtype pattern so a tenant ID can never be passed
//! where a patient ID is expected:
//!
//! ```rust
//! use fhir_relay::domain::{CxId, PatientId};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cx_id = CxId::new("cx1")?;
//! let patient_id = PatientId::new("pat1")?;
//!
//! // This won't compile
//! // let wrong: CxId = patient_id;
//! # Ok(())
//! # }
//! ```

pub mod bundle;
pub mod errors;
pub mod ids;
pub mod job;
pub mod result;

// Re-export commonly used types for convenience
pub use bundle::{Bundle, BundleEntry, BundleEntryRequest, BundleEntryResponse};
pub use errors::{FhirError, RelayError, Stage, StorageError};
pub use ids::{CxId, JobId, PatientId};
pub use job::{BlobLocation, JobReference};
pub use result::Result;
