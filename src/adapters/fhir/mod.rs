//! FHIR server integration
//!
//! The [`FhirClient`] trait is what the pipeline depends on;
//! [`HttpFhirClient`] is the production implementation.

pub mod http;
pub mod traits;

pub use http::HttpFhirClient;
pub use traits::FhirClient;
