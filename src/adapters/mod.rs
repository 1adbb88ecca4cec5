//! External system integrations for the relay.
//!
//! This module provides adapters for the systems the pipeline talks to:
//!
//! - [`queue`] - Inbound queue event envelope and message parsing
//! - [`storage`] - Blob stores holding converted bundles (trait-based)
//! - [`fhir`] - FHIR server batch transactions (trait-based)
//! - [`retry`] - Bounded exponential backoff shared by the network adapters
//!
//! # Design Pattern
//!
//! Adapters follow the **Adapter Pattern** to isolate external dependencies and
//! enable testing with fake implementations. The pipeline depends only on the
//! [`storage::BlobStore`] and [`fhir::FhirClient`] traits.
//!
//! ```rust,no_run
//! use fhir_relay::adapters::fhir::HttpFhirClient;
//! use fhir_relay::adapters::storage::create_blob_store;
//! use fhir_relay::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("fhir-relay.toml")?;
//! let store = create_blob_store(&config.storage)?;
//! let client = HttpFhirClient::new(&config.fhir)?;
//! # Ok(())
//! # }
//! ```

pub mod fhir;
pub mod queue;
pub mod retry;
pub mod storage;
