// FHIR Relay - Queue-triggered FHIR bundle upsert worker
// Copyright (c) 2025 FHIR Relay Contributors
// Licensed under the MIT License

//! # FHIR Relay - queue-triggered FHIR bundle upsert
//!
//! FHIR Relay takes a queue message pointing at a converted FHIR bundle in
//! blob storage, fetches it, and upserts it into a FHIR server as a batch
//! transaction, resubmitting while entries keep failing.
//!
//! ## Overview
//!
//! For each queued job the pipeline:
//! - **Fetches** the bundle bytes with bounded retry on transient storage errors
//! - **Normalizes** them into a `batch` bundle scoped to the job's patient
//! - **Submits** the batch to the tenant's FHIR endpoint
//! - **Evaluates** every response entry and resubmits while any entry failed,
//!   up to a fixed number of attempts
//! - **Reports** download, upsert, attempt count and job age metrics
//!
//! Fatal failures are captured once with their job context and returned to
//! the hosting runtime, which redelivers the message.
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Pipeline stages, metrics and error escalation
//! - [`adapters`] - Queue, blob storage and FHIR server integrations
//! - [`domain`] - Core domain types and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and observability
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fhir_relay::config::load_config;
//! use fhir_relay::core::pipeline::InvocationHandler;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("fhir-relay.toml")?;
//!     let handler = InvocationHandler::from_config(&config)?;
//!
//!     let event = std::fs::read_to_string("event.json")?;
//!     let summary = handler.handle_raw(&event).await?;
//!
//!     println!("Processed {} job(s)", summary.jobs.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Custom collaborators
//!
//! Every external system sits behind a trait, so the pipeline can be wired
//! by hand with other implementations:
//!
//! ```rust,no_run
//! use fhir_relay::adapters::fhir::HttpFhirClient;
//! use fhir_relay::adapters::retry::RetryPolicy;
//! use fhir_relay::adapters::storage::LocalBlobStore;
//! use fhir_relay::config::FhirConfig;
//! use fhir_relay::core::escalation::LogErrorReporter;
//! use fhir_relay::core::metrics::LogMetricsSink;
//! use fhir_relay::core::pipeline::{
//!     ContentFetcher, InvocationHandler, JobProcessor, RetryController,
//! };
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # fn example() -> fhir_relay::domain::Result<()> {
//! let fetcher = ContentFetcher::new(
//!     Arc::new(LocalBlobStore::new("/var/lib/fhir-relay/bundles")),
//!     RetryPolicy::immediate(3),
//! );
//! let controller = RetryController::new(
//!     Arc::new(HttpFhirClient::new(&FhirConfig::default())?),
//!     10,
//!     Duration::ZERO,
//! );
//! let processor = JobProcessor::new(
//!     fetcher,
//!     controller,
//!     Arc::new(LogMetricsSink::new("FhirRelay", "fhir-relay")),
//! );
//! let handler = InvocationHandler::new(processor, Arc::new(LogErrorReporter));
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! The library uses [`domain::RelayError`] for all errors. A failed job is
//! reported as `RelayError::Job`, which names the failing stage and keeps the
//! original error as its source:
//!
//! ```rust
//! use fhir_relay::domain::{RelayError, Stage, StorageError};
//!
//! let error = RelayError::job(
//!     Stage::Download,
//!     "cx1/pat1",
//!     StorageError::NotFound("bucket1/patientA.json".to_string()).into(),
//! );
//! assert!(matches!(error.root_cause(), RelayError::Storage(_)));
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
