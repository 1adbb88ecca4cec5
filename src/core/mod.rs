//! Core business logic for the relay.
//!
//! - [`pipeline`] - fetch, normalize, submit, evaluate and retry one job
//! - [`metrics`] - per-job metrics aggregation and sinks
//! - [`escalation`] - error context and capture backends

pub mod escalation;
pub mod metrics;
pub mod pipeline;
