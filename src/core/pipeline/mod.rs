//! Bundle upsert pipeline
//!
//! Stages, leaves first:
//! - [`fetch`] - read bundle bytes from blob storage with bounded retry
//! - [`normalize`] - parse and scope the bundle to the job's patient
//! - [`evaluate`] - classify batch response entries
//! - [`retry`] - resubmit the batch while entries keep failing
//! - [`processor`] - run one job through all stages and report its metrics
//! - [`invocation`] - process a queue event and escalate failures

pub mod evaluate;
pub mod fetch;
pub mod invocation;
pub mod normalize;
pub mod processor;
pub mod retry;

pub use evaluate::{errors_from_response, evaluate, EntryFailure, Evaluation};
pub use fetch::{ContentFetcher, DEFAULT_FETCH_ATTEMPTS};
pub use invocation::{InvocationHandler, InvocationSummary};
pub use normalize::normalize_bundle;
pub use processor::{JobOutcome, JobProcessor};
pub use retry::{RetryController, RetryEvent, RetryState, DEFAULT_MAX_ATTEMPTS};
