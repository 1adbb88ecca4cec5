//! Application-level retry of batch transactions
//!
//! A batch is resubmitted in full while its response still contains failing
//! entries, up to a fixed number of submissions. The loop is modelled as an
//! explicit [`RetryState`] machine; [`RetryController`] only performs the
//! submissions and feeds their outcome into [`RetryState::transition`].

use super::evaluate::{evaluate, Evaluation};
use crate::adapters::fhir::FhirClient;
use crate::core::metrics::JobMetrics;
use crate::domain::{Bundle, CxId, RelayError, Result};
use crate::logging::JobLogger;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Submission ceiling unless configured otherwise
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Where one job's batch submission loop stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// About to submit; `attempts` submissions made so far
    Attempting { attempts: u32 },
    /// A submission returned; `failures` entries did not succeed
    Evaluating { attempts: u32, failures: usize },
    /// The last submission had no failing entries
    Done { attempts: u32 },
    /// Failures persisted through the final allowed submission
    Exhausted { attempts: u32 },
}

/// Input to [`RetryState::transition`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryEvent {
    /// A submission completed with `failures` failing entries
    Submitted { failures: usize },
    /// The evaluation of the last submission is complete
    Evaluated,
}

impl RetryState {
    pub fn start() -> Self {
        RetryState::Attempting { attempts: 0 }
    }

    /// Next state for `event`, given a ceiling of `max_attempts` submissions
    ///
    /// Events that do not apply to the current state leave it unchanged.
    pub fn transition(self, event: RetryEvent, max_attempts: u32) -> Self {
        match (self, event) {
            (RetryState::Attempting { attempts }, RetryEvent::Submitted { failures }) => {
                RetryState::Evaluating {
                    attempts: attempts + 1,
                    failures,
                }
            }
            (RetryState::Evaluating { attempts, failures: 0 }, RetryEvent::Evaluated) => {
                RetryState::Done { attempts }
            }
            (RetryState::Evaluating { attempts, .. }, RetryEvent::Evaluated) => {
                if attempts < max_attempts {
                    RetryState::Attempting { attempts }
                } else {
                    RetryState::Exhausted { attempts }
                }
            }
            (state, _) => state,
        }
    }

    pub fn attempts(&self) -> u32 {
        match *self {
            RetryState::Attempting { attempts }
            | RetryState::Evaluating { attempts, .. }
            | RetryState::Done { attempts }
            | RetryState::Exhausted { attempts } => attempts,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RetryState::Done { .. } | RetryState::Exhausted { .. })
    }
}

/// Drives batch submissions for one job
#[derive(Clone)]
pub struct RetryController {
    client: Arc<dyn FhirClient>,
    max_attempts: u32,
    attempt_delay: Duration,
}

impl RetryController {
    pub fn new(client: Arc<dyn FhirClient>, max_attempts: u32, attempt_delay: Duration) -> Self {
        Self {
            client,
            max_attempts: max_attempts.max(1),
            attempt_delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Submit `bundle` for `tenant` until it succeeds or the ceiling is hit
    ///
    /// Each submission is recorded in `metrics`. Returns the number of
    /// submissions made.
    ///
    /// # Errors
    ///
    /// Returns `TooManyErrors` when failures persist through the last allowed
    /// submission, or `Fhir` when the client gives up on a transport failure.
    pub async fn run(
        &self,
        tenant: &CxId,
        bundle: &Bundle,
        metrics: &mut JobMetrics,
        log: &JobLogger,
    ) -> Result<u32> {
        let mut state = RetryState::start();
        let mut last = Evaluation::default();

        loop {
            state = match state {
                RetryState::Attempting { attempts } => {
                    if attempts > 0 && !self.attempt_delay.is_zero() {
                        tokio::time::sleep(self.attempt_delay).await;
                    }

                    let started = Instant::now();
                    let response = self.client.execute_batch(tenant, bundle, log).await?;
                    let elapsed = started.elapsed();

                    last = evaluate(bundle, &response);
                    metrics.record_attempt(elapsed, last.failure_count());

                    state.transition(
                        RetryEvent::Submitted {
                            failures: last.failure_count(),
                        },
                        self.max_attempts,
                    )
                }
                RetryState::Evaluating { attempts, failures } => {
                    if let Some(first) = last.failures.first() {
                        tracing::warn!(
                            parent: log.span(),
                            attempt = attempts,
                            max_attempts = self.max_attempts,
                            failures,
                            total_failures = metrics.failed_entries(),
                            first_failure = %first,
                            "Batch response contains failing entries"
                        );
                        for failure in last.failures.iter().skip(1) {
                            tracing::debug!(parent: log.span(), failure = %failure, "Failing entry");
                        }
                    }
                    state.transition(RetryEvent::Evaluated, self.max_attempts)
                }
                RetryState::Done { attempts } => {
                    tracing::info!(
                        parent: log.span(),
                        attempts,
                        entries = bundle.len(),
                        "Batch transaction succeeded"
                    );
                    return Ok(attempts);
                }
                RetryState::Exhausted { attempts } => {
                    tracing::error!(
                        parent: log.span(),
                        attempts,
                        max_attempts = self.max_attempts,
                        failures = last.failure_count(),
                        "Giving up on batch transaction"
                    );
                    return Err(RelayError::TooManyErrors {
                        count: attempts,
                        max_retries: self.max_attempts,
                    });
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BundleEntry, BundleEntryResponse, FhirError};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    #[test]
    fn test_clean_submission_is_done() {
        let state = RetryState::start()
            .transition(RetryEvent::Submitted { failures: 0 }, 10)
            .transition(RetryEvent::Evaluated, 10);
        assert_eq!(state, RetryState::Done { attempts: 1 });
    }

    #[test]
    fn test_failures_below_ceiling_resubmit() {
        let state = RetryState::start()
            .transition(RetryEvent::Submitted { failures: 2 }, 10)
            .transition(RetryEvent::Evaluated, 10);
        assert_eq!(state, RetryState::Attempting { attempts: 1 });
    }

    #[test]
    fn test_failures_at_ceiling_exhaust() {
        let state = RetryState::Attempting { attempts: 9 }
            .transition(RetryEvent::Submitted { failures: 1 }, 10)
            .transition(RetryEvent::Evaluated, 10);
        assert_eq!(state, RetryState::Exhausted { attempts: 10 });
        assert!(state.is_terminal());
    }

    #[test]
    fn test_terminal_states_ignore_events() {
        let done = RetryState::Done { attempts: 3 };
        assert_eq!(done.transition(RetryEvent::Submitted { failures: 1 }, 10), done);
        assert_eq!(done.transition(RetryEvent::Evaluated, 10), done);
    }

    #[test]
    fn test_never_exceeds_ceiling() {
        let mut state = RetryState::start();
        let mut submissions = 0;
        while !state.is_terminal() {
            if let RetryState::Attempting { .. } = state {
                submissions += 1;
                state = state.transition(RetryEvent::Submitted { failures: 1 }, 10);
            } else {
                state = state.transition(RetryEvent::Evaluated, 10);
            }
        }
        assert_eq!(submissions, 10);
        assert_eq!(state, RetryState::Exhausted { attempts: 10 });
    }

    /// Answers each submission with the next scripted list of statuses
    struct ScriptedClient {
        script: Mutex<Vec<Vec<&'static str>>>,
        calls: Mutex<u32>,
    }

    impl ScriptedClient {
        fn new(script: Vec<Vec<&'static str>>) -> Self {
            Self {
                script: Mutex::new(script),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl FhirClient for ScriptedClient {
        async fn execute_batch(
            &self,
            _tenant: &CxId,
            _bundle: &Bundle,
            _log: &JobLogger,
        ) -> std::result::Result<Bundle, FhirError> {
            *self.calls.lock().unwrap() += 1;
            let mut script = self.script.lock().unwrap();
            let statuses = if script.len() > 1 {
                script.remove(0)
            } else {
                script[0].clone()
            };
            Ok(Bundle::new(
                "batch-response",
                statuses
                    .into_iter()
                    .map(|s| BundleEntry {
                        response: Some(BundleEntryResponse::with_status(s)),
                        ..Default::default()
                    })
                    .collect(),
            ))
        }
    }

    fn bundle() -> Bundle {
        Bundle::new(
            "batch",
            (0..3)
                .map(|i| BundleEntry::from_resource(json!({"resourceType": "Observation", "id": i.to_string()})))
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_controller_retries_until_clean() {
        let client = Arc::new(ScriptedClient::new(vec![
            vec!["200 OK", "500 Internal Server Error", "201 Created"],
            vec!["200 OK", "200 OK", "200 OK"],
        ]));
        let controller = RetryController::new(client.clone(), 10, Duration::ZERO);
        let mut metrics = JobMetrics::new();

        let attempts = controller
            .run(&CxId::new("cx1").unwrap(), &bundle(), &mut metrics, &JobLogger::detached())
            .await
            .unwrap();

        assert_eq!(attempts, 2);
        assert_eq!(client.calls(), 2);
        assert_eq!(metrics.attempts(), 2);
        assert_eq!(metrics.failed_entries(), 1);
    }

    #[tokio::test]
    async fn test_controller_raises_too_many_errors() {
        let client = Arc::new(ScriptedClient::new(vec![vec!["200 OK", "400 Bad Request", "200 OK"]]));
        let controller = RetryController::new(client.clone(), 10, Duration::ZERO);
        let mut metrics = JobMetrics::new();

        let err = controller
            .run(&CxId::new("cx1").unwrap(), &bundle(), &mut metrics, &JobLogger::detached())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RelayError::TooManyErrors {
                count: 10,
                max_retries: 10
            }
        ));
        assert_eq!(client.calls(), 10);
    }

    #[tokio::test]
    async fn test_short_response_counts_as_failure() {
        let client = Arc::new(ScriptedClient::new(vec![vec!["200 OK"]]));
        let controller = RetryController::new(client.clone(), 2, Duration::ZERO);
        let mut metrics = JobMetrics::new();

        let err = controller
            .run(&CxId::new("cx1").unwrap(), &bundle(), &mut metrics, &JobLogger::detached())
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::TooManyErrors { count: 2, .. }));
        assert_eq!(metrics.failed_entries(), 4);
    }
}
