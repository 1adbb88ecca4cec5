//! In-memory collaborators for driving the pipeline end to end

#![allow(dead_code)]

use async_trait::async_trait;
use fhir_relay::adapters::fhir::FhirClient;
use fhir_relay::adapters::queue::{QueueEvent, QueueRecord};
use fhir_relay::adapters::retry::RetryPolicy;
use fhir_relay::adapters::storage::BlobStore;
use fhir_relay::core::escalation::{ErrorContext, ErrorReporter};
use fhir_relay::core::metrics::{MetricsRecord, MetricsSink};
use fhir_relay::core::pipeline::{ContentFetcher, InvocationHandler, JobProcessor, RetryController};
use fhir_relay::domain::{
    Bundle, BundleEntry, BundleEntryResponse, CxId, FhirError, JobReference, RelayError, Result,
    StorageError,
};
use fhir_relay::logging::JobLogger;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const BODY: &str = r#"{"s3BucketName":"bucket1","s3FileName":"patientA.json"}"#;

/// Blob store holding objects in memory, optionally failing the first calls
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    failures: Mutex<Vec<StorageError>>,
    calls: Mutex<u32>,
}

impl MemoryBlobStore {
    pub fn with_object(bucket: &str, key: &str, content: Vec<u8>) -> Self {
        let store = Self::default();
        store
            .objects
            .lock()
            .unwrap()
            .insert(format!("{bucket}/{key}"), content);
        store
    }

    /// Every call fails with `error` until `times` failures have been served
    pub fn failing(self, error: StorageError, times: usize) -> Self {
        *self.failures.lock().unwrap() = vec![error; times];
        self
    }

    pub fn calls(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, bucket: &str, key: &str) -> std::result::Result<Vec<u8>, StorageError> {
        *self.calls.lock().unwrap() += 1;
        if let Some(error) = self.failures.lock().unwrap().pop() {
            return Err(error);
        }

        let location = format!("{bucket}/{key}");
        self.objects
            .lock()
            .unwrap()
            .get(&location)
            .cloned()
            .ok_or(StorageError::NotFound(location))
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}

/// FHIR client answering each submission from a script; the last answer repeats
pub struct ScriptedFhirClient {
    script: Mutex<Vec<std::result::Result<Bundle, FhirError>>>,
    submissions: Mutex<Vec<(String, Bundle)>>,
}

impl ScriptedFhirClient {
    pub fn new(script: Vec<std::result::Result<Bundle, FhirError>>) -> Self {
        assert!(!script.is_empty());
        Self {
            script: Mutex::new(script),
            submissions: Mutex::new(Vec::new()),
        }
    }

    /// Answers every submission with `statuses`
    pub fn always(statuses: &[&str]) -> Self {
        Self::new(vec![Ok(response(statuses))])
    }

    pub fn calls(&self) -> usize {
        self.submissions.lock().unwrap().len()
    }

    pub fn submissions(&self) -> Vec<(String, Bundle)> {
        self.submissions.lock().unwrap().clone()
    }
}

#[async_trait]
impl FhirClient for ScriptedFhirClient {
    async fn execute_batch(
        &self,
        tenant: &CxId,
        bundle: &Bundle,
        _log: &JobLogger,
    ) -> std::result::Result<Bundle, FhirError> {
        self.submissions
            .lock()
            .unwrap()
            .push((tenant.to_string(), bundle.clone()));

        let mut script = self.script.lock().unwrap();
        if script.len() > 1 {
            script.remove(0)
        } else {
            script[0].clone()
        }
    }
}

/// Metrics sink remembering every report
#[derive(Default)]
pub struct RecordingMetricsSink {
    reports: Mutex<Vec<MetricsRecord>>,
    fail: bool,
}

impl RecordingMetricsSink {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn reports(&self) -> Vec<MetricsRecord> {
        self.reports.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetricsSink for RecordingMetricsSink {
    async fn report(&self, record: &MetricsRecord, _job: &JobReference) -> Result<()> {
        self.reports.lock().unwrap().push(record.clone());
        if self.fail {
            return Err(RelayError::Reporting("metrics backend down".to_string()));
        }
        Ok(())
    }
}

/// Error reporter remembering every capture
#[derive(Default)]
pub struct RecordingErrorReporter {
    captures: Mutex<Vec<ErrorContext>>,
}

impl RecordingErrorReporter {
    pub fn captures(&self) -> Vec<ErrorContext> {
        self.captures.lock().unwrap().clone()
    }
}

#[async_trait]
impl ErrorReporter for RecordingErrorReporter {
    async fn capture(&self, context: &ErrorContext) -> Result<()> {
        self.captures.lock().unwrap().push(context.clone());
        Ok(())
    }
}

/// Collaborators of one test pipeline
pub struct Harness {
    pub store: Arc<MemoryBlobStore>,
    pub client: Arc<ScriptedFhirClient>,
    pub metrics: Arc<RecordingMetricsSink>,
    pub reporter: Arc<RecordingErrorReporter>,
    pub handler: InvocationHandler,
}

impl Harness {
    pub fn new(store: MemoryBlobStore, client: ScriptedFhirClient) -> Self {
        Self::with_sink(store, client, RecordingMetricsSink::default())
    }

    pub fn with_sink(
        store: MemoryBlobStore,
        client: ScriptedFhirClient,
        sink: RecordingMetricsSink,
    ) -> Self {
        let store = Arc::new(store);
        let client = Arc::new(client);
        let metrics = Arc::new(sink);
        let reporter = Arc::new(RecordingErrorReporter::default());

        let processor = JobProcessor::new(
            ContentFetcher::new(store.clone(), RetryPolicy::immediate(3)),
            RetryController::new(client.clone(), 10, Duration::ZERO),
            metrics.clone(),
        );
        let handler = InvocationHandler::new(processor, reporter.clone());

        Self {
            store,
            client,
            metrics,
            reporter,
            handler,
        }
    }
}

/// A stored bundle with `entries` Observation resources and the patient
pub fn bundle_bytes(entries: usize) -> Vec<u8> {
    let mut entry = vec![json!({"resource": {"resourceType": "Patient", "id": "pat1"}})];
    entry.extend((1..entries).map(|i| {
        json!({
            "resource": {
                "resourceType": "Observation",
                "id": format!("obs-{i}"),
                "subject": {"reference": "Patient/pat1"}
            }
        })
    }));

    serde_json::to_vec(&json!({
        "resourceType": "Bundle",
        "type": "collection",
        "entry": entry
    }))
    .unwrap()
}

/// A batch-response with one entry per status; `"-"` means no response
pub fn response(statuses: &[&str]) -> Bundle {
    Bundle::new(
        "batch-response",
        statuses
            .iter()
            .map(|status| BundleEntry {
                response: (*status != "-").then(|| BundleEntryResponse::with_status(*status)),
                ..Default::default()
            })
            .collect(),
    )
}

pub fn record(body: &str, attributes: &[(&str, &str)]) -> QueueRecord {
    QueueRecord::new(body, attributes)
}

pub fn default_record() -> QueueRecord {
    record(BODY, &[("cxId", "cx1"), ("patientId", "pat1")])
}

pub fn event(records: Vec<QueueRecord>) -> QueueEvent {
    QueueEvent { records }
}
