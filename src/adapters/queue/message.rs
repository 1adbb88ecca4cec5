//! Queue event envelope
//!
//! An invocation delivers `{"Records": [...]}`; each record carries a JSON
//! body naming the stored bundle and string message attributes naming the
//! tenant and patient.

use crate::domain::{BlobLocation, CxId, JobId, JobReference, PatientId, RelayError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// One invocation's worth of queue records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<QueueRecord>,
}

impl QueueEvent {
    /// Parse an event from its JSON text
    ///
    /// # Errors
    ///
    /// Returns a `QueueMessage` error if the text is not a valid envelope
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| RelayError::QueueMessage(format!("Invalid queue event: {e}")))
    }
}

/// A single queued message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueRecord {
    #[serde(default)]
    pub message_id: Option<String>,

    #[serde(default)]
    pub body: String,

    #[serde(default)]
    pub message_attributes: HashMap<String, MessageAttribute>,
}

impl QueueRecord {
    /// Build a record with string attributes
    pub fn new(body: impl Into<String>, attributes: &[(&str, &str)]) -> Self {
        Self {
            message_id: None,
            body: body.into(),
            message_attributes: attributes
                .iter()
                .map(|(name, value)| (name.to_string(), MessageAttribute::string(*value)))
                .collect(),
        }
    }

    /// String value of attribute `name`, if present and non-blank
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.message_attributes
            .get(name)
            .and_then(|attr| attr.string_value.as_deref())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    fn required_attribute(&self, name: &str) -> Result<&str> {
        self.attribute(name).ok_or_else(|| {
            RelayError::QueueMessage(format!("Missing required message attribute '{name}'"))
        })
    }
}

/// Typed message attribute
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageAttribute {
    #[serde(default)]
    pub string_value: Option<String>,

    #[serde(default)]
    pub data_type: Option<String>,
}

impl MessageAttribute {
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            string_value: Some(value.into()),
            data_type: Some("String".to_string()),
        }
    }
}

/// Parsed message body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueBody {
    pub s3_bucket_name: String,
    pub s3_file_name: String,
}

/// Parse a message body, requiring the bucket and file name as non-empty strings
///
/// Unknown fields are ignored.
///
/// # Errors
///
/// Returns a `QueueMessage` error if the body is not a JSON object or either
/// field is missing, not a string, or empty.
pub fn parse_body(raw: &str) -> Result<QueueBody> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| RelayError::QueueMessage(format!("Message body is not JSON: {e}")))?;

    let object = value
        .as_object()
        .ok_or_else(|| RelayError::QueueMessage("Message body must be a JSON object".to_string()))?;

    let field = |name: &str| -> Result<String> {
        match object.get(name) {
            Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
            Some(Value::String(_)) => Err(RelayError::QueueMessage(format!(
                "Message body field '{name}' is empty"
            ))),
            Some(_) => Err(RelayError::QueueMessage(format!(
                "Message body field '{name}' must be a string"
            ))),
            None => Err(RelayError::QueueMessage(format!(
                "Message body is missing '{name}'"
            ))),
        }
    };

    Ok(QueueBody {
        s3_bucket_name: field("s3BucketName")?,
        s3_file_name: field("s3FileName")?,
    })
}

impl JobReference {
    /// Build a job reference from a queue record
    ///
    /// # Errors
    ///
    /// Returns a `QueueMessage` error if the body is invalid, `cxId` or
    /// `patientId` is missing, or `startedAt` is not an RFC 3339 timestamp.
    pub fn from_record(record: &QueueRecord) -> Result<Self> {
        let body = parse_body(&record.body)?;

        let cx_id = CxId::new(record.required_attribute("cxId")?).map_err(RelayError::QueueMessage)?;
        let patient_id = PatientId::new(record.required_attribute("patientId")?)
            .map_err(RelayError::QueueMessage)?;

        let mut job = JobReference::new(
            cx_id,
            patient_id,
            BlobLocation::new(body.s3_bucket_name, body.s3_file_name),
        );

        if let Some(job_id) = record.attribute("jobId") {
            job = job.with_job_id(JobId::new(job_id).map_err(RelayError::QueueMessage)?);
        }

        if let Some(started_at) = record.attribute("startedAt") {
            let parsed = DateTime::parse_from_rfc3339(started_at).map_err(|e| {
                RelayError::QueueMessage(format!("Invalid startedAt '{started_at}': {e}"))
            })?;
            job = job.with_started_at(parsed.with_timezone(&Utc));
        }

        Ok(job)
    }
}
