//! FHIR bundle model
//!
//! Only the parts of a Bundle the relay reads or writes are typed; everything
//! else is carried through untouched in `extra`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A FHIR Bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    /// Always `"Bundle"`
    pub resource_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Bundle type (`batch`, `batch-response`, `collection`, ...)
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub bundle_type: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entry: Vec<BundleEntry>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Bundle {
    /// Creates a bundle of the given type holding `entry`
    pub fn new(bundle_type: impl Into<String>, entry: Vec<BundleEntry>) -> Self {
        Self {
            resource_type: "Bundle".to_string(),
            id: None,
            bundle_type: Some(bundle_type.into()),
            entry,
            extra: Map::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entry.is_empty()
    }
}

/// One entry of a bundle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<BundleEntryRequest>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<BundleEntryResponse>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BundleEntry {
    /// Creates an entry wrapping `resource`
    pub fn from_resource(resource: Value) -> Self {
        Self {
            resource: Some(resource),
            ..Default::default()
        }
    }

    /// Response status line, if the server returned one
    pub fn status(&self) -> Option<&str> {
        self.response.as_ref().and_then(|r| r.status.as_deref())
    }

    /// An entry succeeded only if it carries a 2xx status.
    /// A missing response counts as a failure.
    pub fn is_success(&self) -> bool {
        self.status()
            .map(|status| status.trim_start().starts_with('2'))
            .unwrap_or(false)
    }

    /// `resourceType` of the wrapped resource
    pub fn resource_type(&self) -> Option<&str> {
        self.resource
            .as_ref()
            .and_then(|r| r.get("resourceType"))
            .and_then(Value::as_str)
    }

    /// `id` of the wrapped resource
    pub fn resource_id(&self) -> Option<&str> {
        self.resource
            .as_ref()
            .and_then(|r| r.get("id"))
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
    }
}

/// Request half of a batch entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleEntryRequest {
    pub method: String,
    pub url: String,
}

impl BundleEntryRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
        }
    }
}

/// Response half of a batch-response entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntryResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,

    /// OperationOutcome describing the entry's failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Value>,
}

impl BundleEntryResponse {
    pub fn with_status(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            ..Default::default()
        }
    }

    /// First diagnostics or details text from the OperationOutcome
    pub fn diagnostics(&self) -> Option<String> {
        let issues = self.outcome.as_ref()?.get("issue")?.as_array()?;
        issues.iter().find_map(|issue| {
            issue
                .get("diagnostics")
                .and_then(Value::as_str)
                .or_else(|| {
                    issue
                        .get("details")
                        .and_then(|d| d.get("text"))
                        .and_then(Value::as_str)
                })
                .map(str::to_string)
        })
    }
}
