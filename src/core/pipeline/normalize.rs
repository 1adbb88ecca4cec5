//! Bundle normalizer
//!
//! Turns fetched bytes into a `batch` bundle scoped to one patient. Failures
//! here are deterministic and are never retried.

use crate::domain::{Bundle, BundleEntry, BundleEntryRequest, PatientId, RelayError, Result};
use serde_json::Value;

const BATCH: &str = "batch";

/// Parse `raw` into a batch bundle for `patient_id`
///
/// Entries keep their order. Each entry without a `request` is given one:
/// `PUT {type}/{id}` when the resource has an id, otherwise `POST {type}`.
/// Any `response` left over from an earlier run is dropped.
///
/// # Errors
///
/// Returns `MalformedBundle` if the bytes are not a JSON Bundle, an entry has
/// no typed resource, or a Patient resource belongs to another patient.
pub fn normalize_bundle(raw: &[u8], patient_id: &PatientId) -> Result<Bundle> {
    let value: Value = serde_json::from_slice(raw)
        .map_err(|e| RelayError::MalformedBundle(format!("Content is not valid JSON: {e}")))?;

    match value.get("resourceType").and_then(Value::as_str) {
        Some("Bundle") => {}
        Some(other) => {
            return Err(RelayError::MalformedBundle(format!(
                "Expected resourceType 'Bundle', found '{other}'"
            )))
        }
        None => {
            return Err(RelayError::MalformedBundle(
                "Content has no resourceType".to_string(),
            ))
        }
    }

    let mut bundle: Bundle = serde_json::from_value(value)
        .map_err(|e| RelayError::MalformedBundle(format!("Invalid bundle structure: {e}")))?;

    for (index, entry) in bundle.entry.iter_mut().enumerate() {
        normalize_entry(index, entry, patient_id)?;
    }

    bundle.bundle_type = Some(BATCH.to_string());
    Ok(bundle)
}

fn normalize_entry(index: usize, entry: &mut BundleEntry, patient_id: &PatientId) -> Result<()> {
    let resource = entry
        .resource
        .as_ref()
        .filter(|r| r.is_object())
        .ok_or_else(|| {
            RelayError::MalformedBundle(format!("Entry {index} has no resource object"))
        })?;

    let resource_type = resource
        .get("resourceType")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            RelayError::MalformedBundle(format!("Entry {index} resource has no resourceType"))
        })?
        .to_string();

    let id = entry.resource_id().map(str::to_string);

    if resource_type == "Patient" {
        if let Some(ref id) = id {
            if id != patient_id.as_str() {
                return Err(RelayError::MalformedBundle(format!(
                    "Entry {index} is Patient/{id}, expected Patient/{patient_id}"
                )));
            }
        }
    }

    if entry.request.is_none() {
        entry.request = Some(match id {
            Some(id) => BundleEntryRequest::new("PUT", format!("{resource_type}/{id}")),
            None => BundleEntryRequest::new("POST", resource_type),
        });
    }
    entry.response = None;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn patient() -> PatientId {
        PatientId::new("pat1").unwrap()
    }

    fn normalize(value: Value) -> Result<Bundle> {
        normalize_bundle(value.to_string().as_bytes(), &patient())
    }

    #[test]
    fn test_builds_batch_requests() {
        let bundle = normalize(json!({
            "resourceType": "Bundle",
            "type": "collection",
            "entry": [
                {"resource": {"resourceType": "Patient", "id": "pat1"}},
                {"resource": {"resourceType": "Observation"}},
                {
                    "resource": {"resourceType": "Condition", "id": "c1"},
                    "request": {"method": "POST", "url": "Condition"}
                }
            ]
        }))
        .unwrap();

        assert_eq!(bundle.bundle_type.as_deref(), Some("batch"));
        assert_eq!(
            bundle.entry[0].request,
            Some(BundleEntryRequest::new("PUT", "Patient/pat1"))
        );
        assert_eq!(
            bundle.entry[1].request,
            Some(BundleEntryRequest::new("POST", "Observation"))
        );
        assert_eq!(
            bundle.entry[2].request,
            Some(BundleEntryRequest::new("POST", "Condition"))
        );
    }

    #[test]
    fn test_strips_previous_responses() {
        let bundle = normalize(json!({
            "resourceType": "Bundle",
            "entry": [{
                "resource": {"resourceType": "Observation", "id": "o1"},
                "response": {"status": "500"}
            }]
        }))
        .unwrap();

        assert!(bundle.entry[0].response.is_none());
    }

    #[test]
    fn test_bundle_without_entries_is_allowed() {
        let bundle = normalize(json!({"resourceType": "Bundle"})).unwrap();
        assert!(bundle.is_empty());
    }

    #[test]
    fn test_rejects_foreign_patient() {
        let err = normalize(json!({
            "resourceType": "Bundle",
            "entry": [{"resource": {"resourceType": "Patient", "id": "someone-else"}}]
        }))
        .unwrap_err();

        assert!(matches!(err, RelayError::MalformedBundle(_)));
    }

    #[test]
    fn test_rejects_non_bundle_resource() {
        let err = normalize(json!({"resourceType": "Patient", "id": "pat1"})).unwrap_err();
        assert!(err.to_string().contains("Expected resourceType 'Bundle'"));
    }

    #[test]
    fn test_rejects_entry_without_resource() {
        let err = normalize(json!({
            "resourceType": "Bundle",
            "entry": [{"fullUrl": "urn:uuid:1"}]
        }))
        .unwrap_err();

        assert!(matches!(err, RelayError::MalformedBundle(_)));
    }

    #[test]
    fn test_rejects_untyped_resource() {
        let err = normalize(json!({
            "resourceType": "Bundle",
            "entry": [{"resource": {"id": "x"}}]
        }))
        .unwrap_err();

        assert!(matches!(err, RelayError::MalformedBundle(_)));
    }

    #[test]
    fn test_rejects_invalid_json() {
        let err = normalize_bundle(b"{not json", &patient()).unwrap_err();
        assert!(matches!(err, RelayError::MalformedBundle(_)));
    }
}
