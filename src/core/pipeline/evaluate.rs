//! Partial-failure evaluation of batch responses
//!
//! A response entry succeeded only if its status starts with `2`. An entry
//! without a response, or a submitted entry the server never answered, is a
//! failure.

use crate::domain::{Bundle, BundleEntry};
use std::fmt;

/// Entries of `response` that did not succeed, with their positions
pub fn errors_from_response(response: &Bundle) -> Vec<(usize, &BundleEntry)> {
    response
        .entry
        .iter()
        .enumerate()
        .filter(|(_, entry)| !entry.is_success())
        .collect()
}

/// One failing entry of a batch response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFailure {
    /// Position in the submitted bundle
    pub index: usize,
    /// Response status, `None` when absent
    pub status: Option<String>,
    /// `resourceType` of the submitted resource
    pub resource_type: Option<String>,
    /// OperationOutcome diagnostics, if the server supplied any
    pub diagnostics: Option<String>,
}

impl fmt::Display for EntryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "entry {} ({}): {}",
            self.index,
            self.resource_type.as_deref().unwrap_or("unknown"),
            self.status.as_deref().unwrap_or("no response")
        )?;
        if let Some(ref diagnostics) = self.diagnostics {
            write!(f, " - {diagnostics}")?;
        }
        Ok(())
    }
}

/// Result of evaluating one submission
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evaluation {
    pub failures: Vec<EntryFailure>,
}

impl Evaluation {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }
}

/// Evaluate `response` against the bundle that was `submitted`
///
/// Submitted entries beyond the end of the response count as failures with
/// no status.
pub fn evaluate(submitted: &Bundle, response: &Bundle) -> Evaluation {
    let resource_type_at = |index: usize| {
        submitted
            .entry
            .get(index)
            .and_then(BundleEntry::resource_type)
            .map(str::to_string)
    };

    let mut failures: Vec<EntryFailure> = errors_from_response(response)
        .into_iter()
        .map(|(index, entry)| EntryFailure {
            index,
            status: entry.status().map(str::to_string),
            resource_type: resource_type_at(index),
            diagnostics: entry.response.as_ref().and_then(|r| r.diagnostics()),
        })
        .collect();

    failures.extend(
        (response.len()..submitted.len()).map(|index| EntryFailure {
            index,
            status: None,
            resource_type: resource_type_at(index),
            diagnostics: None,
        }),
    );

    Evaluation { failures }
}
