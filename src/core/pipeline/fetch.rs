//! Content fetcher
//!
//! Reads raw bundle bytes from a [`BlobStore`], retrying transient storage
//! failures. Missing objects and access errors are returned on first sight.

use crate::adapters::retry::{retry_with_backoff, RetryPolicy};
use crate::adapters::storage::BlobStore;
use crate::domain::{BlobLocation, StorageError};
use crate::logging::JobLogger;
use std::sync::Arc;

/// Attempts made by the fetcher unless configured otherwise
pub const DEFAULT_FETCH_ATTEMPTS: u32 = 3;

/// Fetches bundle content with bounded retry
#[derive(Clone)]
pub struct ContentFetcher {
    store: Arc<dyn BlobStore>,
    policy: RetryPolicy,
}

impl ContentFetcher {
    pub fn new(store: Arc<dyn BlobStore>, policy: RetryPolicy) -> Self {
        Self { store, policy }
    }

    /// Fetch the object at `location`
    ///
    /// # Errors
    ///
    /// Returns the last `StorageError` unchanged once attempts are exhausted,
    /// or the first non-transient error.
    pub async fn fetch(
        &self,
        location: &BlobLocation,
        log: &JobLogger,
    ) -> Result<Vec<u8>, StorageError> {
        tracing::debug!(
            parent: log.span(),
            provider = self.store.provider_name(),
            "Fetching bundle"
        );

        let bytes = retry_with_backoff(&self.policy, log, StorageError::is_transient, || {
            self.store.get(&location.bucket, &location.key)
        })
        .await?;

        tracing::debug!(parent: log.span(), size = bytes.len(), "Bundle fetched");
        Ok(bytes)
    }
}
