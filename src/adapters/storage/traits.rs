//! Blob store trait definition
//!
//! Abstracts the object store the converted bundles are read from, so the
//! pipeline can run against an S3-compatible HTTP endpoint in production and
//! a local directory or in-memory fake in tests.

use crate::domain::StorageError;
use async_trait::async_trait;

/// Read-only access to stored bundles
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Fetch the full content of `bucket/key`
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` when the object does not exist and
    /// `StorageError::Transient` for failures that may succeed on retry.
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Short provider name for logs
    fn provider_name(&self) -> &'static str;
}
