//! Local directory blob store
//!
//! Maps `bucket/key` onto `{root}/{bucket}/{key}`. Used for replaying
//! converted bundles from disk and in tests.

use super::traits::BlobStore;
use crate::domain::StorageError;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

/// Blob store backed by a local directory
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolves `bucket/key` below the root, refusing paths that escape it
    fn resolve(&self, bucket: &str, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(bucket).join(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if bucket.is_empty() || key.is_empty() || escapes {
            return Err(StorageError::Rejected(format!(
                "Invalid object path: {bucket}/{key}"
            )));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(bucket, key)?;
        let location = format!("{bucket}/{key}");

        tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound(location),
            ErrorKind::PermissionDenied => StorageError::AccessDenied(location),
            _ => StorageError::Transient(format!("{location}: {e}")),
        })
    }

    fn provider_name(&self) -> &'static str {
        "local"
    }
}
