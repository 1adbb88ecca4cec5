//! Blob storage adapters
//!
//! - [`HttpBlobStore`] reads from an S3-compatible HTTP endpoint
//! - [`LocalBlobStore`] reads from a local directory

pub mod http;
pub mod local;
pub mod traits;

pub use http::HttpBlobStore;
pub use local::LocalBlobStore;
pub use traits::BlobStore;

use crate::config::{StorageConfig, StorageProvider};
use crate::domain::{RelayError, Result};
use std::sync::Arc;

/// Create a blob store based on the configured provider
///
/// # Errors
///
/// Returns an error if the selected provider is missing required settings
pub fn create_blob_store(config: &StorageConfig) -> Result<Arc<dyn BlobStore>> {
    match config.provider {
        StorageProvider::Http => {
            tracing::info!("Creating HTTP blob store");
            Ok(Arc::new(HttpBlobStore::new(config)?) as Arc<dyn BlobStore>)
        }
        StorageProvider::Local => {
            let root = config.local_root.as_deref().ok_or_else(|| {
                RelayError::Configuration(
                    "storage.local_root is required when provider = 'local'".to_string(),
                )
            })?;

            tracing::info!(root = %root, "Creating local blob store");
            Ok(Arc::new(LocalBlobStore::new(root)) as Arc<dyn BlobStore>)
        }
    }
}
