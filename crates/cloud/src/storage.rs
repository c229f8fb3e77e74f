//! Command interface for the archive object store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Listing entry for one stored object.
#[derive(Debug, Clone, Serialize)]
pub struct ObjectSummary {
    pub key: String,
    pub size: i64,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Errors from the object store.
#[derive(Debug, thiserror::Error)]
pub enum BlobStoreError {
    #[error("Object '{0}' not found")]
    NotFound(String),

    #[error("Object storage error: {0}")]
    Backend(String),
}

/// Command interface to the object store. The bucket is construction-time
/// configuration of the implementation.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write (or overwrite) one object.
    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), BlobStoreError>;

    /// Read one object in full.
    async fn get_object(&self, key: &str) -> Result<Vec<u8>, BlobStoreError>;

    /// List objects under a key prefix.
    async fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectSummary>, BlobStoreError>;
}
