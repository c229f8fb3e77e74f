//! S3-backed [`BlobStore`].

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use chrono::DateTime;

use crate::storage::{BlobStore, BlobStoreError, ObjectSummary};

/// Stores archived build logs in one S3 bucket.
pub struct S3BlobStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3BlobStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), BlobStoreError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| BlobStoreError::Backend(format!("{}", DisplayErrorContext(e))))?;
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>, BlobStoreError> {
        let response = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                let service_err = err.into_service_error();
                return if service_err.is_no_such_key() {
                    Err(BlobStoreError::NotFound(key.to_string()))
                } else {
                    Err(BlobStoreError::Backend(format!(
                        "{}",
                        DisplayErrorContext(service_err)
                    )))
                };
            }
        };

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| BlobStoreError::Backend(e.to_string()))?;
        Ok(bytes.into_bytes().to_vec())
    }

    async fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectSummary>, BlobStoreError> {
        let response = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .send()
            .await
            .map_err(|e| BlobStoreError::Backend(format!("{}", DisplayErrorContext(e))))?;

        Ok(response
            .contents()
            .iter()
            .map(|object| ObjectSummary {
                key: object.key().unwrap_or_default().to_string(),
                size: object.size().unwrap_or(0),
                last_modified: object
                    .last_modified()
                    .and_then(|t| DateTime::from_timestamp(t.secs(), t.subsec_nanos())),
            })
            .collect())
    }
}
