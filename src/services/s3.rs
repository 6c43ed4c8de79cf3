//! Amazon S3 adapter for [`ObjectStore`].

use super::ObjectStore;
use crate::error::Diagram2TfError;
use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::debug;

#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Client built from the default AWS credential and region chain.
    pub async fn from_env() -> Self {
        let aws_config = aws_config::load_from_env().await;
        Self::new(Client::new(&aws_config))
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, Diagram2TfError> {
        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| Diagram2TfError::StorageFetch {
                bucket: bucket.to_string(),
                key: key.to_string(),
                not_found: e
                    .as_service_error()
                    .map(|se| se.is_no_such_key())
                    .unwrap_or(false),
                reason: DisplayErrorContext(&e).to_string(),
            })?;

        let body = response
            .body
            .collect()
            .await
            .map_err(|e| Diagram2TfError::StorageFetch {
                bucket: bucket.to_string(),
                key: key.to_string(),
                not_found: false,
                reason: format!("body read failed: {e}"),
            })?;

        let bytes = body.into_bytes().to_vec();
        debug!("Fetched s3://{}/{} ({} bytes)", bucket, key, bytes.len());
        Ok(bytes)
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), Diagram2TfError> {
        let len = body.len();
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| Diagram2TfError::StorageWrite {
                bucket: bucket.to_string(),
                key: key.to_string(),
                reason: DisplayErrorContext(&e).to_string(),
            })?;

        debug!("Wrote s3://{}/{} ({} bytes)", bucket, key, len);
        Ok(())
    }
}
