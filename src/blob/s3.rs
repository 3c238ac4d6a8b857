use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;

use crate::blob::BlobStore;
use crate::error::BlobError;

/// S3 bucket holding case documents.
pub struct S3BlobStore {
    client: Client,
    bucket: String,
    public_base_url: Option<String>,
}

impl S3BlobStore {
    pub fn new(client: Client, bucket: String, public_base_url: Option<String>) -> Self {
        Self {
            client,
            bucket,
            public_base_url,
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<String, BlobError> {
        tracing::debug!("PutObject s3://{}/{} ({} bytes)", self.bucket, key, body.len());
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| {
                BlobError::Backend(format!(
                    "PutObject {}/{} failed: {}",
                    self.bucket,
                    key,
                    DisplayErrorContext(&e)
                ))
            })?;
        Ok(self.url_for(key))
    }

    async fn delete_object(&self, key: &str) -> Result<(), BlobError> {
        tracing::debug!("DeleteObject s3://{}/{}", self.bucket, key);
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                BlobError::Backend(format!(
                    "DeleteObject {}/{} failed: {}",
                    self.bucket,
                    key,
                    DisplayErrorContext(&e)
                ))
            })?;
        Ok(())
    }

    fn url_for(&self, key: &str) -> String {
        match &self.public_base_url {
            Some(base) => format!("{base}/{key}"),
            None => format!("https://{}.s3.amazonaws.com/{}", self.bucket, key),
        }
    }
}
