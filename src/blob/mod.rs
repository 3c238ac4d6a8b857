//! Blob storage for uploaded case documents.
//!
//! Objects are written under caller-chosen keys and addressed afterwards by
//! the durable URL the backend reports.

#[cfg(feature = "aws")]
pub mod s3;
pub mod memory;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::BlobError;

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write `body` under `key`, replacing any existing object, and return
    /// the object's URL.
    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<String, BlobError>;

    /// Remove the object under `key`. Deleting a missing key succeeds.
    async fn delete_object(&self, key: &str) -> Result<(), BlobError>;

    /// URL an object under `key` is (or would be) served from.
    fn url_for(&self, key: &str) -> String;
}
