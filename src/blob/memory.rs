use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use crate::blob::BlobStore;
use crate::error::BlobError;

#[derive(Debug, Clone, PartialEq)]
pub struct StoredBlob {
    pub body: Bytes,
    pub content_type: String,
}

/// Process-local blob store. URLs take the form `memory://<bucket>/<key>`.
#[derive(Debug)]
pub struct MemoryBlobStore {
    bucket: String,
    objects: RwLock<HashMap<String, StoredBlob>>,
}

impl MemoryBlobStore {
    pub fn new(bucket: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            objects: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, key: &str) -> Option<StoredBlob> {
        self.objects.read().await.get(key).cloned()
    }

    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<String, BlobError> {
        self.objects.write().await.insert(
            key.to_string(),
            StoredBlob {
                body,
                content_type: content_type.to_string(),
            },
        );
        Ok(self.url_for(key))
    }

    async fn delete_object(&self, key: &str) -> Result<(), BlobError> {
        self.objects.write().await.remove(key);
        Ok(())
    }

    fn url_for(&self, key: &str) -> String {
        format!("memory://{}/{}", self.bucket, key)
    }
}
