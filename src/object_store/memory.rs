use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{validate_bucket_name, validate_key, ObjectStore, ObjectStoreError};

struct Entry {
    bytes: Vec<u8>,
    #[allow(dead_code)]
    content_type: String,
}

/// In-memory object store used by unit and integration tests, standing
/// in for S3 behind the `ObjectStore` trait.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<(String, String), Entry>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, ObjectStoreError> {
        validate_bucket_name(bucket)?;
        validate_key(key)?;
        let objects = self.objects.read();
        objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|e| e.bytes.clone())
            .ok_or(ObjectStoreError::NotFound)
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
        allow_overwrite: bool,
    ) -> Result<(), ObjectStoreError> {
        validate_bucket_name(bucket)?;
        validate_key(key)?;
        let mut objects = self.objects.write();
        let map_key = (bucket.to_string(), key.to_string());
        if !allow_overwrite && objects.contains_key(&map_key) {
            return Err(ObjectStoreError::Exists);
        }
        objects.insert(
            map_key,
            Entry {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), ObjectStoreError> {
        validate_bucket_name(bucket)?;
        validate_key(key)?;
        let mut objects = self.objects.write();
        objects.remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store = MemoryObjectStore::new();
        store
            .put("my-bucket", "w0.csv", b"hello".to_vec(), "text/csv", true)
            .await
            .unwrap();
        let got = store.get("my-bucket", "w0.csv").await.unwrap();
        assert_eq!(got, b"hello");
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let store = MemoryObjectStore::new();
        let err = store.get("my-bucket", "missing.csv").await.unwrap_err();
        assert!(matches!(err, ObjectStoreError::NotFound));
    }

    #[tokio::test]
    async fn overwrite_forbidden_by_default_surfaces_exists() {
        let store = MemoryObjectStore::new();
        store
            .put("my-bucket", "w0.csv", b"a".to_vec(), "text/csv", true)
            .await
            .unwrap();
        let err = store
            .put("my-bucket", "w0.csv", b"b".to_vec(), "text/csv", false)
            .await
            .unwrap_err();
        assert!(matches!(err, ObjectStoreError::Exists));
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found() {
        let store = MemoryObjectStore::new();
        store
            .put("my-bucket", "w0.csv", b"a".to_vec(), "text/csv", true)
            .await
            .unwrap();
        store.delete("my-bucket", "w0.csv").await.unwrap();
        let err = store.get("my-bucket", "w0.csv").await.unwrap_err();
        assert!(matches!(err, ObjectStoreError::NotFound));
    }
}
