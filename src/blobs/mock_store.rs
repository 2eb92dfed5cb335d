//! In-memory implementation of the BlobStore trait for testing.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::blobs::BlobStore;
use crate::errors::GalleryError;

/// Mock implementation of BlobStore.
pub struct MockBlobStore {
    blobs: Mutex<HashMap<String, (Vec<u8>, String)>>,
}

impl MockBlobStore {
    /// Create a new empty mock blob store.
    pub fn new() -> Self {
        Self {
            blobs: Mutex::new(HashMap::new()),
        }
    }

    /// Number of blobs currently stored.
    pub fn blob_count(&self) -> usize {
        self.blobs.lock().unwrap().len()
    }

    /// Whether a blob exists for `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.blobs.lock().unwrap().contains_key(key)
    }
}

impl Default for MockBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlobStore for MockBlobStore {
    fn put(&self, key: &str, content: &[u8], content_type: &str) -> Result<(), GalleryError> {
        let mut blobs = self.blobs.lock().unwrap();
        blobs.insert(key.to_string(), (content.to_vec(), content_type.to_string()));
        Ok(())
    }

    fn get(&self, key: &str) -> Result<(Vec<u8>, String), GalleryError> {
        let blobs = self.blobs.lock().unwrap();
        blobs
            .get(key)
            .cloned()
            .ok_or_else(|| GalleryError::not_found("blob", key))
    }

    fn delete(&self, key: &str) -> Result<(), GalleryError> {
        let mut blobs = self.blobs.lock().unwrap();
        blobs.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_blob_store_basic_operations() {
        let store = MockBlobStore::new();
        assert_eq!(store.blob_count(), 0);

        store.put("k1", b"data", "image/png").unwrap();
        assert!(store.contains("k1"));

        let (content, content_type) = store.get("k1").unwrap();
        assert_eq!(content, b"data");
        assert_eq!(content_type, "image/png");

        store.delete("k1").unwrap();
        assert!(!store.contains("k1"));
        assert!(store.get("k1").is_err());

        // idempotent delete
        store.delete("k1").unwrap();
    }
}
