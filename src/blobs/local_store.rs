//! Local-disk blob storage implementation.
//!
//! One file per blob key under a base directory; the content type lives
//! in a `.ctype` sidecar next to the blob. Key components map directly
//! to path components, so keys must not contain traversal segments.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::blobs::{BlobStore, DEFAULT_CONTENT_TYPE};
use crate::errors::GalleryError;

/// Local-disk implementation of BlobStore.
pub struct LocalDiskBlobStore {
    base_path: PathBuf,
}

impl LocalDiskBlobStore {
    /// Open the store, creating the base directory if needed.
    pub fn open(base_path: impl AsRef<Path>) -> Result<Self, GalleryError> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path).map_err(|e| GalleryError::unavailable("open", e))?;
        info!("Using blob storage directory: {}", base_path.display());
        Ok(Self { base_path })
    }

    fn blob_path(&self, key: &str) -> Result<PathBuf, GalleryError> {
        if key.is_empty() {
            return Err(GalleryError::validation("blob key must not be empty"));
        }
        let mut path = self.base_path.clone();
        for component in key.split('/') {
            // keys are opaque strings, not paths: refuse anything that
            // would escape the base directory
            if component.is_empty() || component == "." || component == ".." {
                return Err(GalleryError::validation(format!(
                    "invalid blob key component in {key:?}"
                )));
            }
            path.push(component);
        }
        Ok(path)
    }

    fn sidecar_path(path: &Path) -> PathBuf {
        PathBuf::from(format!("{}.ctype", path.display()))
    }
}

impl BlobStore for LocalDiskBlobStore {
    fn put(&self, key: &str, content: &[u8], content_type: &str) -> Result<(), GalleryError> {
        let path = self.blob_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| GalleryError::unavailable("put", e))?;
        }
        fs::write(&path, content).map_err(|e| GalleryError::unavailable("put", e))?;
        fs::write(Self::sidecar_path(&path), content_type)
            .map_err(|e| GalleryError::unavailable("put", e))?;
        info!("Stored blob {} ({} bytes)", key, content.len());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<(Vec<u8>, String), GalleryError> {
        let path = self.blob_path(key)?;
        let content = fs::read(&path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                GalleryError::not_found("blob", key)
            } else {
                GalleryError::unavailable("get", e)
            }
        })?;
        let content_type = match fs::read_to_string(Self::sidecar_path(&path)) {
            Ok(ct) => ct,
            Err(e) => {
                // a blob without its sidecar is still retrievable
                warn!("No content-type sidecar for blob {}: {}", key, e);
                DEFAULT_CONTENT_TYPE.to_string()
            }
        };
        Ok((content, content_type))
    }

    fn delete(&self, key: &str) -> Result<(), GalleryError> {
        let path = self.blob_path(key)?;
        for target in [&path, &Self::sidecar_path(&path)] {
            if let Err(e) = fs::remove_file(target) {
                if e.kind() != io::ErrorKind::NotFound {
                    return Err(GalleryError::unavailable("delete", e));
                }
            }
        }
        Ok(())
    }
}
