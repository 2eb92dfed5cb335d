//! Configuration for blob storage backends.

use std::env;
use std::sync::Arc;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::blobs::local_store::LocalDiskBlobStore;
use crate::blobs::mock_store::MockBlobStore;
use crate::blobs::BlobStore;
use crate::errors::GalleryError;

/// Available blob storage backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlobBackend {
    LocalDisk,
    Mock,
}

impl Default for BlobBackend {
    fn default() -> Self {
        BlobBackend::LocalDisk
    }
}

impl std::str::FromStr for BlobBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "localdisk" | "local" | "disk" => Ok(BlobBackend::LocalDisk),
            "mock" => Ok(BlobBackend::Mock),
            _ => Err(format!("Unknown blob backend: {}", s)),
        }
    }
}

/// Configuration for blob storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobConfig {
    pub backend: BlobBackend,
    pub base_path: String,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            backend: BlobBackend::default(),
            base_path: "./data/blobs".to_string(),
        }
    }
}

impl BlobConfig {
    /// Create a blob configuration from environment variables, falling
    /// back to defaults with a warning.
    pub fn from_env() -> Self {
        let backend = match env::var("BLOB_BACKEND") {
            Ok(backend_str) => match backend_str.parse::<BlobBackend>() {
                Ok(backend) => {
                    info!("Using blob backend from environment: {:?}", backend);
                    backend
                }
                Err(e) => {
                    warn!(
                        "Invalid blob backend in environment: {}. Using default LocalDisk.",
                        e
                    );
                    BlobBackend::default()
                }
            },
            Err(_) => {
                info!("No blob backend specified in environment, using default LocalDisk");
                BlobBackend::default()
            }
        };
        let base_path =
            env::var("BLOB_DIRECTORY").unwrap_or_else(|_| BlobConfig::default().base_path);
        Self { backend, base_path }
    }

    /// Create a blob store instance based on the configuration.
    pub fn create_store(&self) -> Result<Arc<dyn BlobStore>, GalleryError> {
        match self.backend {
            BlobBackend::LocalDisk => {
                info!("Creating local-disk blob store at {}", self.base_path);
                Ok(Arc::new(LocalDiskBlobStore::open(&self.base_path)?))
            }
            BlobBackend::Mock => {
                info!("Creating mock blob store");
                Ok(Arc::new(MockBlobStore::new()))
            }
        }
    }
}
