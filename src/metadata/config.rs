//! Configuration for metadata storage backends.

use std::env;
use std::sync::Arc;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::errors::GalleryError;
use crate::metadata::document_store::DocumentMetadataStore;
use crate::metadata::keyvalue_store::KeyValueMetadataStore;
use crate::metadata::mock_store::MockMetadataStore;
use crate::metadata::MetadataStore;

/// Available metadata storage backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetadataBackend {
    KeyValue,
    Document,
    Mock,
}

impl Default for MetadataBackend {
    fn default() -> Self {
        MetadataBackend::KeyValue
    }
}

impl std::str::FromStr for MetadataBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "keyvalue" | "kv" => Ok(MetadataBackend::KeyValue),
            "document" | "doc" => Ok(MetadataBackend::Document),
            "mock" => Ok(MetadataBackend::Mock),
            _ => Err(format!("Unknown metadata backend: {}", s)),
        }
    }
}

/// Configuration for metadata storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataConfig {
    pub backend: MetadataBackend,
    pub db_path: String,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            backend: MetadataBackend::default(),
            db_path: "./data/metadata.sqlite".to_string(),
        }
    }
}

impl MetadataConfig {
    /// Create a metadata configuration from environment variables,
    /// falling back to defaults with a warning. Used by the server.
    pub fn from_env() -> Self {
        let backend = match env::var("METADATA_BACKEND") {
            Ok(backend_str) => match backend_str.parse::<MetadataBackend>() {
                Ok(backend) => {
                    info!("Using metadata backend from environment: {:?}", backend);
                    backend
                }
                Err(e) => {
                    warn!(
                        "Invalid metadata backend in environment: {}. Using default KeyValue.",
                        e
                    );
                    MetadataBackend::default()
                }
            },
            Err(_) => {
                info!("No metadata backend specified in environment, using default KeyValue");
                MetadataBackend::default()
            }
        };
        let db_path =
            env::var("METADATA_DB").unwrap_or_else(|_| MetadataConfig::default().db_path);
        Self { backend, db_path }
    }

    /// Create a metadata configuration from `{PREFIX}_METADATA_BACKEND`
    /// and `{PREFIX}_METADATA_DB`. Strict: a missing or invalid backend
    /// is an error, not a default. Used by the migration entry point,
    /// where a silently defaulted store could copy data the wrong way.
    pub fn from_env_prefixed(prefix: &str) -> Result<Self, GalleryError> {
        let backend_var = format!("{prefix}_METADATA_BACKEND");
        let backend_str = env::var(&backend_var)
            .map_err(|_| GalleryError::validation(format!("{backend_var} is not set")))?;
        let backend = backend_str
            .parse::<MetadataBackend>()
            .map_err(|e| GalleryError::validation(e))?;
        let db_var = format!("{prefix}_METADATA_DB");
        let db_path = match backend {
            // the mock keeps nothing on disk; a path is meaningless
            MetadataBackend::Mock => String::new(),
            _ => env::var(&db_var)
                .map_err(|_| GalleryError::validation(format!("{db_var} is not set")))?,
        };
        Ok(Self { backend, db_path })
    }

    /// Create a metadata store instance based on the configuration.
    pub fn create_store(&self) -> Result<Arc<dyn MetadataStore>, GalleryError> {
        match self.backend {
            MetadataBackend::KeyValue => {
                info!("Creating key-value metadata store at {}", self.db_path);
                Ok(Arc::new(KeyValueMetadataStore::open(&self.db_path)?))
            }
            MetadataBackend::Document => {
                info!("Creating document metadata store at {}", self.db_path);
                Ok(Arc::new(DocumentMetadataStore::open(&self.db_path)?))
            }
            MetadataBackend::Mock => {
                info!("Creating mock metadata store");
                Ok(Arc::new(MockMetadataStore::new()))
            }
        }
    }
}
