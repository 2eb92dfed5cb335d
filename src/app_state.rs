//! Application State Management
//!
//! This module provides the application state that contains the gallery
//! service and its store dependencies, following the dependency
//! injection pattern: handles are constructed once at startup and passed
//! by reference, never reached through module globals.

use std::sync::Arc;

use log::info;

use crate::blobs::mock_store::MockBlobStore;
use crate::config::AppConfig;
use crate::errors::GalleryError;
use crate::metadata::mock_store::MockMetadataStore;
use crate::service::GalleryService;

/// Application state containing the gallery service and configuration.
#[derive(Clone)]
pub struct AppState {
    pub gallery: GalleryService,
    pub config: AppConfig,
}

impl AppState {
    /// Create application state from configuration.
    pub fn from_config(config: AppConfig) -> Result<Self, GalleryError> {
        info!("Initializing application state with configuration");
        let metadata = config.metadata.create_store()?;
        let blobs = config.blobs.create_store()?;
        info!("Application state initialized successfully");
        Ok(Self {
            gallery: GalleryService::new(metadata, blobs),
            config,
        })
    }

    /// Create application state for testing with mock backends.
    pub fn new_for_testing() -> Self {
        let config = AppConfig::default();
        let gallery = GalleryService::new(
            Arc::new(MockMetadataStore::new()),
            Arc::new(MockBlobStore::new()),
        );
        Self { gallery, config }
    }
}
