//! Gallery service layer composing the metadata store and the blob store.
//!
//! All the cross-store invariants live here: a photo becomes visible only
//! after both the blob write and the metadata write complete, every photo
//! operation checks ownership first, and deletion removes the blob before
//! the record that points at it.

use std::sync::Arc;

use chrono::Utc;
use log::{error, info, warn};
use uuid::Uuid;

use crate::blobs::BlobStore;
use crate::errors::GalleryError;
use crate::metadata::{MetadataStore, PhotoRecord, UserRecord};
use crate::service::auth::{self, UserContext};

const ALLOWED_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "bmp", "webp"];

/// Orchestration over the metadata and blob stores. Stateless across
/// requests; records are never cached here.
#[derive(Clone)]
pub struct GalleryService {
    metadata: Arc<dyn MetadataStore>,
    blobs: Arc<dyn BlobStore>,
}

impl GalleryService {
    pub fn new(metadata: Arc<dyn MetadataStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { metadata, blobs }
    }

    pub fn metadata(&self) -> &dyn MetadataStore {
        self.metadata.as_ref()
    }

    /// Create an account. Duplicate usernames fail with `Conflict`.
    pub fn register(
        &self,
        username: &str,
        password: &str,
        email: Option<String>,
    ) -> Result<UserRecord, GalleryError> {
        let username = username.trim();
        let password = password.trim();
        if username.is_empty() || password.is_empty() {
            return Err(GalleryError::validation(
                "username and password are required",
            ));
        }
        let record = UserRecord {
            username: username.to_string(),
            password_hash: auth::hash_password(password),
            email: email
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty()),
            created_at: Utc::now(),
        };
        self.metadata.create_user(&record)?;
        info!("Registered user {}", username);
        Ok(record)
    }

    /// Verify a username/password pair.
    pub fn verify_login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<UserContext, GalleryError> {
        auth::verify_credentials(self.metadata.as_ref(), username, password)
    }

    /// Store photo content and its record. The blob is written first: the
    /// record must never point at content that is not durably there.
    pub fn upload_photo(
        &self,
        owner: &str,
        original_filename: &str,
        content_type: &str,
        content: &[u8],
        tags: &str,
        description: &str,
    ) -> Result<PhotoRecord, GalleryError> {
        if content.is_empty() {
            return Err(GalleryError::validation("no data was uploaded"));
        }
        if !allowed_file(original_filename) {
            return Err(GalleryError::validation(format!(
                "file type not allowed: {original_filename}"
            )));
        }
        let filename = sanitize_filename(original_filename);
        let photo_id = Uuid::new_v4().to_string();
        let blob_key = format!("photos/{owner}/{photo_id}_{filename}");

        self.blobs.put(&blob_key, content, content_type)?;

        let record = PhotoRecord {
            photo_id,
            owner: owner.to_string(),
            filename,
            blob_key,
            tags: tags.trim().to_string(),
            description: description.trim().to_string(),
            uploaded_at: Utc::now(),
        };
        if let Err(e) = self.metadata.create_photo(&record) {
            // the blob is now orphaned; keys embed the photo id, so the
            // leaked content can never be served under another record
            warn!(
                "Metadata write failed after blob write, orphaned blob {}: {}",
                record.blob_key, e
            );
            return Err(e);
        }
        info!("Uploaded photo {} for user {}", record.photo_id, owner);
        Ok(record)
    }

    /// The requester's photos, newest first.
    pub fn list_photos(&self, requester: &UserContext) -> Result<Vec<PhotoRecord>, GalleryError> {
        self.metadata.list_photos_by_owner(&requester.username)
    }

    /// Substring search over the requester's photos. An empty query
    /// yields an empty result.
    pub fn search_photos(
        &self,
        requester: &UserContext,
        query: &str,
    ) -> Result<Vec<PhotoRecord>, GalleryError> {
        self.metadata
            .search_photos_by_owner(&requester.username, query.trim())
    }

    /// Fetch a photo the requester owns. A photo owned by someone else
    /// reads as absent.
    fn owned_photo(
        &self,
        requester: &UserContext,
        photo_id: &str,
    ) -> Result<PhotoRecord, GalleryError> {
        match self.metadata.get_photo(photo_id)? {
            Some(photo) if photo.owner == requester.username => Ok(photo),
            _ => Err(GalleryError::not_found("photo", photo_id)),
        }
    }

    /// Fetch photo content for download.
    pub fn download_photo(
        &self,
        requester: &UserContext,
        photo_id: &str,
    ) -> Result<(PhotoRecord, Vec<u8>, String), GalleryError> {
        let photo = self.owned_photo(requester, photo_id)?;
        let (content, content_type) = self.blobs.get(&photo.blob_key)?;
        Ok((photo, content, content_type))
    }

    /// Remove a photo: blob first, then the record. A failed blob delete
    /// keeps the record pointing at the content; a failed record delete
    /// after the blob is gone leaves a dangling reference and is surfaced
    /// as an error, never retried silently.
    pub fn delete_photo(
        &self,
        requester: &UserContext,
        photo_id: &str,
    ) -> Result<(), GalleryError> {
        let photo = self.owned_photo(requester, photo_id)?;
        self.blobs.delete(&photo.blob_key)?;
        if let Err(e) = self.metadata.delete_photo(photo_id) {
            error!(
                "Blob {} deleted but record removal failed for photo {}: {}",
                photo.blob_key, photo_id, e
            );
            return Err(e);
        }
        info!("Deleted photo {} for user {}", photo_id, requester.username);
        Ok(())
    }
}

fn allowed_file(name: &str) -> bool {
    name.rsplit_once('.')
        .map(|(stem, ext)| !stem.is_empty() && ALLOWED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}
