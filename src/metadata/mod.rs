//! Metadata Storage Layer Abstraction
//!
//! This module provides an abstraction over metadata storage backends,
//! allowing the system to keep user and photo records in different
//! storage implementations (a key-value item store, a document-style
//! indexed store, an in-memory mock) without affecting higher-level
//! services. All backends must behave identically for identical inputs
//! over identical data; the migration utility depends on it.

pub mod config;
pub mod document_store;
pub mod keyvalue_store;
pub mod mock_store;

#[cfg(test)]
mod comprehensive_test;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::GalleryError;

/// A registered account. `username` is the natural primary key, set once
/// at registration and never changed; accounts are never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    pub password_hash: String,
    #[serde(default)]
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One uploaded photo. `photo_id` is the natural primary key; `blob_key`
/// embeds it, which makes the key unique by construction. `owner` carries
/// no enforced referential integrity against the user collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoRecord {
    pub photo_id: String,
    pub owner: String,
    pub filename: String,
    pub blob_key: String,
    pub tags: String,
    pub description: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Whether an upsert inserted a new record or replaced an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Replaced,
}

/// Continuation cursor for paginated full scans. Opaque to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanToken(pub(crate) i64);

/// One page of a full scan. A page without a `next` token ends the scan.
#[derive(Debug, Clone)]
pub struct ScanPage<T> {
    pub records: Vec<T>,
    pub next: Option<ScanToken>,
}

/// Trait defining the metadata storage interface.
pub trait MetadataStore: Send + Sync {
    /// Persist a new user atomically. Fails with `Conflict` if the
    /// username is already taken, leaving the store unchanged.
    fn create_user(&self, user: &UserRecord) -> Result<(), GalleryError>;

    /// Look up a user by username. Absent is `Ok(None)`, not an error.
    fn get_user(&self, username: &str) -> Result<Option<UserRecord>, GalleryError>;

    /// Insert-or-replace keyed by username. This is migration's write
    /// primitive; interactive registration must go through `create_user`
    /// so the conflict signal is not silently erased.
    fn upsert_user(&self, user: &UserRecord) -> Result<UpsertOutcome, GalleryError>;

    /// Paginated full scan of the user collection.
    fn scan_users(&self, token: Option<ScanToken>) -> Result<ScanPage<UserRecord>, GalleryError>;

    /// Persist a new photo. Fails with `Conflict` on a photo-id
    /// collision; random id generation makes that practically
    /// unreachable, but it is handled, not assumed impossible.
    fn create_photo(&self, photo: &PhotoRecord) -> Result<(), GalleryError>;

    /// Look up a photo by id. Absent is `Ok(None)`, not an error.
    fn get_photo(&self, photo_id: &str) -> Result<Option<PhotoRecord>, GalleryError>;

    /// All photos owned by `owner`, ordered by `uploaded_at` descending;
    /// ties keep insertion order.
    fn list_photos_by_owner(&self, owner: &str) -> Result<Vec<PhotoRecord>, GalleryError>;

    /// Case-insensitive substring match against filename, tags or
    /// description, same ordering as `list_photos_by_owner`. An empty
    /// query matches nothing, not everything.
    fn search_photos_by_owner(
        &self,
        owner: &str,
        query: &str,
    ) -> Result<Vec<PhotoRecord>, GalleryError>;

    /// Insert-or-replace keyed by photo id.
    fn upsert_photo(&self, photo: &PhotoRecord) -> Result<UpsertOutcome, GalleryError>;

    /// Paginated full scan of the photo collection.
    fn scan_photos(&self, token: Option<ScanToken>) -> Result<ScanPage<PhotoRecord>, GalleryError>;

    /// Delete a photo record. Deleting an absent id is a no-op.
    fn delete_photo(&self, photo_id: &str) -> Result<(), GalleryError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_user_record_round_trips_through_json() {
        let user = UserRecord {
            username: "alice".to_string(),
            password_hash: "deadbeef".to_string(),
            email: Some("alice@example.com".to_string()),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
        };
        let json = serde_json::to_string(&user).unwrap();
        let back: UserRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(user, back);
    }

    #[test]
    fn test_photo_record_round_trips_through_json() {
        let photo = PhotoRecord {
            photo_id: "p1".to_string(),
            owner: "alice".to_string(),
            filename: "cat.png".to_string(),
            blob_key: "photos/alice/p1_cat.png".to_string(),
            tags: "pet".to_string(),
            description: String::new(),
            uploaded_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
        };
        let json = serde_json::to_string(&photo).unwrap();
        let back: PhotoRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(photo, back);
    }

    #[test]
    fn test_user_record_email_defaults_to_none() {
        // items written without an email must still deserialize
        let json = r#"{"username":"bob","password_hash":"aa","created_at":"2024-05-01T12:30:00Z"}"#;
        let user: UserRecord = serde_json::from_str(json).unwrap();
        assert_eq!(user.email, None);
    }
}
