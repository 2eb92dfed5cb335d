//! In-memory implementation of the MetadataStore trait for testing.

use std::sync::Mutex;

use crate::errors::GalleryError;
use crate::metadata::{
    MetadataStore, PhotoRecord, ScanPage, ScanToken, UpsertOutcome, UserRecord,
};

const SCAN_PAGE_SIZE: usize = 100;

/// Mock implementation of MetadataStore. Records are held in insertion
/// order, which is what the list/search tiebreak is defined over.
pub struct MockMetadataStore {
    users: Mutex<Vec<UserRecord>>,
    photos: Mutex<Vec<PhotoRecord>>,
}

impl MockMetadataStore {
    /// Create a new empty mock metadata store.
    pub fn new() -> Self {
        Self {
            users: Mutex::new(Vec::new()),
            photos: Mutex::new(Vec::new()),
        }
    }

    /// Clear all data from the store (useful for test cleanup).
    pub fn clear(&self) {
        self.users.lock().unwrap().clear();
        self.photos.lock().unwrap().clear();
    }

    /// Number of user records in the store.
    pub fn user_count(&self) -> usize {
        self.users.lock().unwrap().len()
    }

    /// Number of photo records in the store.
    pub fn photo_count(&self) -> usize {
        self.photos.lock().unwrap().len()
    }

    fn page<T: Clone>(records: &[T], token: Option<ScanToken>) -> ScanPage<T> {
        let start = token.map(|t| t.0 as usize).unwrap_or(0);
        let end = records.len().min(start + SCAN_PAGE_SIZE);
        let page: Vec<T> = records[start.min(records.len())..end].to_vec();
        let next = if end < records.len() {
            Some(ScanToken(end as i64))
        } else {
            None
        };
        ScanPage {
            records: page,
            next,
        }
    }
}

impl Default for MockMetadataStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataStore for MockMetadataStore {
    fn create_user(&self, user: &UserRecord) -> Result<(), GalleryError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.username == user.username) {
            return Err(GalleryError::conflict("user", &user.username));
        }
        users.push(user.clone());
        Ok(())
    }

    fn get_user(&self, username: &str) -> Result<Option<UserRecord>, GalleryError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.username == username).cloned())
    }

    fn upsert_user(&self, user: &UserRecord) -> Result<UpsertOutcome, GalleryError> {
        let mut users = self.users.lock().unwrap();
        if let Some(existing) = users.iter_mut().find(|u| u.username == user.username) {
            *existing = user.clone();
            Ok(UpsertOutcome::Replaced)
        } else {
            users.push(user.clone());
            Ok(UpsertOutcome::Inserted)
        }
    }

    fn scan_users(&self, token: Option<ScanToken>) -> Result<ScanPage<UserRecord>, GalleryError> {
        let users = self.users.lock().unwrap();
        Ok(Self::page(&users, token))
    }

    fn create_photo(&self, photo: &PhotoRecord) -> Result<(), GalleryError> {
        let mut photos = self.photos.lock().unwrap();
        if photos.iter().any(|p| p.photo_id == photo.photo_id) {
            return Err(GalleryError::conflict("photo", &photo.photo_id));
        }
        photos.push(photo.clone());
        Ok(())
    }

    fn get_photo(&self, photo_id: &str) -> Result<Option<PhotoRecord>, GalleryError> {
        let photos = self.photos.lock().unwrap();
        Ok(photos.iter().find(|p| p.photo_id == photo_id).cloned())
    }

    fn list_photos_by_owner(&self, owner: &str) -> Result<Vec<PhotoRecord>, GalleryError> {
        let photos = self.photos.lock().unwrap();
        let mut owned: Vec<PhotoRecord> =
            photos.iter().filter(|p| p.owner == owner).cloned().collect();
        owned.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(owned)
    }

    fn search_photos_by_owner(
        &self,
        owner: &str,
        query: &str,
    ) -> Result<Vec<PhotoRecord>, GalleryError> {
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let needle = query.to_lowercase();
        let photos = self.photos.lock().unwrap();
        let mut matched: Vec<PhotoRecord> = photos
            .iter()
            .filter(|p| {
                p.owner == owner
                    && (p.filename.to_lowercase().contains(&needle)
                        || p.tags.to_lowercase().contains(&needle)
                        || p.description.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(matched)
    }

    fn upsert_photo(&self, photo: &PhotoRecord) -> Result<UpsertOutcome, GalleryError> {
        let mut photos = self.photos.lock().unwrap();
        if let Some(existing) = photos.iter_mut().find(|p| p.photo_id == photo.photo_id) {
            *existing = photo.clone();
            Ok(UpsertOutcome::Replaced)
        } else {
            photos.push(photo.clone());
            Ok(UpsertOutcome::Inserted)
        }
    }

    fn scan_photos(&self, token: Option<ScanToken>) -> Result<ScanPage<PhotoRecord>, GalleryError> {
        let photos = self.photos.lock().unwrap();
        Ok(Self::page(&photos, token))
    }

    fn delete_photo(&self, photo_id: &str) -> Result<(), GalleryError> {
        let mut photos = self.photos.lock().unwrap();
        photos.retain(|p| p.photo_id != photo_id);
        Ok(())
    }
}
