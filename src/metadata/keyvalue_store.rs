//! Key-value implementation of the MetadataStore trait.
//!
//! Users and photos live in two independently keyed item tables, natural
//! key to JSON item, with no secondary indexes. Per-owner listing and
//! search scan the whole photo table and filter in process — O(total
//! photos across all owners) per call, the accepted ceiling of this
//! backend.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use log::info;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::GalleryError;
use crate::metadata::{
    MetadataStore, PhotoRecord, ScanPage, ScanToken, UpsertOutcome, UserRecord,
};

const SCAN_PAGE_SIZE: i64 = 100;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Key-value implementation of MetadataStore.
pub struct KeyValueMetadataStore {
    conn: Mutex<Connection>,
}

impl KeyValueMetadataStore {
    /// Open (or create) the backing database and its item tables.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, GalleryError> {
        let conn = Connection::open(db_path.as_ref())
            .map_err(|e| GalleryError::unavailable("open", e))?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| GalleryError::unavailable("open", e))?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv_users (
                username TEXT PRIMARY KEY,
                item TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS kv_photos (
                photo_id TEXT PRIMARY KEY,
                item TEXT NOT NULL
            );",
        )
        .map_err(|e| GalleryError::unavailable("open", e))?;
        info!(
            "Opened key-value metadata store at {}",
            db_path.as_ref().display()
        );
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn encode<T: Serialize>(record: &T) -> Result<String, GalleryError> {
        serde_json::to_string(record).map_err(|e| GalleryError::unavailable("encode_item", e))
    }

    fn decode<T: DeserializeOwned>(item: &str) -> Result<T, GalleryError> {
        serde_json::from_str(item).map_err(|e| GalleryError::unavailable("decode_item", e))
    }

    fn create_item(
        &self,
        table: &str,
        entity: &'static str,
        key: &str,
        item: &str,
        operation: &'static str,
    ) -> Result<(), GalleryError> {
        let conn = self.conn.lock().unwrap();
        let sql = format!("INSERT INTO {table} VALUES (?1, ?2)");
        conn.execute(&sql, params![key, item]).map_err(|e| {
            if e.sqlite_error_code() == Some(rusqlite::ErrorCode::ConstraintViolation) {
                GalleryError::conflict(entity, key)
            } else {
                GalleryError::unavailable(operation, e)
            }
        })?;
        Ok(())
    }

    fn get_item(
        &self,
        table: &str,
        key_column: &str,
        key: &str,
        operation: &'static str,
    ) -> Result<Option<String>, GalleryError> {
        let conn = self.conn.lock().unwrap();
        let sql = format!("SELECT item FROM {table} WHERE {key_column} = ?1");
        conn.query_row(&sql, params![key], |row| row.get::<_, String>(0))
            .optional()
            .map_err(|e| GalleryError::unavailable(operation, e))
    }

    fn upsert_item(
        &self,
        table: &str,
        key_column: &str,
        key: &str,
        item: &str,
        operation: &'static str,
    ) -> Result<UpsertOutcome, GalleryError> {
        // the connection mutex serializes the exists check with the write
        let conn = self.conn.lock().unwrap();
        let exists_sql = format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE {key_column} = ?1)");
        let existed: bool = conn
            .query_row(&exists_sql, params![key], |row| row.get(0))
            .map_err(|e| GalleryError::unavailable(operation, e))?;
        let upsert_sql = format!(
            "INSERT INTO {table} VALUES (?1, ?2)
             ON CONFLICT({key_column}) DO UPDATE SET item = excluded.item"
        );
        conn.execute(&upsert_sql, params![key, item])
            .map_err(|e| GalleryError::unavailable(operation, e))?;
        Ok(if existed {
            UpsertOutcome::Replaced
        } else {
            UpsertOutcome::Inserted
        })
    }

    fn scan_table<T: DeserializeOwned>(
        &self,
        table: &str,
        token: Option<ScanToken>,
        operation: &'static str,
    ) -> Result<ScanPage<T>, GalleryError> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT rowid, item FROM {table} WHERE rowid > ?1 ORDER BY rowid LIMIT ?2"
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| GalleryError::unavailable(operation, e))?;
        let start = token.map(|t| t.0).unwrap_or(0);
        let rows = stmt
            .query_map(params![start, SCAN_PAGE_SIZE], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|e| GalleryError::unavailable(operation, e))?;

        let mut records = Vec::new();
        let mut last_rowid = start;
        for row in rows {
            let (rowid, item) = row.map_err(|e| GalleryError::unavailable(operation, e))?;
            records.push(Self::decode(&item)?);
            last_rowid = rowid;
        }
        let next = if records.len() as i64 == SCAN_PAGE_SIZE {
            Some(ScanToken(last_rowid))
        } else {
            None
        };
        Ok(ScanPage { records, next })
    }

    /// Full photo-table load in insertion order, for the in-process
    /// list/search filters.
    fn load_all_photos(&self, operation: &'static str) -> Result<Vec<PhotoRecord>, GalleryError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT item FROM kv_photos ORDER BY rowid")
            .map_err(|e| GalleryError::unavailable(operation, e))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| GalleryError::unavailable(operation, e))?;
        let mut photos = Vec::new();
        for row in rows {
            let item = row.map_err(|e| GalleryError::unavailable(operation, e))?;
            photos.push(Self::decode(&item)?);
        }
        Ok(photos)
    }
}

impl MetadataStore for KeyValueMetadataStore {
    fn create_user(&self, user: &UserRecord) -> Result<(), GalleryError> {
        let item = Self::encode(user)?;
        self.create_item("kv_users", "user", &user.username, &item, "create_user")
    }

    fn get_user(&self, username: &str) -> Result<Option<UserRecord>, GalleryError> {
        match self.get_item("kv_users", "username", username, "get_user")? {
            Some(item) => Ok(Some(Self::decode(&item)?)),
            None => Ok(None),
        }
    }

    fn upsert_user(&self, user: &UserRecord) -> Result<UpsertOutcome, GalleryError> {
        let item = Self::encode(user)?;
        self.upsert_item("kv_users", "username", &user.username, &item, "upsert_user")
    }

    fn scan_users(&self, token: Option<ScanToken>) -> Result<ScanPage<UserRecord>, GalleryError> {
        self.scan_table("kv_users", token, "scan_users")
    }

    fn create_photo(&self, photo: &PhotoRecord) -> Result<(), GalleryError> {
        let item = Self::encode(photo)?;
        self.create_item("kv_photos", "photo", &photo.photo_id, &item, "create_photo")
    }

    fn get_photo(&self, photo_id: &str) -> Result<Option<PhotoRecord>, GalleryError> {
        match self.get_item("kv_photos", "photo_id", photo_id, "get_photo")? {
            Some(item) => Ok(Some(Self::decode(&item)?)),
            None => Ok(None),
        }
    }

    fn list_photos_by_owner(&self, owner: &str) -> Result<Vec<PhotoRecord>, GalleryError> {
        let mut photos = self.load_all_photos("list_photos_by_owner")?;
        photos.retain(|p| p.owner == owner);
        // stable sort: ties keep insertion (rowid) order
        photos.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(photos)
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
        let mut photos = self.load_all_photos("search_photos_by_owner")?;
        photos.retain(|p| {
            p.owner == owner
                && (p.filename.to_lowercase().contains(&needle)
                    || p.tags.to_lowercase().contains(&needle)
                    || p.description.to_lowercase().contains(&needle))
        });
        photos.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(photos)
    }

    fn upsert_photo(&self, photo: &PhotoRecord) -> Result<UpsertOutcome, GalleryError> {
        let item = Self::encode(photo)?;
        self.upsert_item(
            "kv_photos",
            "photo_id",
            &photo.photo_id,
            &item,
            "upsert_photo",
        )
    }

    fn scan_photos(&self, token: Option<ScanToken>) -> Result<ScanPage<PhotoRecord>, GalleryError> {
        self.scan_table("kv_photos", token, "scan_photos")
    }

    fn delete_photo(&self, photo_id: &str) -> Result<(), GalleryError> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM kv_photos WHERE photo_id = ?1", params![photo_id])
            .map_err(|e| GalleryError::unavailable("delete_photo", e))?;
        Ok(())
    }
}
