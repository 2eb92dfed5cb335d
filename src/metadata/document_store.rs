//! Document implementation of the MetadataStore trait.
//!
//! Users and photos live in two typed collections with declared
//! uniqueness constraints on the natural keys and a non-unique index on
//! `owner`. Per-owner listing is an indexed equality query with a native
//! descending sort; search is a logical OR of per-field case-insensitive
//! substring matches, all evaluated inside the database.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use log::info;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::errors::GalleryError;
use crate::metadata::{
    MetadataStore, PhotoRecord, ScanPage, ScanToken, UpsertOutcome, UserRecord,
};

const SCAN_PAGE_SIZE: i64 = 100;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS users (
    username TEXT PRIMARY KEY,
    password_hash TEXT NOT NULL,
    email TEXT,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS photos (
    photo_id TEXT PRIMARY KEY,
    owner TEXT NOT NULL,
    filename TEXT NOT NULL,
    blob_key TEXT NOT NULL,
    tags TEXT NOT NULL,
    description TEXT NOT NULL,
    uploaded_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_photos_owner ON photos(owner);";

const PHOTO_COLUMNS: &str = "photo_id, owner, filename, blob_key, tags, description, uploaded_at";

/// Timestamps are stored with fixed-width nanosecond precision so that
/// lexicographic order equals chronological order and values round-trip
/// exactly through migration.
fn timestamp_to_sql(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn timestamp_from_sql(text: &str, operation: &'static str) -> Result<DateTime<Utc>, GalleryError> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| GalleryError::unavailable(operation, e))
}

// raw column values; timestamps are parsed outside the row closure
type UserRow = (String, String, Option<String>, String);
type PhotoRow = (String, String, String, String, String, String, String);

fn user_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn photo_row(row: &Row<'_>) -> rusqlite::Result<PhotoRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn user_from_row(raw: UserRow, operation: &'static str) -> Result<UserRecord, GalleryError> {
    Ok(UserRecord {
        username: raw.0,
        password_hash: raw.1,
        email: raw.2,
        created_at: timestamp_from_sql(&raw.3, operation)?,
    })
}

fn photo_from_row(raw: PhotoRow, operation: &'static str) -> Result<PhotoRecord, GalleryError> {
    Ok(PhotoRecord {
        photo_id: raw.0,
        owner: raw.1,
        filename: raw.2,
        blob_key: raw.3,
        tags: raw.4,
        description: raw.5,
        uploaded_at: timestamp_from_sql(&raw.6, operation)?,
    })
}

/// Document implementation of MetadataStore.
pub struct DocumentMetadataStore {
    conn: Mutex<Connection>,
}

impl DocumentMetadataStore {
    /// Open (or create) the backing database, collections and indexes.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, GalleryError> {
        let conn = Connection::open(db_path.as_ref())
            .map_err(|e| GalleryError::unavailable("open", e))?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| GalleryError::unavailable("open", e))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| GalleryError::unavailable("open", e))?;
        info!(
            "Opened document metadata store at {}",
            db_path.as_ref().display()
        );
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn map_create_err(
        e: rusqlite::Error,
        entity: &'static str,
        key: &str,
        operation: &'static str,
    ) -> GalleryError {
        if e.sqlite_error_code() == Some(rusqlite::ErrorCode::ConstraintViolation) {
            GalleryError::conflict(entity, key)
        } else {
            GalleryError::unavailable(operation, e)
        }
    }

    fn query_photos(
        &self,
        sql: &str,
        query_params: &[&dyn rusqlite::ToSql],
        operation: &'static str,
    ) -> Result<Vec<PhotoRecord>, GalleryError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| GalleryError::unavailable(operation, e))?;
        let rows = stmt
            .query_map(query_params, photo_row)
            .map_err(|e| GalleryError::unavailable(operation, e))?;
        let mut photos = Vec::new();
        for row in rows {
            let raw = row.map_err(|e| GalleryError::unavailable(operation, e))?;
            photos.push(photo_from_row(raw, operation)?);
        }
        Ok(photos)
    }
}

impl MetadataStore for DocumentMetadataStore {
    fn create_user(&self, user: &UserRecord) -> Result<(), GalleryError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO users (username, password_hash, email, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                user.username,
                user.password_hash,
                user.email,
                timestamp_to_sql(&user.created_at)
            ],
        )
        .map_err(|e| Self::map_create_err(e, "user", &user.username, "create_user"))?;
        Ok(())
    }

    fn get_user(&self, username: &str) -> Result<Option<UserRecord>, GalleryError> {
        let conn = self.conn.lock().unwrap();
        let raw = conn
            .query_row(
                "SELECT username, password_hash, email, created_at
                 FROM users WHERE username = ?1",
                params![username],
                user_row,
            )
            .optional()
            .map_err(|e| GalleryError::unavailable("get_user", e))?;
        raw.map(|r| user_from_row(r, "get_user")).transpose()
    }

    fn upsert_user(&self, user: &UserRecord) -> Result<UpsertOutcome, GalleryError> {
        let conn = self.conn.lock().unwrap();
        let existed: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)",
                params![user.username],
                |row| row.get(0),
            )
            .map_err(|e| GalleryError::unavailable("upsert_user", e))?;
        conn.execute(
            "INSERT INTO users (username, password_hash, email, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(username) DO UPDATE SET
                password_hash = excluded.password_hash,
                email = excluded.email,
                created_at = excluded.created_at",
            params![
                user.username,
                user.password_hash,
                user.email,
                timestamp_to_sql(&user.created_at)
            ],
        )
        .map_err(|e| GalleryError::unavailable("upsert_user", e))?;
        Ok(if existed {
            UpsertOutcome::Replaced
        } else {
            UpsertOutcome::Inserted
        })
    }

    fn scan_users(&self, token: Option<ScanToken>) -> Result<ScanPage<UserRecord>, GalleryError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT rowid, username, password_hash, email, created_at
                 FROM users WHERE rowid > ?1 ORDER BY rowid LIMIT ?2",
            )
            .map_err(|e| GalleryError::unavailable("scan_users", e))?;
        let start = token.map(|t| t.0).unwrap_or(0);
        let rows = stmt
            .query_map(params![start, SCAN_PAGE_SIZE], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    (row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?),
                ))
            })
            .map_err(|e| GalleryError::unavailable("scan_users", e))?;

        let mut records = Vec::new();
        let mut last_rowid = start;
        for row in rows {
            let (rowid, raw) = row.map_err(|e| GalleryError::unavailable("scan_users", e))?;
            records.push(user_from_row(raw, "scan_users")?);
            last_rowid = rowid;
        }
        let next = if records.len() as i64 == SCAN_PAGE_SIZE {
            Some(ScanToken(last_rowid))
        } else {
            None
        };
        Ok(ScanPage { records, next })
    }

    fn create_photo(&self, photo: &PhotoRecord) -> Result<(), GalleryError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO photos (photo_id, owner, filename, blob_key, tags, description, uploaded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                photo.photo_id,
                photo.owner,
                photo.filename,
                photo.blob_key,
                photo.tags,
                photo.description,
                timestamp_to_sql(&photo.uploaded_at)
            ],
        )
        .map_err(|e| Self::map_create_err(e, "photo", &photo.photo_id, "create_photo"))?;
        Ok(())
    }

    fn get_photo(&self, photo_id: &str) -> Result<Option<PhotoRecord>, GalleryError> {
        let conn = self.conn.lock().unwrap();
        let raw = conn
            .query_row(
                &format!("SELECT {PHOTO_COLUMNS} FROM photos WHERE photo_id = ?1"),
                params![photo_id],
                photo_row,
            )
            .optional()
            .map_err(|e| GalleryError::unavailable("get_photo", e))?;
        raw.map(|r| photo_from_row(r, "get_photo")).transpose()
    }

    fn list_photos_by_owner(&self, owner: &str) -> Result<Vec<PhotoRecord>, GalleryError> {
        // rowid tiebreak keeps insertion order among equal timestamps
        let sql = format!(
            "SELECT {PHOTO_COLUMNS} FROM photos WHERE owner = ?1
             ORDER BY uploaded_at DESC, rowid ASC"
        );
        self.query_photos(&sql, &[&owner], "list_photos_by_owner")
    }

    fn search_photos_by_owner(
        &self,
        owner: &str,
        query: &str,
    ) -> Result<Vec<PhotoRecord>, GalleryError> {
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {PHOTO_COLUMNS} FROM photos
             WHERE owner = ?1
               AND (instr(lower(filename), lower(?2)) > 0
                 OR instr(lower(tags), lower(?2)) > 0
                 OR instr(lower(description), lower(?2)) > 0)
             ORDER BY uploaded_at DESC, rowid ASC"
        );
        self.query_photos(&sql, &[&owner, &query], "search_photos_by_owner")
    }

    fn upsert_photo(&self, photo: &PhotoRecord) -> Result<UpsertOutcome, GalleryError> {
        let conn = self.conn.lock().unwrap();
        let existed: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM photos WHERE photo_id = ?1)",
                params![photo.photo_id],
                |row| row.get(0),
            )
            .map_err(|e| GalleryError::unavailable("upsert_photo", e))?;
        conn.execute(
            "INSERT INTO photos (photo_id, owner, filename, blob_key, tags, description, uploaded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(photo_id) DO UPDATE SET
                owner = excluded.owner,
                filename = excluded.filename,
                blob_key = excluded.blob_key,
                tags = excluded.tags,
                description = excluded.description,
                uploaded_at = excluded.uploaded_at",
            params![
                photo.photo_id,
                photo.owner,
                photo.filename,
                photo.blob_key,
                photo.tags,
                photo.description,
                timestamp_to_sql(&photo.uploaded_at)
            ],
        )
        .map_err(|e| GalleryError::unavailable("upsert_photo", e))?;
        Ok(if existed {
            UpsertOutcome::Replaced
        } else {
            UpsertOutcome::Inserted
        })
    }

    fn scan_photos(&self, token: Option<ScanToken>) -> Result<ScanPage<PhotoRecord>, GalleryError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT rowid, {PHOTO_COLUMNS} FROM photos
                 WHERE rowid > ?1 ORDER BY rowid LIMIT ?2"
            ))
            .map_err(|e| GalleryError::unavailable("scan_photos", e))?;
        let start = token.map(|t| t.0).unwrap_or(0);
        let rows = stmt
            .query_map(params![start, SCAN_PAGE_SIZE], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    (
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                        row.get(7)?,
                    ),
                ))
            })
            .map_err(|e| GalleryError::unavailable("scan_photos", e))?;

        let mut records = Vec::new();
        let mut last_rowid = start;
        for row in rows {
            let (rowid, raw) = row.map_err(|e| GalleryError::unavailable("scan_photos", e))?;
            records.push(photo_from_row(raw, "scan_photos")?);
            last_rowid = rowid;
        }
        let next = if records.len() as i64 == SCAN_PAGE_SIZE {
            Some(ScanToken(last_rowid))
        } else {
            None
        };
        Ok(ScanPage { records, next })
    }

    fn delete_photo(&self, photo_id: &str) -> Result<(), GalleryError> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM photos WHERE photo_id = ?1", params![photo_id])
            .map_err(|e| GalleryError::unavailable("delete_photo", e))?;
        Ok(())
    }
}
