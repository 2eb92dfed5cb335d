//! One-shot metadata migration between store backends.
//!
//! Copies every user and photo record from a source metadata store into
//! a destination store. Blob content is never touched: blob keys are
//! shared and stable across backends, so only the records move. Writes
//! are upserts keyed by the natural key, which makes a re-run converge
//! instead of duplicating or failing.

use std::fmt;

use log::{error, info};

use crate::errors::GalleryError;
use crate::metadata::{MetadataStore, PhotoRecord, UpsertOutcome, UserRecord};

/// Per-collection accounting of a migration run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CollectionStats {
    pub scanned: usize,
    pub inserted: usize,
    pub replaced: usize,
}

impl CollectionStats {
    fn record(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Inserted => self.inserted += 1,
            UpsertOutcome::Replaced => self.replaced += 1,
        }
    }
}

/// Summary of a completed migration run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MigrationReport {
    pub users: CollectionStats,
    pub photos: CollectionStats,
}

impl fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Migration complete")?;
        writeln!(
            f,
            "  users:  {} scanned, {} inserted, {} replaced",
            self.users.scanned, self.users.inserted, self.users.replaced
        )?;
        write!(
            f,
            "  photos: {} scanned, {} inserted, {} replaced",
            self.photos.scanned, self.photos.inserted, self.photos.replaced
        )
    }
}

/// Drain the source user collection page by page. A failed page fetch
/// aborts the whole collection: an unfetched page could hold records
/// absent from the destination, and silence here would read as success.
fn scan_all_users(source: &dyn MetadataStore) -> Result<Vec<UserRecord>, GalleryError> {
    let mut records = Vec::new();
    let mut token = None;
    loop {
        let page = source.scan_users(token)?;
        records.extend(page.records);
        match page.next {
            Some(next) => token = Some(next),
            None => break,
        }
    }
    Ok(records)
}

fn scan_all_photos(source: &dyn MetadataStore) -> Result<Vec<PhotoRecord>, GalleryError> {
    let mut records = Vec::new();
    let mut token = None;
    loop {
        let page = source.scan_photos(token)?;
        records.extend(page.records);
        match page.next {
            Some(next) => token = Some(next),
            None => break,
        }
    }
    Ok(records)
}

/// Copy all metadata from `source` into `dest`. Safe to re-run any
/// number of times; a second run over an unchanged source inserts
/// nothing. The whole scan is held in memory, which is fine for the
/// expected data volumes but will not survive very large tables.
///
/// Users migrate before photos purely for readable progress output;
/// photo records carry no enforced reference to users. A failed
/// destination write aborts the run at that record; upserts already
/// applied stay applied (there is no cross-store transaction to roll
/// back).
pub fn migrate(
    source: &dyn MetadataStore,
    dest: &dyn MetadataStore,
) -> Result<MigrationReport, GalleryError> {
    let mut report = MigrationReport::default();

    info!("[1/2] Scanning source user collection");
    let users = scan_all_users(source)?;
    info!("Found {} user record(s)", users.len());
    report.users.scanned = users.len();
    for user in &users {
        match dest.upsert_user(user) {
            Ok(outcome) => report.users.record(outcome),
            Err(e) => {
                error!("Aborting user migration at {:?}: {}", user.username, e);
                return Err(e);
            }
        }
    }
    info!(
        "Upserted users: {} inserted, {} replaced",
        report.users.inserted, report.users.replaced
    );

    info!("[2/2] Scanning source photo collection");
    let photos = scan_all_photos(source)?;
    info!("Found {} photo record(s)", photos.len());
    report.photos.scanned = photos.len();
    for photo in &photos {
        match dest.upsert_photo(photo) {
            Ok(outcome) => report.photos.record(outcome),
            Err(e) => {
                error!("Aborting photo migration at {:?}: {}", photo.photo_id, e);
                return Err(e);
            }
        }
    }
    info!(
        "Upserted photos: {} inserted, {} replaced",
        report.photos.inserted, report.photos.replaced
    );

    Ok(report)
}
