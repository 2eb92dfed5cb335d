//! One-shot metadata migration entry point.
//!
//! Reads source and destination store configuration from the process
//! environment, copies every user and photo record across, and prints a
//! summary. Blob content is untouched; both stores share the same keys.
//!
//! Usage:
//!     SOURCE_METADATA_BACKEND=keyvalue SOURCE_METADATA_DB=./data/metadata.sqlite \
//!     DEST_METADATA_BACKEND=document   DEST_METADATA_DB=./data/documents.sqlite \
//!     migrate_metadata

use photo_gallery::errors::GalleryError;
use photo_gallery::metadata::config::MetadataConfig;
use photo_gallery::migration::migrate;

fn run() -> Result<(), GalleryError> {
    let source_config = MetadataConfig::from_env_prefixed("SOURCE")?;
    let dest_config = MetadataConfig::from_env_prefixed("DEST")?;
    println!(
        "Migrating metadata: {:?} ({}) -> {:?} ({})",
        source_config.backend, source_config.db_path, dest_config.backend, dest_config.db_path
    );

    let source = source_config.create_store()?;
    let dest = dest_config.create_store()?;
    let report = migrate(source.as_ref(), dest.as_ref())?;
    println!("{report}");
    Ok(())
}

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("Migration failed: {e}");
        std::process::exit(1);
    }
}
