use crate::error::StoreError;
use crate::models::StoredEntry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use fs2::{lock_contended_error, FileExt};
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Snapshot {
    pub name: String,
    pub model: String,
    pub updated_at: DateTime<Utc>,
    pub entries: Vec<StoredEntry>,
}

pub(crate) fn snapshot_path(dir: &Path, collection: &str) -> PathBuf {
    dir.join(format!("{collection}.json"))
}

pub(crate) fn lock_path(dir: &Path, collection: &str) -> PathBuf {
    dir.join(format!("{collection}.lock"))
}

pub(crate) fn read_snapshot(path: &Path) -> Result<Option<Snapshot>, StoreError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
        Err(error) => return Err(StoreError::Io(error)),
    };

    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|error| StoreError::CorruptSnapshot {
            path: path.display().to_string(),
            details: error.to_string(),
        })
}

/// Writes through a sibling temp file so readers never see a half-written snapshot.
pub(crate) fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let staging = path.with_extension("json.tmp");
    fs::write(&staging, serde_json::to_vec(snapshot)?)?;
    fs::rename(&staging, path)?;

    debug!(path = %path.display(), entries = snapshot.entries.len(), "snapshot written");
    Ok(())
}

/// Exclusive advisory lock on `<collection>.lock`, held while a collection is being seeded.
///
/// The lock file itself is left in place; only the OS lock matters, and the kernel drops
/// it when the holding process exits, however it exits.
#[derive(Debug)]
pub(crate) struct SeedLock {
    _file: File,
}

impl SeedLock {
    pub fn acquire(path: &Path, collection: &str) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Self { _file: file }),
            Err(error) if error.kind() == lock_contended_error().kind() => {
                Err(StoreError::SeedLocked(collection.to_string()))
            }
            Err(error) => Err(StoreError::Io(error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_snapshot_reads_as_none() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        assert!(read_snapshot(&snapshot_path(dir.path(), "portfolio"))?.is_none());
        Ok(())
    }

    #[test]
    fn garbage_snapshot_is_reported_as_corrupt() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = snapshot_path(dir.path(), "portfolio");
        fs::write(&path, b"{not json")?;

        let error = read_snapshot(&path).expect_err("garbage must not parse");
        assert!(matches!(error, StoreError::CorruptSnapshot { .. }));
        Ok(())
    }

    #[test]
    fn seed_lock_is_exclusive_until_dropped() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = lock_path(dir.path(), "portfolio");

        let held = SeedLock::acquire(&path, "portfolio")?;
        assert!(matches!(
            SeedLock::acquire(&path, "portfolio"),
            Err(StoreError::SeedLocked(_))
        ));

        drop(held);
        assert!(SeedLock::acquire(&path, "portfolio").is_ok());
        Ok(())
    }

    #[test]
    fn leftover_lock_file_does_not_block() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = lock_path(dir.path(), "portfolio");
        fs::write(&path, b"")?;

        let held = SeedLock::acquire(&path, "portfolio")?;
        drop(held);
        assert!(path.exists());
        assert!(SeedLock::acquire(&path, "portfolio").is_ok());
        Ok(())
    }
}
