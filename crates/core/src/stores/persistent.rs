use super::snapshot::{lock_path, read_snapshot, snapshot_path, write_snapshot, SeedLock};
use super::CollectionState;
use crate::embeddings::CharacterNgramEmbedder;
use crate::error::StoreError;
use crate::models::{CollectionHit, NewEntry};
use crate::traits::VectorCollection;
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Collection that writes its snapshot through on every mutation.
pub struct PersistentCollection {
    state: CollectionState,
    path: PathBuf,
    lock: PathBuf,
}

impl PersistentCollection {
    /// Opens `<dir>/<name>.json`, creating it when missing.
    ///
    /// A snapshot that cannot be parsed is moved aside to `<name>.json.corrupt-<timestamp>`
    /// and the collection starts empty.
    pub fn open(
        dir: &Path,
        name: &str,
        model: &str,
        embedder: CharacterNgramEmbedder,
    ) -> Result<Self, StoreError> {
        fs::create_dir_all(dir)?;
        let path = snapshot_path(dir, name);
        let mut state = CollectionState::new(name, model, embedder);

        match read_snapshot(&path) {
            Ok(Some(snapshot)) => state.restore(snapshot, &path)?,
            Ok(None) => write_snapshot(&path, &state.snapshot())?,
            Err(StoreError::CorruptSnapshot { details, .. }) => {
                let quarantine =
                    path.with_extension(format!("json.corrupt-{}", Utc::now().timestamp()));
                fs::rename(&path, &quarantine)?;
                warn!(
                    collection = name,
                    moved_to = %quarantine.display(),
                    reason = %details,
                    "quarantined unreadable snapshot, starting empty"
                );
                write_snapshot(&path, &state.snapshot())?;
            }
            Err(error) => return Err(error),
        }

        info!(collection = name, entries = state.entries.len(), path = %path.display(), "opened persistent collection");

        Ok(Self {
            state,
            path,
            lock: lock_path(dir, name),
        })
    }
}

impl PersistentCollection {
    fn append(&mut self, entries: Vec<NewEntry>) -> Result<usize, StoreError> {
        let inserted = self.state.insert(entries);
        write_snapshot(&self.path, &self.state.snapshot())?;
        Ok(inserted)
    }
}

impl VectorCollection for PersistentCollection {
    fn name(&self) -> &str {
        &self.state.name
    }

    fn count(&self) -> usize {
        self.state.entries.len()
    }

    fn add_if_empty(&mut self, entries: Vec<NewEntry>) -> Result<Option<usize>, StoreError> {
        let _guard = SeedLock::acquire(&self.lock, &self.state.name)?;
        if let Some(current) = read_snapshot(&self.path)? {
            self.state.restore(current, &self.path)?;
        }

        if self.count() > 0 {
            return Ok(None);
        }

        self.append(entries).map(Some)
    }

    fn query(
        &self,
        texts: &[String],
        n_results: usize,
    ) -> Result<Vec<Vec<CollectionHit>>, StoreError> {
        Ok(self.state.nearest(texts, n_results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LinkMetadata;
    use tempfile::tempdir;

    fn entry(id: &str) -> NewEntry {
        NewEntry {
            id: id.to_string(),
            document: "Python, FastAPI".to_string(),
            metadata: LinkMetadata {
                links: format!("https://example.com/{id}"),
            },
        }
    }

    #[test]
    fn writes_through_on_seed() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let embedder = CharacterNgramEmbedder::default();
        let mut collection = PersistentCollection::open(dir.path(), "portfolio", "m", embedder)?;
        assert_eq!(collection.add_if_empty(vec![entry("1"), entry("2")])?, Some(2));

        let reopened = PersistentCollection::open(dir.path(), "portfolio", "m", embedder)?;
        assert_eq!(reopened.count(), 2);
        Ok(())
    }

    #[test]
    fn corrupt_snapshot_is_quarantined() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::write(snapshot_path(dir.path(), "portfolio"), b"not a snapshot")?;

        let collection = PersistentCollection::open(
            dir.path(),
            "portfolio",
            "m",
            CharacterNgramEmbedder::default(),
        )?;
        assert_eq!(collection.count(), 0);

        let quarantined = fs::read_dir(dir.path())?
            .filter_map(|item| item.ok())
            .filter(|item| item.file_name().to_string_lossy().contains(".corrupt-"))
            .count();
        assert_eq!(quarantined, 1);
        Ok(())
    }

    #[test]
    fn add_if_empty_sees_rows_written_by_another_handle() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let embedder = CharacterNgramEmbedder::default();
        let mut first = PersistentCollection::open(dir.path(), "portfolio", "m", embedder)?;
        let mut second = PersistentCollection::open(dir.path(), "portfolio", "m", embedder)?;

        assert_eq!(first.add_if_empty(vec![entry("1")])?, Some(1));
        assert_eq!(second.add_if_empty(vec![entry("2")])?, None);
        assert_eq!(second.count(), 1);
        Ok(())
    }

    #[test]
    fn held_lock_blocks_concurrent_seed() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let mut collection = PersistentCollection::open(
            dir.path(),
            "portfolio",
            "m",
            CharacterNgramEmbedder::default(),
        )?;
        let _held = SeedLock::acquire(&lock_path(dir.path(), "portfolio"), "portfolio")?;

        let result = collection.add_if_empty(vec![entry("1")]);
        assert!(matches!(result, Err(StoreError::SeedLocked(_))));
        Ok(())
    }
}
