use super::snapshot::{lock_path, read_snapshot, snapshot_path, write_snapshot, SeedLock};
use super::CollectionState;
use crate::embeddings::CharacterNgramEmbedder;
use crate::error::StoreError;
use crate::models::{CollectionHit, NewEntry};
use crate::traits::VectorCollection;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Collection held in memory; it reaches disk only when seeded under the lock.
pub struct InMemoryCollection {
    state: CollectionState,
    snapshot: Option<PathBuf>,
    lock: Option<PathBuf>,
}

impl InMemoryCollection {
    /// A collection with no backing snapshot.
    pub fn ephemeral(name: &str, model: &str, embedder: CharacterNgramEmbedder) -> Self {
        Self {
            state: CollectionState::new(name, model, embedder),
            snapshot: None,
            lock: None,
        }
    }

    /// Hydrates from `<dir>/<name>.json` when present. An unreadable snapshot is an error.
    pub fn open(
        dir: &Path,
        name: &str,
        model: &str,
        embedder: CharacterNgramEmbedder,
    ) -> Result<Self, StoreError> {
        let path = snapshot_path(dir, name);
        let mut state = CollectionState::new(name, model, embedder);

        if let Some(snapshot) = read_snapshot(&path)? {
            state.restore(snapshot, &path)?;
            info!(collection = name, entries = state.entries.len(), "hydrated collection from snapshot");
        }

        Ok(Self {
            state,
            snapshot: Some(path),
            lock: Some(lock_path(dir, name)),
        })
    }
}

impl VectorCollection for InMemoryCollection {
    fn name(&self) -> &str {
        &self.state.name
    }

    fn count(&self) -> usize {
        self.state.entries.len()
    }

    fn add_if_empty(&mut self, entries: Vec<NewEntry>) -> Result<Option<usize>, StoreError> {
        let (Some(snapshot), Some(lock)) = (self.snapshot.clone(), self.lock.clone()) else {
            if self.count() > 0 {
                return Ok(None);
            }
            return Ok(Some(self.state.insert(entries)));
        };

        let _guard = SeedLock::acquire(&lock, &self.state.name)?;
        if let Some(current) = read_snapshot(&snapshot)? {
            self.state.restore(current, &snapshot)?;
        }

        if self.count() > 0 {
            debug!(collection = %self.state.name, entries = self.count(), "snapshot already populated");
            return Ok(None);
        }

        let inserted = self.state.insert(entries);
        write_snapshot(&snapshot, &self.state.snapshot())?;
        Ok(Some(inserted))
    }

    fn query(
        &self,
        texts: &[String],
        n_results: usize,
    ) -> Result<Vec<Vec<CollectionHit>>, StoreError> {
        Ok(self.state.nearest(texts, n_results))
    }
}
