pub mod memory;
pub mod persistent;
pub(crate) mod snapshot;

pub use memory::InMemoryCollection;
pub use persistent::PersistentCollection;

use crate::embeddings::{cosine_similarity, CharacterNgramEmbedder, Embedder};
use crate::error::StoreError;
use crate::models::{CollectionHit, NewEntry, StoredEntry};
use chrono::Utc;
use snapshot::Snapshot;
use std::collections::HashSet;
use std::path::Path;
use tracing::warn;

/// Entries plus the embedder that produced them; shared by both collection kinds.
#[derive(Debug, Clone)]
pub(crate) struct CollectionState {
    pub name: String,
    pub model: String,
    embedder: CharacterNgramEmbedder,
    pub entries: Vec<StoredEntry>,
}

impl CollectionState {
    pub fn new(name: &str, model: &str, embedder: CharacterNgramEmbedder) -> Self {
        Self {
            name: name.to_string(),
            model: model.to_string(),
            embedder,
            entries: Vec::new(),
        }
    }

    /// Replaces the entries with the snapshot's after checking it was built by the same model.
    pub fn restore(&mut self, snapshot: Snapshot, source: &Path) -> Result<(), StoreError> {
        if snapshot.model != self.model {
            return Err(StoreError::ModelMismatch {
                collection: self.name.clone(),
                stored: snapshot.model,
                requested: self.model.clone(),
            });
        }

        let dimensions = self.embedder.dimensions();
        if let Some(entry) = snapshot
            .entries
            .iter()
            .find(|entry| entry.embedding.len() != dimensions)
        {
            return Err(StoreError::CorruptSnapshot {
                path: source.display().to_string(),
                details: format!(
                    "entry {} has {} dimensions, model produces {}",
                    entry.id,
                    entry.embedding.len(),
                    dimensions
                ),
            });
        }

        self.entries = snapshot.entries;
        Ok(())
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            name: self.name.clone(),
            model: self.model.clone(),
            updated_at: Utc::now(),
            entries: self.entries.clone(),
        }
    }

    /// Embeds and appends entries; ids already present are skipped.
    pub fn insert(&mut self, entries: Vec<NewEntry>) -> usize {
        let mut known: HashSet<String> = self.entries.iter().map(|entry| entry.id.clone()).collect();
        let mut inserted = 0;

        for entry in entries {
            if !known.insert(entry.id.clone()) {
                warn!(collection = %self.name, id = %entry.id, "skipping entry with duplicate id");
                continue;
            }

            let embedding = self.embedder.embed(&entry.document);
            self.entries.push(StoredEntry {
                id: entry.id,
                document: entry.document,
                metadata: entry.metadata,
                embedding,
            });
            inserted += 1;
        }

        inserted
    }

    pub fn nearest(&self, texts: &[String], n_results: usize) -> Vec<Vec<CollectionHit>> {
        texts
            .iter()
            .map(|text| {
                let query_vector = self.embedder.embed(text);
                let mut hits: Vec<CollectionHit> = self
                    .entries
                    .iter()
                    .map(|entry| CollectionHit {
                        id: entry.id.clone(),
                        document: entry.document.clone(),
                        metadata: entry.metadata.clone(),
                        distance: 1.0 - cosine_similarity(&query_vector, &entry.embedding),
                    })
                    .collect();

                hits.sort_by(|left, right| left.distance.total_cmp(&right.distance));
                hits.truncate(n_results);
                hits
            })
            .collect()
    }
}
