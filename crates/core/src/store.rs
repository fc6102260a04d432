use crate::embeddings::{ModelCache, ModelSpec};
use crate::error::StoreError;
use crate::models::ClientMode;
use crate::stores::{InMemoryCollection, PersistentCollection};
use crate::traits::VectorCollection;
use std::fs;
use std::path::PathBuf;

/// Opens collections under one persist directory, loading the embedding model per collection.
#[derive(Debug, Clone)]
pub struct VectorClient {
    mode: ClientMode,
    persist_dir: PathBuf,
    models: ModelCache,
}

impl VectorClient {
    pub fn new(
        mode: ClientMode,
        persist_dir: impl Into<PathBuf>,
        models: ModelCache,
    ) -> Result<Self, StoreError> {
        let persist_dir = persist_dir.into();

        match mode {
            ClientMode::InMemory => {
                if persist_dir.exists() && !persist_dir.is_dir() {
                    return Err(StoreError::NotADirectory(persist_dir.display().to_string()));
                }
            }
            ClientMode::Persistent => fs::create_dir_all(&persist_dir)?,
        }

        Ok(Self {
            mode,
            persist_dir,
            models,
        })
    }

    pub fn get_or_create_collection(
        &self,
        name: &str,
        model: &ModelSpec,
    ) -> Result<Box<dyn VectorCollection>, StoreError> {
        let embedder = self.models.load(model)?;

        Ok(match self.mode {
            ClientMode::InMemory => Box::new(InMemoryCollection::open(
                &self.persist_dir,
                name,
                &model.name,
                embedder,
            )?),
            ClientMode::Persistent => Box::new(PersistentCollection::open(
                &self.persist_dir,
                name,
                &model.name,
                embedder,
            )?),
        })
    }
}
