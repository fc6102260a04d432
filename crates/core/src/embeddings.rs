use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

const DEFAULT: usize = 128;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = DEFAULT;
pub const DEFAULT_NGRAM_SIZE: usize = 3;
pub const DEFAULT_MODEL_NAME: &str = "char-trigram-128";

const ARTIFACT_FILE: &str = "model.json";

pub trait Embedder {
    fn dimensions(&self) -> usize;
    fn embed(&self, text: &str) -> Vec<f32>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterNgramEmbedder {
    pub dimensions: usize,
    pub ngram_size: usize,
}

impl Default for CharacterNgramEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
            ngram_size: DEFAULT_NGRAM_SIZE,
        }
    }
}

impl Embedder for CharacterNgramEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions.max(1)];
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        if chars.is_empty() {
            return vector;
        }

        let width = self.ngram_size.clamp(1, chars.len());
        for window in chars.windows(width) {
            let mut hash = 1469598103934665603u64;
            for character in window {
                let mut buffer = [0u8; 4];
                for byte in character.encode_utf8(&mut buffer).bytes() {
                    hash ^= byte as u64;
                    hash = hash.wrapping_mul(1099511628211);
                }
            }
            let bucket = (hash % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        vector
    }
}

/// Named embedding model whose parameters live in the on-disk model cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub name: String,
    pub embedder: CharacterNgramEmbedder,
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self {
            name: DEFAULT_MODEL_NAME.to_string(),
            embedder: CharacterNgramEmbedder::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ModelArtifact {
    name: String,
    dimensions: usize,
    ngram_size: usize,
    checksum: String,
}

impl ModelArtifact {
    fn from_spec(spec: &ModelSpec) -> Self {
        Self {
            name: spec.name.clone(),
            dimensions: spec.embedder.dimensions,
            ngram_size: spec.embedder.ngram_size,
            checksum: artifact_checksum(&spec.name, spec.embedder.dimensions, spec.embedder.ngram_size),
        }
    }
}

fn artifact_checksum(name: &str, dimensions: usize, ngram_size: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update((dimensions as u64).to_le_bytes());
    hasher.update((ngram_size as u64).to_le_bytes());
    format!("{:x}", hasher.finalize())
}

/// Directory of materialized model artifacts, one sub-directory per model.
#[derive(Debug, Clone)]
pub struct ModelCache {
    root: PathBuf,
}

impl ModelCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn model_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Loads the cached artifact for `spec`, materializing it first when absent.
    pub fn load(&self, spec: &ModelSpec) -> Result<CharacterNgramEmbedder, StoreError> {
        let dir = self.model_dir(&spec.name);
        let path = dir.join(ARTIFACT_FILE);

        if !path.exists() {
            fs::create_dir_all(&dir)?;
            let artifact = ModelArtifact::from_spec(spec);
            fs::write(&path, serde_json::to_vec_pretty(&artifact)?)?;
            info!(model = %spec.name, path = %path.display(), "materialized embedding model");
        }

        let model_error = |details: String| StoreError::ModelLoad {
            model: spec.name.clone(),
            details,
        };

        let bytes = fs::read(&path).map_err(|error| model_error(error.to_string()))?;
        let artifact: ModelArtifact =
            serde_json::from_slice(&bytes).map_err(|error| model_error(error.to_string()))?;

        if artifact.name != spec.name {
            return Err(model_error(format!(
                "artifact is named {} instead of {}",
                artifact.name, spec.name
            )));
        }

        let expected = artifact_checksum(&artifact.name, artifact.dimensions, artifact.ngram_size);
        if artifact.checksum != expected {
            return Err(model_error("artifact checksum mismatch".to_string()));
        }

        if artifact.dimensions == 0 || artifact.ngram_size == 0 {
            return Err(model_error(format!(
                "artifact declares dimensions={} ngram_size={}",
                artifact.dimensions, artifact.ngram_size
            )));
        }

        debug!(model = %artifact.name, dimensions = artifact.dimensions, "embedding model loaded");

        Ok(CharacterNgramEmbedder {
            dimensions: artifact.dimensions,
            ngram_size: artifact.ngram_size,
        })
    }

    /// Removes every cached file for the named model. Missing directories are fine.
    pub fn clear(&self, name: &str) -> std::io::Result<()> {
        let dir = self.model_dir(name);
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error),
        }
    }
}

pub fn cosine_similarity(left: &[f32], right: &[f32]) -> f32 {
    if left.len() != right.len() || left.is_empty() {
        return 0.0;
    }
    let dot: f32 = left.iter().zip(right.iter()).map(|(a, b)| a * b).sum();
    let left_magnitude: f32 = left.iter().map(|value| value * value).sum::<f32>().sqrt();
    let right_magnitude: f32 = right.iter().map(|value| value * value).sum::<f32>().sqrt();
    if left_magnitude < f32::EPSILON || right_magnitude < f32::EPSILON {
        0.0
    } else {
        dot / (left_magnitude * right_magnitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn embedder_is_deterministic() {
        let embedder = CharacterNgramEmbedder::default();
        let first = embedder.embed("Python, Django, PostgreSQL");
        let second = embedder.embed("Python, Django, PostgreSQL");
        assert_eq!(first, second);
    }

    #[test]
    fn embedder_outputs_expected_length() {
        let embedder = CharacterNgramEmbedder {
            dimensions: 32,
            ngram_size: 3,
        };
        let vector = embedder.embed("ab");
        assert_eq!(vector.len(), 32);
        assert!(vector.iter().any(|value| *value > 0.0));
    }

    #[test]
    fn related_text_scores_higher_than_unrelated_text() {
        let embedder = CharacterNgramEmbedder::default();
        let query = embedder.embed("Python");
        let django = embedder.embed("Python, Django");
        let react = embedder.embed("React, Node");
        assert!(cosine_similarity(&query, &django) > cosine_similarity(&query, &react));
    }

    #[test]
    fn cache_materializes_missing_artifact() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let cache = ModelCache::new(dir.path());
        let spec = ModelSpec::default();

        let embedder = cache.load(&spec)?;
        assert_eq!(embedder, spec.embedder);
        assert!(cache.model_dir(&spec.name).join(ARTIFACT_FILE).exists());
        Ok(())
    }

    #[test]
    fn corrupt_artifact_is_a_model_load_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let cache = ModelCache::new(dir.path());
        let spec = ModelSpec::default();
        fs::create_dir_all(cache.model_dir(&spec.name))?;
        fs::write(cache.model_dir(&spec.name).join(ARTIFACT_FILE), b"\x00garbage")?;

        let error = cache.load(&spec).expect_err("corrupt artifact must not load");
        assert!(error.is_model_load());

        cache.clear(&spec.name)?;
        assert!(!cache.model_dir(&spec.name).exists());
        assert!(cache.load(&spec).is_ok());
        Ok(())
    }

    #[test]
    fn clearing_a_missing_model_is_not_an_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        ModelCache::new(dir.path()).clear("never-downloaded")?;
        Ok(())
    }
}
