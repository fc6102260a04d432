use crate::config::StoreConfig;
use crate::embeddings::ModelCache;
use crate::error::{DataLoadError, StoreError, StoreInitError, StoreUnavailable};
use crate::models::{
    ClientMode, LinkMetadata, NewEntry, PortfolioRow, SeedOutcome, SkillMatches, StoreStatus,
};
use crate::store::VectorClient;
use crate::traits::VectorCollection;
use std::fs::File;
use std::path::Path;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const TECHSTACK_COLUMN: &str = "Techstack";
const LINKS_COLUMN: &str = "Links";

/// Reads the portfolio CSV. Both `Techstack` and `Links` must be present and non-empty.
pub fn load_portfolio_rows(path: &Path) -> Result<Vec<PortfolioRow>, DataLoadError> {
    let file = File::open(path).map_err(|source| DataLoadError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader.headers()?.clone();
    for column in [TECHSTACK_COLUMN, LINKS_COLUMN] {
        if !headers.iter().any(|header| header == column) {
            return Err(DataLoadError::MissingColumn {
                path: path.display().to_string(),
                column,
            });
        }
    }

    let mut rows = Vec::new();
    for (index, record) in reader.deserialize::<PortfolioRow>().enumerate() {
        let row = record?;
        let line = index + 1;
        if row.techstack.is_empty() {
            return Err(DataLoadError::EmptyField {
                row: line,
                column: TECHSTACK_COLUMN,
            });
        }
        if row.link.is_empty() {
            return Err(DataLoadError::EmptyField {
                row: line,
                column: LINKS_COLUMN,
            });
        }
        rows.push(row);
    }

    Ok(rows)
}

/// Portfolio rows plus the vector collection they are seeded into.
///
/// The collection may have failed to open; every operation then degrades to an
/// empty or `Unavailable` answer instead of an error.
pub struct PortfolioStore {
    rows: Vec<PortfolioRow>,
    collection: Result<Box<dyn VectorCollection>, StoreInitError>,
    mode: Option<ClientMode>,
    init_attempts: u32,
    results_per_skill: usize,
}

impl PortfolioStore {
    /// Loads the CSV (fatal on failure) and opens the collection (never fatal).
    pub async fn initialize(config: &StoreConfig) -> Result<Self, DataLoadError> {
        let rows = load_portfolio_rows(&config.portfolio_csv)?;
        info!(
            path = %config.portfolio_csv.display(),
            rows = rows.len(),
            "loaded portfolio rows"
        );

        let store = match open_collection(config).await {
            Ok(opened) => {
                info!(
                    collection = %config.collection,
                    mode = %opened.mode,
                    entries = opened.collection.count(),
                    attempts = opened.attempts,
                    "portfolio collection ready"
                );
                Self {
                    rows,
                    collection: Ok(opened.collection),
                    mode: Some(opened.mode),
                    init_attempts: opened.attempts,
                    results_per_skill: config.results_per_skill,
                }
            }
            Err(init_error) => {
                error!(error = %init_error, "portfolio collection unavailable, matching disabled");
                Self {
                    rows,
                    init_attempts: init_error.attempts,
                    collection: Err(init_error),
                    mode: None,
                    results_per_skill: config.results_per_skill,
                }
            }
        };

        Ok(store)
    }

    pub fn with_collection(
        rows: Vec<PortfolioRow>,
        collection: Box<dyn VectorCollection>,
        mode: ClientMode,
        results_per_skill: usize,
    ) -> Self {
        Self {
            rows,
            collection: Ok(collection),
            mode: Some(mode),
            init_attempts: 1,
            results_per_skill,
        }
    }

    pub fn unavailable(rows: Vec<PortfolioRow>, init_error: StoreInitError) -> Self {
        Self {
            rows,
            init_attempts: init_error.attempts,
            collection: Err(init_error),
            mode: None,
            results_per_skill: 0,
        }
    }

    pub fn rows(&self) -> &[PortfolioRow] {
        &self.rows
    }

    pub fn is_available(&self) -> bool {
        self.collection.is_ok()
    }

    pub fn status(&self) -> StoreStatus {
        StoreStatus {
            available: self.is_available(),
            mode: self.mode,
            entries: self
                .collection
                .as_ref()
                .map(|collection| collection.count())
                .unwrap_or(0),
            rows: self.rows.len(),
            init_attempts: self.init_attempts,
            error: self.collection.as_ref().err().map(ToString::to_string),
        }
    }

    /// Inserts every row when the collection is empty; otherwise does nothing.
    pub fn try_seed(&mut self) -> Result<SeedOutcome, StoreUnavailable> {
        let collection = self
            .collection
            .as_mut()
            .map_err(|init_error| StoreUnavailable::new(init_error.to_string()))?;

        if collection.count() > 0 {
            return Ok(SeedOutcome::AlreadySeeded(collection.count()));
        }

        let entries = self
            .rows
            .iter()
            .map(|row| NewEntry {
                id: Uuid::new_v4().to_string(),
                document: row.techstack.clone(),
                metadata: LinkMetadata {
                    links: row.link.clone(),
                },
            })
            .collect();

        match collection.add_if_empty(entries) {
            Ok(Some(inserted)) => {
                info!(collection = collection.name(), inserted, "seeded portfolio collection");
                Ok(SeedOutcome::Seeded(inserted))
            }
            Ok(None) => Ok(SeedOutcome::AlreadySeeded(collection.count())),
            Err(store_error) => Err(StoreUnavailable::new(store_error.to_string())),
        }
    }

    pub fn seed(&mut self) -> SeedOutcome {
        match self.try_seed() {
            Ok(outcome) => outcome,
            Err(unavailable) => {
                warn!(reason = %unavailable.reason, "skipping portfolio seed");
                SeedOutcome::Unavailable
            }
        }
    }

    /// Up to `results_per_skill` links per non-blank skill, closest first.
    pub fn try_query<S: AsRef<str>>(
        &self,
        skills: &[S],
    ) -> Result<Vec<SkillMatches>, StoreUnavailable> {
        let collection = self
            .collection
            .as_ref()
            .map_err(|init_error| StoreUnavailable::new(init_error.to_string()))?;

        let skills: Vec<String> = skills
            .iter()
            .map(|skill| skill.as_ref().trim())
            .filter(|skill| !skill.is_empty())
            .map(str::to_string)
            .collect();

        if skills.is_empty() {
            return Ok(Vec::new());
        }

        let hits = collection
            .query(&skills, self.results_per_skill)
            .map_err(|store_error| StoreUnavailable::new(store_error.to_string()))?;

        Ok(skills
            .into_iter()
            .zip(hits)
            .map(|(skill, hits)| SkillMatches {
                skill,
                links: hits.into_iter().map(|hit| hit.metadata).collect(),
            })
            .collect())
    }

    pub fn query<S: AsRef<str>>(&self, skills: &[S]) -> Vec<SkillMatches> {
        self.try_query(skills).unwrap_or_else(|unavailable| {
            debug!(reason = %unavailable.reason, "portfolio query returned no links");
            Vec::new()
        })
    }
}

struct OpenedCollection {
    collection: Box<dyn VectorCollection>,
    mode: ClientMode,
    attempts: u32,
}

/// Opens the collection, clearing the model cache and retrying when the model fails to load.
async fn open_collection(config: &StoreConfig) -> Result<OpenedCollection, StoreInitError> {
    let models = ModelCache::new(&config.model_cache);
    let max_attempts = config.max_init_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        let store_error = match open_once(config, &models) {
            Ok((collection, mode)) => {
                return Ok(OpenedCollection {
                    collection,
                    mode,
                    attempts: attempt,
                })
            }
            Err(store_error) => store_error,
        };

        if !store_error.is_model_load() {
            return Err(StoreInitError {
                attempts: attempt,
                source: store_error,
            });
        }

        warn!(
            attempt,
            max_attempts,
            model = %config.model.name,
            error = %store_error,
            "embedding model failed to load, clearing cache"
        );
        if let Err(clear_error) = models.clear(&config.model.name) {
            warn!(error = %clear_error, "could not clear model cache");
        }

        if attempt >= max_attempts {
            return Err(StoreInitError {
                attempts: attempt,
                source: store_error,
            });
        }

        tokio::time::sleep(config.retry_delay).await;
    }
}

fn open_once(
    config: &StoreConfig,
    models: &ModelCache,
) -> Result<(Box<dyn VectorCollection>, ClientMode), StoreError> {
    match open_with(ClientMode::InMemory, config, models) {
        Ok(collection) => Ok((collection, ClientMode::InMemory)),
        Err(store_error) if store_error.is_model_load() => Err(store_error),
        Err(store_error) => {
            warn!(error = %store_error, "in-memory client failed, falling back to persistent client");
            open_with(ClientMode::Persistent, config, models)
                .map(|collection| (collection, ClientMode::Persistent))
        }
    }
}

fn open_with(
    mode: ClientMode,
    config: &StoreConfig,
    models: &ModelCache,
) -> Result<Box<dyn VectorCollection>, StoreError> {
    VectorClient::new(mode, &config.persist_dir, models.clone())?
        .get_or_create_collection(&config.collection, &config.model)
}
