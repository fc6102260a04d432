pub mod cleaner;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod fetcher;
pub mod llm;
pub mod models;
pub mod orchestrator;
pub mod portfolio;
pub mod prompts;
pub mod store;
pub mod stores;
pub mod traits;

pub use cleaner::{clean_text, normalize_whitespace};
pub use config::{LlmConfig, SenderProfile, StoreConfig};
pub use embeddings::{
    CharacterNgramEmbedder, Embedder, ModelCache, ModelSpec, DEFAULT_EMBEDDING_DIMENSIONS,
    DEFAULT_MODEL_NAME,
};
pub use error::{
    DataLoadError, FetchError, LlmError, PipelineError, StoreError, StoreInitError,
    StoreUnavailable,
};
pub use fetcher::HttpPageFetcher;
pub use llm::ChatCompletionsChain;
pub use models::{
    flatten_links, ClientMode, CollectionHit, JobPosting, LinkMetadata, NewEntry, PortfolioRow,
    SeedOutcome, SkillMatches, StoreStatus, StoredEntry,
};
pub use orchestrator::{ColdMailPipeline, GeneratedMail, Submission};
pub use portfolio::{load_portfolio_rows, PortfolioStore};
pub use store::VectorClient;
pub use stores::{InMemoryCollection, PersistentCollection};
pub use traits::{LlmChain, PageFetcher, VectorCollection};
