use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataLoadError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("portfolio file {path} has no {column} column")]
    MissingColumn { path: String, column: &'static str },

    #[error("portfolio row {row} has an empty {column} value")]
    EmptyField { row: usize, column: &'static str },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to load embedding model {model}: {details}")]
    ModelLoad { model: String, details: String },

    #[error("collection snapshot {path} is unreadable: {details}")]
    CorruptSnapshot { path: String, details: String },

    #[error("collection {collection} was built with model {stored}, not {requested}")]
    ModelMismatch {
        collection: String,
        stored: String,
        requested: String,
    },

    #[error("collection {0} is being seeded by another process")]
    SeedLocked(String),

    #[error("persist directory {0} is not a directory")]
    NotADirectory(String),
}

impl StoreError {
    /// Failures that a fresh copy of the cached model artifact can fix.
    pub fn is_model_load(&self) -> bool {
        matches!(self, Self::ModelLoad { .. })
    }
}

#[derive(Debug, Error)]
#[error("portfolio collection could not be opened after {attempts} attempt(s): {source}")]
pub struct StoreInitError {
    pub attempts: u32,
    #[source]
    pub source: StoreError,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("portfolio store is unavailable: {reason}")]
pub struct StoreUnavailable {
    pub reason: String,
}

impl StoreUnavailable {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("unsupported url scheme {0}")]
    UnsupportedScheme(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("api error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unable to parse model output: {0}")]
    Parse(String),

    #[error("model returned empty content")]
    EmptyContent,

    #[error("no api key configured for the llm endpoint")]
    MissingApiKey,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("page {0} has no readable text")]
    EmptyPage(String),
}
