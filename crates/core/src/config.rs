use crate::embeddings::ModelSpec;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORTFOLIO_CSV: &str = "app/resource/my_portfolio.csv";
pub const DEFAULT_PERSIST_DIR: &str = "./vectorstore";
pub const DEFAULT_MODEL_CACHE: &str = "./.model_cache";
pub const PORTFOLIO_COLLECTION: &str = "portfolio";

pub const DEFAULT_LLM_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_LLM_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_USER_AGENT: &str = "Cold-Mail-Generator/1.0";

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub portfolio_csv: PathBuf,
    pub persist_dir: PathBuf,
    pub model_cache: PathBuf,
    pub collection: String,
    pub model: ModelSpec,
    /// Total attempts, including the first, when the embedding model fails to load.
    pub max_init_attempts: u32,
    pub retry_delay: Duration,
    pub results_per_skill: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            portfolio_csv: PathBuf::from(DEFAULT_PORTFOLIO_CSV),
            persist_dir: PathBuf::from(DEFAULT_PERSIST_DIR),
            model_cache: PathBuf::from(DEFAULT_MODEL_CACHE),
            collection: PORTFOLIO_COLLECTION.to_string(),
            model: ModelSpec::default(),
            max_init_attempts: 3,
            retry_delay: Duration::from_millis(500),
            results_per_skill: 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub temperature: f32,
    pub timeout: Duration,
    /// Retries after the first attempt, for 429 and 5xx responses only.
    pub max_retries: u32,
    /// First backoff delay; doubled for each further retry.
    pub retry_base_delay: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_LLM_BASE_URL.to_string(),
            model: DEFAULT_LLM_MODEL.to_string(),
            api_key: String::new(),
            temperature: 0.0,
            timeout: Duration::from_secs(120),
            max_retries: 3,
            retry_base_delay: Duration::from_secs(1),
        }
    }
}

/// Who the drafted emails are written on behalf of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderProfile {
    pub name: String,
    pub company: String,
}

impl Default for SenderProfile {
    fn default() -> Self {
        Self {
            name: "Alex".to_string(),
            company: "Northwind Software".to_string(),
        }
    }
}
