use crate::{CollectionHit, FetchError, JobPosting, LinkMetadata, LlmError, NewEntry, StoreError};
use async_trait::async_trait;

/// A named collection of embedded documents with attached link metadata.
pub trait VectorCollection: Send {
    fn name(&self) -> &str;

    fn count(&self) -> usize;

    /// Adds `entries` only when the collection holds nothing yet.
    ///
    /// Returns `Ok(None)` when the collection was already populated. Implementations
    /// backed by a shared snapshot re-check the count under an exclusive lock.
    fn add_if_empty(&mut self, entries: Vec<NewEntry>) -> Result<Option<usize>, StoreError>;

    /// Nearest entries for each query text, closest first.
    fn query(
        &self,
        texts: &[String],
        n_results: usize,
    ) -> Result<Vec<Vec<CollectionHit>>, StoreError>;
}

#[async_trait]
pub trait PageFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

#[async_trait]
pub trait LlmChain {
    async fn extract_jobs(&self, page_text: &str) -> Result<Vec<JobPosting>, LlmError>;

    async fn write_mail(&self, job: &JobPosting, links: &[LinkMetadata]) -> Result<String, LlmError>;
}
