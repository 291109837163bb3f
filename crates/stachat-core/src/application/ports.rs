//! Application Ports
//!
//! Traits implemented by the infrastructure crate. Tests implement them with
//! in-memory fakes.

use async_trait::async_trait;

use crate::application::errors::{EmbeddingError, GenerationError, StoreError};
use crate::application::outcome::RetrievalOutcome;
use crate::domain::{CandidateDocument, ModelId, Query};

/// A retrieval strategy: query in, candidate documents out.
///
/// Implementations never return an error; failures are reported as
/// [`RetrievalOutcome::Degraded`].
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Short name used in logs and fusion errors.
    fn name(&self) -> &'static str;

    async fn retrieve(&self, query: &Query) -> RetrievalOutcome;
}

/// Searchable view over the product nodes in the graph.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Up to `k` documents ranked by descending similarity, with their scores.
    async fn similarity_search_with_score(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<(CandidateDocument, f32)>, StoreError>;

    async fn similarity_search(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<CandidateDocument>, StoreError> {
        let scored = self.similarity_search_with_score(query, k).await?;
        Ok(scored.into_iter().map(|(doc, _)| doc).collect())
    }

    /// Every labelled node rendered as a document.
    async fn all_documents(&self) -> Result<Vec<CandidateDocument>, StoreError>;
}

/// Text → dense vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn dimension(&self) -> usize;

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Prompt → completion text.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    fn model(&self) -> &ModelId;

    async fn complete(&self, prompt: &str) -> Result<String, GenerationError>;
}
