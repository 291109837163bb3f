use std::sync::Arc;

use async_trait::async_trait;
use stachat_core::{
    DocumentStore, Query, RetrievalError, RetrievalOutcome, RetrievalSource, Retriever,
};
use tracing::{debug, error};

/// Vector similarity search that records each hit's score in its metadata.
///
/// A store failure is logged and reported as a degraded, empty outcome.
pub struct ScoredVectorRetriever {
    store: Arc<dyn DocumentStore>,
    top_k: usize,
}

impl ScoredVectorRetriever {
    pub fn new(store: Arc<dyn DocumentStore>, top_k: usize) -> Self {
        Self { store, top_k }
    }
}

#[async_trait]
impl Retriever for ScoredVectorRetriever {
    fn name(&self) -> &'static str {
        "vector"
    }

    async fn retrieve(&self, query: &Query) -> RetrievalOutcome {
        match self
            .store
            .similarity_search_with_score(query.as_str(), self.top_k)
            .await
        {
            Ok(scored) => {
                let docs: Vec<_> = scored
                    .into_iter()
                    .map(|(mut doc, score)| {
                        doc.set_score(score as f64);
                        doc.source = RetrievalSource::Vector;
                        doc
                    })
                    .collect();
                debug!(hits = docs.len(), "Vector retrieval completed");
                RetrievalOutcome::Retrieved(docs)
            }
            Err(err) => {
                error!("Error retrieving documents: {}", err);
                RetrievalOutcome::Degraded(RetrievalError::Store(err))
            }
        }
    }
}
