use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stachat_core::{FusionError, Query, RetrievalError, RetrievalOutcome, Retriever};
use tracing::{info, warn};

/// What the fused retriever does when one side degrades.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionPolicy {
    /// A degraded vector side contributes no documents; a degraded lexical
    /// side empties the whole result.
    #[default]
    LexicalRequired,
    /// Keep whichever side succeeded.
    BestEffort,
    /// Any degraded sub-retriever empties the whole result.
    Strict,
}

/// Runs the vector and lexical retrievers concurrently and concatenates their
/// results, vector first. No deduplication or re-ranking.
pub struct HybridRetriever {
    vector: Arc<dyn Retriever>,
    lexical: Arc<dyn Retriever>,
    timeout: Duration,
    policy: FusionPolicy,
}

impl HybridRetriever {
    pub fn new(
        vector: Arc<dyn Retriever>,
        lexical: Arc<dyn Retriever>,
        timeout: Duration,
        policy: FusionPolicy,
    ) -> Self {
        Self {
            vector,
            lexical,
            timeout,
            policy,
        }
    }

    pub fn policy(&self) -> FusionPolicy {
        self.policy
    }

    fn degraded(retriever: &dyn Retriever, err: &RetrievalError) -> RetrievalOutcome {
        RetrievalOutcome::Degraded(
            FusionError::SubRetrieverDegraded {
                retriever: retriever.name().to_string(),
                reason: err.to_string(),
            }
            .into(),
        )
    }
}

/// Run `retriever` under `timeout`; expiry counts as degradation.
async fn bounded(retriever: &dyn Retriever, query: &Query, timeout: Duration) -> RetrievalOutcome {
    match tokio::time::timeout(timeout, retriever.retrieve(query)).await {
        Ok(outcome) => outcome,
        Err(_) => {
            warn!(
                retriever = retriever.name(),
                timeout_ms = timeout.as_millis() as u64,
                "Retriever timed out"
            );
            RetrievalOutcome::Degraded(RetrievalError::Timeout {
                retriever: retriever.name(),
                timeout_ms: timeout.as_millis() as u64,
            })
        }
    }
}

#[async_trait]
impl Retriever for HybridRetriever {
    fn name(&self) -> &'static str {
        "hybrid"
    }

    async fn retrieve(&self, query: &Query) -> RetrievalOutcome {
        let (vector, lexical) = tokio::join!(
            bounded(self.vector.as_ref(), query, self.timeout),
            bounded(self.lexical.as_ref(), query, self.timeout),
        );

        let mut vector_failed = false;
        let mut docs = match vector {
            RetrievalOutcome::Retrieved(docs) => docs,
            RetrievalOutcome::Degraded(err) => {
                warn!(retriever = self.vector.name(), error = %err, "Sub-retriever degraded");
                if self.policy == FusionPolicy::Strict {
                    return Self::degraded(self.vector.as_ref(), &err);
                }
                vector_failed = true;
                Vec::new()
            }
        };
        let vector_hits = docs.len();

        match lexical {
            RetrievalOutcome::Retrieved(lexical_docs) => docs.extend(lexical_docs),
            RetrievalOutcome::Degraded(err) => {
                warn!(retriever = self.lexical.name(), error = %err, "Sub-retriever degraded");
                if self.policy != FusionPolicy::BestEffort || vector_failed {
                    return Self::degraded(self.lexical.as_ref(), &err);
                }
            }
        }

        info!(
            vector_hits,
            lexical_hits = docs.len() - vector_hits,
            vector_failed,
            "Hybrid retrieval completed"
        );
        RetrievalOutcome::Retrieved(docs)
    }
}
