//! Explicit result of a retrieval step.

use crate::application::errors::RetrievalError;
use crate::domain::CandidateDocument;

/// What a retriever produced.
///
/// `Degraded` always carries zero documents. Callers decide whether to
/// proceed; the pipeline does, with an empty context.
#[derive(Debug, Clone, PartialEq)]
pub enum RetrievalOutcome {
    Retrieved(Vec<CandidateDocument>),
    Degraded(RetrievalError),
}

impl RetrievalOutcome {
    pub fn documents(&self) -> &[CandidateDocument] {
        match self {
            RetrievalOutcome::Retrieved(docs) => docs,
            RetrievalOutcome::Degraded(_) => &[],
        }
    }

    pub fn into_documents(self) -> Vec<CandidateDocument> {
        match self {
            RetrievalOutcome::Retrieved(docs) => docs,
            RetrievalOutcome::Degraded(_) => Vec::new(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, RetrievalOutcome::Degraded(_))
    }

    pub fn degradation(&self) -> Option<&RetrievalError> {
        match self {
            RetrievalOutcome::Degraded(err) => Some(err),
            RetrievalOutcome::Retrieved(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.documents().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents().is_empty()
    }
}

impl From<Result<Vec<CandidateDocument>, RetrievalError>> for RetrievalOutcome {
    fn from(result: Result<Vec<CandidateDocument>, RetrievalError>) -> Self {
        match result {
            Ok(docs) => RetrievalOutcome::Retrieved(docs),
            Err(err) => RetrievalOutcome::Degraded(err),
        }
    }
}
