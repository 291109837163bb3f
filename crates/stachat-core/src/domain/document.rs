//! Candidate documents produced by the retrieval paths.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata key holding a candidate's numeric relevance score.
pub const SCORE_KEY: &str = "score";

/// Attribute name → value mapping attached to each candidate.
pub type Metadata = Map<String, Value>;

/// Which retrieval path produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalSource {
    Vector,
    Lexical,
}

impl fmt::Display for RetrievalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetrievalSource::Vector => write!(f, "vector"),
            RetrievalSource::Lexical => write!(f, "lexical"),
        }
    }
}

/// A per-query document derived from one product node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateDocument {
    pub content: String,
    pub metadata: Metadata,
    /// Stable identifier of the originating node, when the store exposes one.
    pub node_id: Option<String>,
    pub source: RetrievalSource,
}

impl CandidateDocument {
    pub fn new(content: impl Into<String>, source: RetrievalSource) -> Self {
        Self {
            content: content.into(),
            metadata: Metadata::new(),
            node_id: None,
            source,
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_node_id(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }

    /// Numeric score stored in metadata, if any.
    pub fn score(&self) -> Option<f64> {
        self.metadata.get(SCORE_KEY).and_then(Value::as_f64)
    }

    /// Write `score` into metadata. Non-finite values are stored as 0.0 since
    /// JSON cannot represent them.
    pub fn set_score(&mut self, score: f64) {
        let number = serde_json::Number::from_f64(score)
            .unwrap_or_else(|| serde_json::Number::from(0));
        self.metadata
            .insert(SCORE_KEY.to_string(), Value::Number(number));
    }
}
