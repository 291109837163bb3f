//! Application Layer Errors
//!
//! One enum per failure class. Retrieval-side errors are recovered locally
//! and carried inside [`RetrievalOutcome`](super::RetrievalOutcome);
//! configuration and generation errors reach the caller.

use thiserror::Error;

use crate::domain::DomainError;

/// Failure talking to the embedding service.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EmbeddingError {
    #[error("Embedding request failed: {0}")]
    Request(String),

    #[error("Embedding API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid embedding response: {0}")]
    Decode(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Failure inside the document store adapter.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("Graph store unreachable: {0}")]
    Connection(String),

    #[error("Cypher error {code}: {message}")]
    Query { code: String, message: String },

    #[error("Unexpected graph response: {0}")]
    Decode(String),

    #[error("Graph store timed out after {0} ms")]
    Timeout(u64),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
}

/// Failure of the fused retriever, naming the sub-retriever that degraded.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FusionError {
    #[error("{retriever} retriever degraded: {reason}")]
    SubRetrieverDegraded { retriever: String, reason: String },
}

/// Failure of a single retrieval strategy.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RetrievalError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Lexical search failed: {0}")]
    Lexical(String),

    #[error("{retriever} retrieval timed out after {timeout_ms} ms")]
    Timeout {
        retriever: &'static str,
        timeout_ms: u64,
    },

    #[error(transparent)]
    Fusion(#[from] FusionError),
}

/// Invalid or incomplete settings. Fatal at startup.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("Unsupported model: {model} (supported: {})", supported.join(", "))]
    UnsupportedModel { model: String, supported: Vec<String> },

    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error("Invalid setting '{field}': {message}")]
    Invalid { field: String, message: String },

    #[error("Failed to load configuration: {0}")]
    Load(String),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Failure of the language-model call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerationError {
    #[error("Generation request failed: {0}")]
    Request(String),

    #[error("Generation API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Generation timed out after {0} s")]
    Timeout(u64),

    #[error("Generation backend returned no content")]
    EmptyResponse,

    #[error("Invalid generation response: {0}")]
    Decode(String),
}
