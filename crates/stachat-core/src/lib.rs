//! STACHAT Core Library
//!
//! This crate provides the domain and application layer for STACHAT, the
//! geospatial product catalog question-answering service.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │  Consumers (webhook, CLI)           │
//! ├─────────────────────────────────────┤
//! │  Application Layer (this crate)     │  ← Retriever / store / backend ports
//! ├─────────────────────────────────────┤
//! │  Domain Layer (this crate)          │  ← Query, CandidateDocument, errors
//! ├─────────────────────────────────────┤
//! │  Infrastructure (stachat crate)     │  ← Neo4j, tantivy, OpenAI
//! └─────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`domain`] - Value objects, candidate documents and domain errors
//! - [`application`] - Ports (traits), retrieval outcomes and layer errors

pub mod application;
pub mod domain;

pub use domain::{
    // Value Objects
    ModelId, Query,
    // Aggregates
    CandidateDocument, Metadata, RetrievalSource, SCORE_KEY,
    // Errors
    DomainError, DomainResult,
};

pub use application::{
    // Errors
    ConfigurationError, EmbeddingError, FusionError, GenerationError, RetrievalError, StoreError,
    // Ports
    DocumentStore, EmbeddingProvider, GenerationBackend, Retriever,
    // Outcomes
    RetrievalOutcome,
};
