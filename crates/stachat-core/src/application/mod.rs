//! Application layer: ports implemented by infrastructure, plus the
//! error taxonomy shared across layers.

pub mod errors;
pub mod outcome;
pub mod ports;

pub use errors::{
    ConfigurationError, EmbeddingError, FusionError, GenerationError, RetrievalError, StoreError,
};
pub use outcome::RetrievalOutcome;
pub use ports::{DocumentStore, EmbeddingProvider, GenerationBackend, Retriever};
