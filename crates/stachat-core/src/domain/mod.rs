//! Domain layer: pure types with no I/O.

pub mod document;
pub mod errors;
pub mod value_objects;

pub use document::{CandidateDocument, Metadata, RetrievalSource, SCORE_KEY};
pub use errors::{DomainError, DomainResult};
pub use value_objects::{ModelId, Query};
