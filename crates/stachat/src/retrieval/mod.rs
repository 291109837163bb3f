//! Retrieval strategies: scored vector search and vector + lexical fusion.

pub mod hybrid;
pub mod vector;

pub use hybrid::{FusionPolicy, HybridRetriever};
pub use vector::ScoredVectorRetriever;
