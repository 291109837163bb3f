//! Graph-backed document store.

pub mod graph;
pub mod neo4j_vector;

pub use graph::{GraphClient, HttpGraphClient, Row};
pub use neo4j_vector::{GraphBuildReport, Neo4jVectorStore, VectorStoreSettings};
