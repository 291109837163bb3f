//! In-memory BM25 index over a one-time snapshot of the document store.

pub mod errors;
pub mod index;
pub mod schema;

pub use errors::{LexicalError, LexicalResult};
pub use index::{LexicalConfig, LexicalIndex, SnapshotSource};
pub use schema::LexicalSchema;
