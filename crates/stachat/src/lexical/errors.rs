use stachat_core::{RetrievalError, StoreError};
use thiserror::Error;

pub type LexicalResult<T> = Result<T, LexicalError>;

#[derive(Debug, Error)]
pub enum LexicalError {
    #[error("Tantivy error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),

    #[error("Snapshot failed: {0}")]
    Snapshot(#[from] StoreError),

    #[error("Hit references unknown snapshot ordinal {0}")]
    UnknownOrdinal(u64),
}

impl From<LexicalError> for RetrievalError {
    fn from(err: LexicalError) -> Self {
        match err {
            LexicalError::Snapshot(store) => RetrievalError::Store(store),
            other => RetrievalError::Lexical(other.to_string()),
        }
    }
}
