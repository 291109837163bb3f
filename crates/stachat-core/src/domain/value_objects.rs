//! Domain Value Objects
//!
//! Immutable, validated types. Value objects validate structure only.

use std::fmt;

use crate::domain::errors::{DomainError, DomainResult};

/// A single natural-language question.
///
/// Created when a request arrives, consumed by one pipeline invocation and
/// dropped once the answer is returned. Carries no session state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Query {
    text: String,
}

impl Query {
    pub fn new(text: impl Into<String>) -> DomainResult<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(DomainError::InvalidQuery(
                "question cannot be empty".to_string(),
            ));
        }
        Ok(Self { text })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl AsRef<str> for Query {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

/// Identifier of a text-generation model, e.g. `gpt-4-turbo`.
///
/// Structural validation only; membership in the allow-list is checked by the
/// infrastructure layer when the backend is constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelId(String);

impl ModelId {
    pub fn new(id: impl Into<String>) -> DomainResult<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(DomainError::InvalidModelId(
                "model identifier cannot be empty".to_string(),
            ));
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(DomainError::InvalidModelId(format!(
                "model identifier '{}' contains whitespace",
                trimmed
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_rejects_blank_text() {
        assert!(Query::new("").is_err());
        assert!(Query::new("   \n\t").is_err());
    }

    #[test]
    fn query_keeps_raw_text() {
        let query = Query::new("  What is Sentinel-2?  ").unwrap();
        assert_eq!(query.as_str(), "  What is Sentinel-2?  ");
    }

    #[test]
    fn query_has_no_length_cap() {
        let text = "a".repeat(100_000);
        assert_eq!(Query::new(text).unwrap().as_str().len(), 100_000);
    }

    #[test]
    fn model_id_is_trimmed() {
        let id = ModelId::new(" gpt-4-turbo ").unwrap();
        assert_eq!(id.as_str(), "gpt-4-turbo");
    }

    #[test]
    fn model_id_rejects_inner_whitespace() {
        assert!(ModelId::new("gpt 4").is_err());
        assert!(ModelId::new("").is_err());
    }
}
