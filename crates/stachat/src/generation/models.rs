use stachat_core::{ConfigurationError, ModelId};

/// Chat models the service may be configured with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelAllowList {
    models: Vec<String>,
}

impl ModelAllowList {
    pub fn new<I, S>(models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            models: models.into_iter().map(Into::into).collect(),
        }
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn contains(&self, id: &str) -> bool {
        self.models.iter().any(|m| m == id)
    }

    /// Validate `requested` and check it is allowed.
    pub fn resolve(&self, requested: &str) -> Result<ModelId, ConfigurationError> {
        let model = ModelId::new(requested)?;
        if self.contains(model.as_str()) {
            Ok(model)
        } else {
            Err(ConfigurationError::UnsupportedModel {
                model: model.to_string(),
                supported: self.models.clone(),
            })
        }
    }
}

impl Default for ModelAllowList {
    fn default() -> Self {
        Self::new(["gpt-3.5-turbo", "gpt-4-turbo"])
    }
}
