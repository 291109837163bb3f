//! Configuration management for STACHAT
//!
//! Sources, lowest priority first:
//! 1. built-in defaults
//! 2. `stachat.toml` in the working directory (or the `--config` path)
//! 3. `STACHAT__SECTION__KEY` environment variables
//!
//! The well-known variables `OPENAI_API_KEY`, `NEO4J_URI`, `NEO4J_USERNAME`
//! and `NEO4J_PASSWORD` fill any credential left unset by the layers above.

use std::path::Path;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use stachat_core::{ConfigurationError, ModelId};

use crate::generation::{ModelAllowList, PromptTemplate};
use crate::lexical::SnapshotSource;
use crate::retrieval::FusionPolicy;

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "stachat.toml";

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "STACHAT";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StachatConfig {
    pub server: ServerConfig,
    pub neo4j: Neo4jConfig,
    pub openai: OpenAiConfig,
    pub retrieval: RetrievalConfig,
    pub generation: GenerationConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Shared secret for the webhook signature. While unset, every webhook
    /// request is rejected unless `allow_unsigned` is true.
    pub webhook_secret: Option<String>,
    pub signature_header: String,
    /// Accept unsigned requests when no secret is configured.
    pub allow_unsigned: bool,
    /// Longest accepted question, in characters. Unset means no limit.
    pub max_question_chars: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            webhook_secret: None,
            signature_header: "X-Hub-Signature-256".to_string(),
            allow_unsigned: false,
            max_question_chars: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Neo4jConfig {
    pub uri: String,
    pub username: String,
    pub password: String,
    pub database: String,
    pub index_name: String,
    pub node_label: String,
    /// Attributes rendered into each document, in this order.
    pub text_properties: Vec<String>,
    pub embedding_property: String,
    /// Nodes embedded per round trip while back-filling.
    pub embedding_batch_size: usize,
    pub request_timeout_secs: u64,
    /// Create the vector index and back-fill missing embeddings on startup.
    pub build_on_startup: bool,
}

impl Default for Neo4jConfig {
    fn default() -> Self {
        Self {
            uri: String::new(),
            username: String::new(),
            password: String::new(),
            database: "neo4j".to_string(),
            index_name: "index_for_Product".to_string(),
            node_label: "Product".to_string(),
            text_properties: [
                "name",
                "date",
                "sensorType",
                "organization",
                "orbitType",
                "spatialExtent",
                "instrument",
                "isoStandard",
                "visualizationUrl",
                "referenceSystem",
                "platform",
                "compositeType",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            embedding_property: "embedding".to_string(),
            embedding_batch_size: 64,
            request_timeout_secs: 30,
            build_on_startup: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub embedding_model: String,
    pub embedding_dimension: usize,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            embedding_model: "text-embedding-ada-002".to_string(),
            embedding_dimension: 1536,
        }
    }
}

/// How the lexical snapshot is taken at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotMode {
    SeedQuery,
    FullCorpus,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Documents requested from the vector index per query.
    pub vector_top_k: usize,
    /// Documents returned by the lexical index per query.
    pub lexical_top_k: usize,
    /// Per sub-retriever deadline.
    pub timeout_ms: u64,
    pub fusion_policy: FusionPolicy,
    /// Drop lexical candidates that share no term with the question instead
    /// of padding to `lexical_top_k` with zero-score documents.
    pub lexical_match_only: bool,
    pub snapshot_mode: SnapshotMode,
    pub seed_query: String,
    pub seed_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            vector_top_k: 4,
            lexical_top_k: 4,
            timeout_ms: 10_000,
            fusion_policy: FusionPolicy::LexicalRequired,
            lexical_match_only: false,
            snapshot_mode: SnapshotMode::SeedQuery,
            seed_query: "query".to_string(),
            seed_k: 4,
        }
    }
}

impl RetrievalConfig {
    pub fn snapshot_source(&self) -> SnapshotSource {
        match self.snapshot_mode {
            SnapshotMode::SeedQuery => SnapshotSource::SeedQuery {
                query: self.seed_query.clone(),
                k: self.seed_k,
            },
            SnapshotMode::FullCorpus => SnapshotSource::FullCorpus,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub model: String,
    pub supported_models: Vec<String>,
    pub timeout_secs: u64,
    /// Append `Score: <n>` to each candidate before it enters the prompt.
    pub score_tagging: bool,
    pub score_scale: f64,
    /// Context budget in characters; whole candidates are dropped past it.
    pub max_context_chars: Option<usize>,
    /// Overrides the built-in prompt. Must contain `{context}` and `{question}`.
    pub prompt_template: Option<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            supported_models: vec!["gpt-3.5-turbo".to_string(), "gpt-4-turbo".to_string()],
            timeout_secs: 60,
            score_tagging: false,
            score_scale: 10.0,
            max_context_chars: None,
            prompt_template: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl StachatConfig {
    /// Load configuration from all sources with cascading priority.
    ///
    /// An explicit `path` must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigurationError> {
        let defaults = Config::try_from(&Self::default()).map_err(load_error)?;
        let file = match path {
            Some(path) => File::from(path.to_path_buf()).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let built = Config::builder()
            .add_source(defaults)
            .add_source(file)
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .map_err(load_error)?;

        let mut config: StachatConfig = built.try_deserialize().map_err(load_error)?;
        config.apply_env_fallbacks(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Fill unset credentials from well-known variables.
    pub fn apply_env_fallbacks<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());

        if !present(&self.openai.api_key) {
            if let Some(key) = lookup("OPENAI_API_KEY") {
                self.openai.api_key = Some(key);
            }
        }
        for (field, var) in [
            (&mut self.neo4j.uri, "NEO4J_URI"),
            (&mut self.neo4j.username, "NEO4J_USERNAME"),
            (&mut self.neo4j.password, "NEO4J_PASSWORD"),
        ] {
            if field.trim().is_empty() {
                if let Some(value) = lookup(var) {
                    *field = value;
                }
            }
        }
    }

    /// Check settings needed before any external call is made.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self
            .openai
            .api_key
            .as_deref()
            .map_or(true, |k| k.trim().is_empty())
        {
            return Err(ConfigurationError::MissingCredential(
                "OPENAI_API_KEY".to_string(),
            ));
        }
        for (value, name) in [
            (&self.neo4j.uri, "NEO4J_URI"),
            (&self.neo4j.username, "NEO4J_USERNAME"),
            (&self.neo4j.password, "NEO4J_PASSWORD"),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigurationError::MissingCredential(name.to_string()));
            }
        }

        if self.neo4j.text_properties.is_empty() {
            return Err(invalid("neo4j.text_properties", "at least one attribute is required"));
        }
        if self.neo4j.embedding_property.trim().is_empty() {
            return Err(invalid("neo4j.embedding_property", "cannot be empty"));
        }
        if self.neo4j.embedding_batch_size == 0 {
            return Err(invalid("neo4j.embedding_batch_size", "must be greater than 0"));
        }
        if self.openai.embedding_dimension == 0 {
            return Err(invalid("openai.embedding_dimension", "must be greater than 0"));
        }
        if self.retrieval.vector_top_k == 0 {
            return Err(invalid("retrieval.vector_top_k", "must be greater than 0"));
        }
        if self.retrieval.lexical_top_k == 0 {
            return Err(invalid("retrieval.lexical_top_k", "must be greater than 0"));
        }
        if self.retrieval.timeout_ms == 0 {
            return Err(invalid("retrieval.timeout_ms", "must be greater than 0"));
        }
        if self.retrieval.snapshot_mode == SnapshotMode::SeedQuery && self.retrieval.seed_k == 0 {
            return Err(invalid("retrieval.seed_k", "must be greater than 0"));
        }
        if self.server.max_question_chars == Some(0) {
            return Err(invalid("server.max_question_chars", "must be greater than 0"));
        }
        if self.generation.timeout_secs == 0 {
            return Err(invalid("generation.timeout_secs", "must be greater than 0"));
        }
        if !self.generation.score_scale.is_finite() {
            return Err(invalid("generation.score_scale", "must be a finite number"));
        }
        self.prompt_template()?;

        self.resolve_model()?;
        Ok(())
    }

    /// The configured prompt, or the built-in one.
    pub fn prompt_template(&self) -> Result<PromptTemplate, ConfigurationError> {
        match &self.generation.prompt_template {
            Some(template) => PromptTemplate::new(template.as_str()),
            None => Ok(PromptTemplate::default()),
        }
    }

    pub fn allow_list(&self) -> ModelAllowList {
        ModelAllowList::new(self.generation.supported_models.iter().cloned())
    }

    /// Resolve the configured model against the allow-list.
    pub fn resolve_model(&self) -> Result<ModelId, ConfigurationError> {
        self.allow_list().resolve(&self.generation.model)
    }
}

fn load_error(err: config::ConfigError) -> ConfigurationError {
    ConfigurationError::Load(err.to_string())
}

fn invalid(field: &str, message: &str) -> ConfigurationError {
    ConfigurationError::Invalid {
        field: field.to_string(),
        message: message.to_string(),
    }
}
