//! Answer pipeline and its construction.
//!
//! ```text
//! query ─┬─ ScoredVectorRetriever ─┐
//!        └─ LexicalIndex ──────────┴─ HybridRetriever ─ ContextAssembler ─ prompt ─ backend ─ answer
//! ```
//!
//! [`initialize`] wires the real Neo4j and OpenAI clients; [`assemble`] takes
//! any store and backend, which is how tests build isolated pipelines.

use std::{sync::Arc, time::Duration};

use stachat_core::{
    CandidateDocument, ConfigurationError, DocumentStore, GenerationBackend, GenerationError,
    Query, RetrievalOutcome, Retriever, StoreError,
};
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    config::StachatConfig,
    embeddings::OpenAiEmbeddings,
    generation::{OpenAiChatBackend, PromptTemplate},
    lexical::{LexicalConfig, LexicalError, LexicalIndex},
    retrieval::{HybridRetriever, ScoredVectorRetriever},
    store::{GraphBuildReport, HttpGraphClient, Neo4jVectorStore, VectorStoreSettings},
};

/// Startup failures. All of them are fatal.
#[derive(Debug, Error)]
pub enum InitError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("Document store initialization failed: {0}")]
    Store(#[from] StoreError),

    #[error("Lexical index initialization failed: {0}")]
    Lexical(#[from] LexicalError),
}

/// Turns candidates into the `{context}` string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextAssembler {
    /// Multiply each score by this factor and append it to the content.
    pub score_scale: Option<f64>,
    /// Character budget; candidates that would overflow it are dropped along
    /// with everything after them.
    pub max_chars: Option<usize>,
}

impl ContextAssembler {
    pub fn from_config(config: &StachatConfig) -> Self {
        Self {
            score_scale: config
                .generation
                .score_tagging
                .then_some(config.generation.score_scale),
            max_chars: config.generation.max_context_chars,
        }
    }

    /// Join candidate contents with `\n`, in list order.
    pub fn assemble(&self, mut documents: Vec<CandidateDocument>) -> String {
        if let Some(scale) = self.score_scale {
            for doc in &mut documents {
                if let Some(score) = doc.score() {
                    let scaled = score * scale;
                    doc.set_score(scaled);
                    doc.content.push_str(&format!("\nScore: {}", scaled));
                }
            }
        }

        let mut context = String::new();
        let mut used = 0usize;
        for (i, doc) in documents.iter().enumerate() {
            let separator = usize::from(i > 0);
            let cost = separator + doc.content.chars().count();
            if let Some(max) = self.max_chars {
                if used + cost > max {
                    warn!(
                        kept = i,
                        dropped = documents.len() - i,
                        max_chars = max,
                        "Context budget reached"
                    );
                    break;
                }
            }
            if separator == 1 {
                context.push('\n');
            }
            context.push_str(&doc.content);
            used += cost;
        }
        context
    }
}

/// Query → retrieve → prompt → generate.
pub struct AnswerPipeline {
    retriever: Arc<dyn Retriever>,
    backend: Arc<dyn GenerationBackend>,
    template: PromptTemplate,
    assembler: ContextAssembler,
    generation_timeout: Duration,
}

impl AnswerPipeline {
    pub fn new(
        retriever: Arc<dyn Retriever>,
        backend: Arc<dyn GenerationBackend>,
        template: PromptTemplate,
        assembler: ContextAssembler,
        generation_timeout: Duration,
    ) -> Self {
        Self {
            retriever,
            backend,
            template,
            assembler,
            generation_timeout,
        }
    }

    pub fn backend(&self) -> &dyn GenerationBackend {
        self.backend.as_ref()
    }

    /// Retrieve for `query` and render the full prompt. Degraded retrieval
    /// yields an empty context rather than an error.
    pub async fn assemble_prompt(&self, query: &Query) -> String {
        let outcome = self.retriever.retrieve(query).await;
        if let RetrievalOutcome::Degraded(err) = &outcome {
            warn!(error = %err, "Retrieval degraded; answering with empty context");
        }
        let context = self.assembler.assemble(outcome.into_documents());
        self.template.render(&context, query.as_str())
    }

    pub async fn answer(&self, query: &Query) -> Result<String, GenerationError> {
        let prompt = self.assemble_prompt(query).await;
        let answer = tokio::time::timeout(self.generation_timeout, self.backend.complete(&prompt))
            .await
            .map_err(|_| GenerationError::Timeout(self.generation_timeout.as_secs()))??;
        info!(
            model = %self.backend.model(),
            answer_chars = answer.len(),
            "Answer generated"
        );
        Ok(answer)
    }
}

/// A ready pipeline plus the pieces the CLI and tests inspect.
pub struct PipelineContext {
    pub pipeline: Arc<AnswerPipeline>,
    pub lexical: Arc<LexicalIndex>,
    pub build_report: Option<GraphBuildReport>,
}

/// Build the pipeline over an arbitrary store and backend.
///
/// Takes the lexical snapshot immediately; it is never refreshed.
pub async fn assemble(
    config: &StachatConfig,
    store: Arc<dyn DocumentStore>,
    backend: Arc<dyn GenerationBackend>,
) -> Result<PipelineContext, InitError> {
    let template = config.prompt_template()?;
    let retrieval = &config.retrieval;

    let lexical = Arc::new(
        LexicalIndex::build(
            store.as_ref(),
            &retrieval.snapshot_source(),
            LexicalConfig {
                top_k: retrieval.lexical_top_k,
                match_only: retrieval.lexical_match_only,
                ..LexicalConfig::default()
            },
        )
        .await?,
    );
    let vector = Arc::new(ScoredVectorRetriever::new(store, retrieval.vector_top_k));
    let hybrid = Arc::new(HybridRetriever::new(
        vector,
        lexical.clone(),
        Duration::from_millis(retrieval.timeout_ms),
        retrieval.fusion_policy,
    ));

    let pipeline = AnswerPipeline::new(
        hybrid,
        backend,
        template,
        ContextAssembler::from_config(config),
        Duration::from_secs(config.generation.timeout_secs),
    );

    Ok(PipelineContext {
        pipeline: Arc::new(pipeline),
        lexical,
        build_report: None,
    })
}

/// Build the generation backend. Fails on an unsupported model before any
/// network call.
pub fn chat_backend(config: &StachatConfig) -> Result<OpenAiChatBackend, ConfigurationError> {
    OpenAiChatBackend::new(
        config.openai.api_key.clone().unwrap_or_default(),
        config.openai.base_url.as_str(),
        &config.generation.model,
        &config.allow_list(),
        Duration::from_secs(config.generation.timeout_secs),
    )
}

/// Connect the Neo4j store. With `build` set, the vector index is created if
/// absent and missing embeddings are back-filled first.
pub async fn connect_store(
    config: &StachatConfig,
    build: bool,
) -> Result<(Neo4jVectorStore, Option<GraphBuildReport>), InitError> {
    let neo4j = &config.neo4j;
    let timeout = Duration::from_secs(neo4j.request_timeout_secs);

    let graph = Arc::new(HttpGraphClient::new(
        &neo4j.uri,
        neo4j.username.as_str(),
        neo4j.password.as_str(),
        &neo4j.database,
        timeout,
    )?);
    let embedder = Arc::new(OpenAiEmbeddings::new(
        config.openai.api_key.clone().unwrap_or_default(),
        config.openai.base_url.as_str(),
        config.openai.embedding_model.as_str(),
        config.openai.embedding_dimension,
        timeout,
    )?);
    let settings = VectorStoreSettings {
        index_name: neo4j.index_name.clone(),
        node_label: neo4j.node_label.clone(),
        text_properties: neo4j.text_properties.clone(),
        embedding_property: neo4j.embedding_property.clone(),
    };

    if build {
        let (store, report) = Neo4jVectorStore::from_existing_graph(
            graph,
            embedder,
            settings,
            neo4j.embedding_batch_size,
        )
        .await?;
        Ok((store, Some(report)))
    } else {
        Ok((Neo4jVectorStore::new(graph, embedder, settings), None))
    }
}

/// Validate configuration, connect to Neo4j and OpenAI, and build the pipeline.
pub async fn initialize(config: &StachatConfig) -> Result<PipelineContext, InitError> {
    config.validate()?;
    let backend = Arc::new(chat_backend(config)?);
    let (store, report) = connect_store(config, config.neo4j.build_on_startup).await?;

    let mut context = assemble(config, Arc::new(store), backend).await?;
    context.build_report = report;
    info!(
        model = %config.generation.model,
        lexical_documents = context.lexical.len(),
        fusion_policy = ?config.retrieval.fusion_policy,
        "Pipeline initialized"
    );
    Ok(context)
}
