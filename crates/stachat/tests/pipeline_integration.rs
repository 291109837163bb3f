//! End-to-end pipeline behaviour over in-memory fakes.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use proptest::prelude::*;
use stachat::{
    config::StachatConfig,
    generation::PromptTemplate,
    lexical::{LexicalConfig, LexicalIndex, SnapshotSource},
    pipeline::{assemble, AnswerPipeline, ContextAssembler},
    retrieval::{FusionPolicy, HybridRetriever, ScoredVectorRetriever},
};
use stachat_core::{
    CandidateDocument, DocumentStore, GenerationBackend, GenerationError, ModelId, Query,
    RetrievalError, RetrievalOutcome, RetrievalSource, Retriever, StoreError,
};

const COASTAL_QUESTION: &str = "What satellite data is available for coastal monitoring?";

/// Four products; three of them share words with the coastal question.
fn catalog() -> Vec<CandidateDocument> {
    [
        "name: Sentinel-2 MSI\ntitle: Coastal water quality imagery",
        "name: Landsat 9\ntitle: Satellite data for shoreline change",
        "name: CMEMS\ntitle: Coastal monitoring sea level products",
        "name: SRTM\ntitle: Terrain elevation grid",
    ]
    .into_iter()
    .enumerate()
    .map(|(i, content)| {
        CandidateDocument::new(content, RetrievalSource::Vector).with_node_id(format!("4:db:{}", i))
    })
    .collect()
}

struct CatalogStore {
    documents: Mutex<Vec<CandidateDocument>>,
    failing: AtomicBool,
}

impl CatalogStore {
    fn new(documents: Vec<CandidateDocument>) -> Arc<Self> {
        Arc::new(Self {
            documents: Mutex::new(documents),
            failing: AtomicBool::new(false),
        })
    }

    fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    fn insert(&self, document: CandidateDocument) {
        self.documents.lock().unwrap().insert(0, document);
    }
}

#[async_trait]
impl DocumentStore for CatalogStore {
    async fn similarity_search_with_score(
        &self,
        _query: &str,
        k: usize,
    ) -> Result<Vec<(CandidateDocument, f32)>, StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Connection("neo4j unavailable".to_string()));
        }
        Ok(self
            .documents
            .lock()
            .unwrap()
            .iter()
            .take(k)
            .enumerate()
            .map(|(i, doc)| (doc.clone(), 0.95 - i as f32 * 0.05))
            .collect())
    }

    async fn all_documents(&self) -> Result<Vec<CandidateDocument>, StoreError> {
        Ok(self.documents.lock().unwrap().clone())
    }
}

struct RecordingBackend {
    model: ModelId,
    prompts: Mutex<Vec<String>>,
}

impl RecordingBackend {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            model: ModelId::new("gpt-3.5-turbo").unwrap(),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationBackend for RecordingBackend {
    fn model(&self) -> &ModelId {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        let mut prompts = self.prompts.lock().unwrap();
        prompts.push(prompt.to_string());
        Ok(format!("answer {}", prompts.len()))
    }
}

async fn hybrid_over(
    store: Arc<CatalogStore>,
    policy: FusionPolicy,
    lexical_top_k: usize,
) -> HybridRetriever {
    let lexical = LexicalIndex::build(
        store.as_ref(),
        &SnapshotSource::SeedQuery {
            query: "query".to_string(),
            k: 4,
        },
        LexicalConfig {
            top_k: lexical_top_k,
            ..LexicalConfig::default()
        },
    )
    .await
    .unwrap();
    HybridRetriever::new(
        Arc::new(ScoredVectorRetriever::new(store, 4)),
        Arc::new(lexical),
        Duration::from_secs(5),
        policy,
    )
}

fn first_lines(documents: &[CandidateDocument]) -> Vec<&str> {
    documents
        .iter()
        .map(|doc| doc.content.lines().next().unwrap_or_default())
        .collect()
}

#[tokio::test]
async fn test_coastal_question_fuses_four_vector_and_three_lexical() {
    let hybrid = hybrid_over(CatalogStore::new(catalog()), FusionPolicy::default(), 3).await;
    let query = Query::new(COASTAL_QUESTION).unwrap();

    let outcome = hybrid.retrieve(&query).await;
    let documents = outcome.documents();

    assert!(!outcome.is_degraded());
    assert_eq!(documents.len(), 7);
    for (i, doc) in documents[..4].iter().enumerate() {
        assert_eq!(doc.source, RetrievalSource::Vector);
        let expected = 0.95 - i as f32 * 0.05;
        assert!((doc.score().unwrap() - expected as f64).abs() < 1e-6);
        assert_eq!(doc.node_id.as_deref(), Some(format!("4:db:{}", i).as_str()));
    }
    for doc in &documents[4..] {
        assert_eq!(doc.source, RetrievalSource::Lexical);
        assert!(doc.score().unwrap() > 0.0);
        assert!(!doc.content.contains("SRTM"));
    }
}

#[tokio::test]
async fn test_lexical_side_pads_snapshot_with_zero_scores() {
    let hybrid = hybrid_over(CatalogStore::new(catalog()), FusionPolicy::default(), 4).await;

    let outcome = hybrid.retrieve(&Query::new(COASTAL_QUESTION).unwrap()).await;
    let documents = outcome.documents();

    assert_eq!(documents.len(), 8);
    let last = &documents[7];
    assert_eq!(last.source, RetrievalSource::Lexical);
    assert!(last.content.starts_with("name: SRTM"));
    assert_eq!(last.score(), Some(0.0));
}

#[tokio::test]
async fn test_vector_failure_yields_empty_degraded_outcome() {
    let store = CatalogStore::new(catalog());
    store.fail();
    let retriever = ScoredVectorRetriever::new(store, 4);

    let outcome = retriever
        .retrieve(&Query::new(COASTAL_QUESTION).unwrap())
        .await;
    assert!(outcome.is_degraded());
    assert!(outcome.is_empty());
}

#[tokio::test]
async fn test_vector_failure_keeps_lexical_results() {
    let store = CatalogStore::new(catalog());
    let hybrid = hybrid_over(store.clone(), FusionPolicy::default(), 3).await;
    store.fail();

    let outcome = hybrid.retrieve(&Query::new(COASTAL_QUESTION).unwrap()).await;
    assert!(matches!(outcome, RetrievalOutcome::Retrieved(_)));
    assert_eq!(outcome.len(), 3);
    assert!(outcome
        .documents()
        .iter()
        .all(|doc| doc.source == RetrievalSource::Lexical));
}

#[tokio::test]
async fn test_strict_fusion_empties_list_when_vector_side_fails() {
    let store = CatalogStore::new(catalog());
    let hybrid = hybrid_over(store.clone(), FusionPolicy::Strict, 3).await;
    store.fail();

    let outcome = hybrid.retrieve(&Query::new(COASTAL_QUESTION).unwrap()).await;
    assert!(outcome.is_degraded());
    assert!(outcome.is_empty());
}

#[tokio::test]
async fn test_vector_failure_still_answers_from_lexical_snapshot() {
    let store = CatalogStore::new(catalog());
    let backend = RecordingBackend::new();
    let context = assemble(&StachatConfig::default(), store.clone(), backend.clone())
        .await
        .unwrap();
    store.fail();

    let answer = context
        .pipeline
        .answer(&Query::new(COASTAL_QUESTION).unwrap())
        .await
        .unwrap();

    assert_eq!(answer, "answer 1");
    let prompts = backend.prompts();
    assert_eq!(prompts.len(), 1);
    for name in ["Sentinel-2 MSI", "Landsat 9", "CMEMS", "SRTM"] {
        assert_eq!(prompts[0].matches(&format!("name: {}", name)).count(), 1);
    }
    assert!(prompts[0].contains(COASTAL_QUESTION));
}

struct UnavailableIndex;

#[async_trait]
impl Retriever for UnavailableIndex {
    fn name(&self) -> &'static str {
        "lexical"
    }

    async fn retrieve(&self, _query: &Query) -> RetrievalOutcome {
        RetrievalOutcome::Degraded(RetrievalError::Lexical("index unavailable".to_string()))
    }
}

#[tokio::test]
async fn test_lexical_failure_reaches_generation_with_empty_context() {
    let store = CatalogStore::new(catalog());
    let backend = RecordingBackend::new();
    let hybrid = HybridRetriever::new(
        Arc::new(ScoredVectorRetriever::new(store, 4)),
        Arc::new(UnavailableIndex),
        Duration::from_secs(5),
        FusionPolicy::default(),
    );
    let pipeline = AnswerPipeline::new(
        Arc::new(hybrid),
        backend.clone(),
        PromptTemplate::default(),
        ContextAssembler::default(),
        Duration::from_secs(5),
    );

    let answer = pipeline
        .answer(&Query::new(COASTAL_QUESTION).unwrap())
        .await
        .unwrap();

    assert_eq!(answer, "answer 1");
    let prompt = &backend.prompts()[0];
    assert!(prompt.contains("following context:\n\n\nInstructions:"));
    assert!(!prompt.contains("name: "));
}

#[tokio::test]
async fn test_prompt_contains_fused_context_in_order() {
    let backend = RecordingBackend::new();
    let context = assemble(&StachatConfig::default(), CatalogStore::new(catalog()), backend.clone())
        .await
        .unwrap();

    context
        .pipeline
        .answer(&Query::new(COASTAL_QUESTION).unwrap())
        .await
        .unwrap();

    let prompt = &backend.prompts()[0];
    let names = ["name: Sentinel-2 MSI", "name: Landsat 9", "name: CMEMS", "name: SRTM"];
    let first: Vec<usize> = names.iter().map(|n| prompt.find(n).unwrap()).collect();
    assert!(first.windows(2).all(|pair| pair[0] < pair[1]));
    for name in names {
        assert_eq!(prompt.matches(name).count(), 2);
    }
    let srtm_last = prompt.rfind("name: SRTM").unwrap();
    assert!(names[..3].iter().all(|n| prompt.rfind(n).unwrap() < srtm_last));
}

#[tokio::test]
async fn test_lexical_snapshot_does_not_see_later_writes() {
    let store = CatalogStore::new(catalog());
    let context = assemble(&StachatConfig::default(), store.clone(), RecordingBackend::new())
        .await
        .unwrap();

    store.insert(
        CandidateDocument::new("name: Coastal radar\ntitle: Coastal monitoring", RetrievalSource::Vector),
    );

    assert_eq!(context.lexical.len(), 4);
    let hits = context.lexical.search("radar", 4).unwrap();
    assert_eq!(hits.len(), 4);
    assert!(hits.iter().all(|doc| !doc.content.contains("radar")));
    assert!(hits.iter().all(|doc| doc.score() == Some(0.0)));
    assert_eq!(
        first_lines(&hits),
        first_lines(&catalog()),
    );
}

#[tokio::test]
async fn test_full_corpus_snapshot_indexes_every_node() {
    let mut documents = catalog();
    documents.push(CandidateDocument::new(
        "name: MODIS\ntitle: Ocean colour",
        RetrievalSource::Vector,
    ));
    let mut config = StachatConfig::default();
    config.retrieval.snapshot_mode = stachat::config::SnapshotMode::FullCorpus;

    let context = assemble(&config, CatalogStore::new(documents), RecordingBackend::new())
        .await
        .unwrap();
    assert_eq!(context.lexical.len(), 5);
}

#[tokio::test]
async fn test_match_only_lexical_config_drops_zero_scores() {
    let mut config = StachatConfig::default();
    config.retrieval.lexical_match_only = true;

    let context = assemble(&config, CatalogStore::new(catalog()), RecordingBackend::new())
        .await
        .unwrap();
    let hits = context.lexical.search(COASTAL_QUESTION, 4).unwrap();
    assert_eq!(hits.len(), 3);
    assert_eq!(context.lexical.search("elevation", 4).unwrap().len(), 1);
}

#[tokio::test]
async fn test_prompt_assembly_is_idempotent() {
    let context = assemble(&StachatConfig::default(), CatalogStore::new(catalog()), RecordingBackend::new())
        .await
        .unwrap();
    let query = Query::new(COASTAL_QUESTION).unwrap();

    let first = context.pipeline.assemble_prompt(&query).await;
    let second = context.pipeline.assemble_prompt(&query).await;
    assert_eq!(first, second);
}

struct FixedRetriever {
    name: &'static str,
    count: usize,
    source: RetrievalSource,
}

#[async_trait]
impl Retriever for FixedRetriever {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn retrieve(&self, _query: &Query) -> RetrievalOutcome {
        RetrievalOutcome::Retrieved(
            (0..self.count)
                .map(|i| CandidateDocument::new(format!("{} {}", self.name, i), self.source))
                .collect(),
        )
    }
}

proptest! {
    #[test]
    fn fused_length_is_sum_of_sides(vector in 0usize..8, lexical in 0usize..8) {
        let hybrid = HybridRetriever::new(
            Arc::new(FixedRetriever { name: "vector", count: vector, source: RetrievalSource::Vector }),
            Arc::new(FixedRetriever { name: "lexical", count: lexical, source: RetrievalSource::Lexical }),
            Duration::from_secs(1),
            FusionPolicy::default(),
        );
        let query = Query::new("coastal").unwrap();
        let outcome = tokio_test::block_on(hybrid.retrieve(&query));

        prop_assert_eq!(outcome.len(), vector + lexical);
        let documents = outcome.documents();
        prop_assert!(documents[..vector].iter().all(|d| d.source == RetrievalSource::Vector));
        prop_assert!(documents[vector..].iter().all(|d| d.source == RetrievalSource::Lexical));
    }
}
