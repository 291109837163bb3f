use std::{cmp::Ordering, time::Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stachat_core::{
    CandidateDocument, DocumentStore, Query, RetrievalOutcome, RetrievalSource, Retriever,
};
use tantivy::{
    collector::TopDocs,
    doc,
    query::QueryParser,
    schema::{document::TantivyDocument, Value},
    Index, IndexReader, IndexWriter, ReloadPolicy,
};
use tracing::{debug, info, warn};

use crate::lexical::{
    errors::{LexicalError, LexicalResult},
    schema::LexicalSchema,
};

const WRITER_HEAP_BYTES: usize = 50_000_000;

/// Where the lexical corpus comes from at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotSource {
    /// Index the results of one similarity search. Nodes outside that result
    /// set are never lexically searchable.
    SeedQuery { query: String, k: usize },
    /// Index every labelled node.
    FullCorpus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexicalConfig {
    pub top_k: usize,
    pub max_query_terms: usize,
    /// Only return documents sharing a term with the query.
    pub match_only: bool,
}

impl Default for LexicalConfig {
    fn default() -> Self {
        Self {
            top_k: 4,
            max_query_terms: 32,
            match_only: false,
        }
    }
}

/// Read-only BM25 index over a fixed set of documents.
///
/// Built once, never re-synced with the store.
pub struct LexicalIndex {
    schema: LexicalSchema,
    index: Index,
    reader: IndexReader,
    documents: Vec<CandidateDocument>,
    config: LexicalConfig,
}

impl LexicalIndex {
    /// Take a snapshot from `store` and index it.
    pub async fn build(
        store: &dyn DocumentStore,
        source: &SnapshotSource,
        config: LexicalConfig,
    ) -> LexicalResult<Self> {
        let documents = match source {
            SnapshotSource::SeedQuery { query, k } => store.similarity_search(query, *k).await?,
            SnapshotSource::FullCorpus => store.all_documents().await?,
        };
        info!(
            documents = documents.len(),
            full_corpus = matches!(source, SnapshotSource::FullCorpus),
            "Lexical snapshot taken"
        );
        Self::from_documents(documents, config)
    }

    pub fn from_documents(
        documents: Vec<CandidateDocument>,
        config: LexicalConfig,
    ) -> LexicalResult<Self> {
        let schema = LexicalSchema::build();
        let index = Index::create_in_ram(schema.schema().clone());

        // one thread keeps a single segment in snapshot order
        let mut writer: IndexWriter = index.writer_with_num_threads(1, WRITER_HEAP_BYTES)?;
        let documents: Vec<CandidateDocument> = documents
            .into_iter()
            .map(|mut doc| {
                doc.source = RetrievalSource::Lexical;
                doc
            })
            .collect();
        for (ordinal, document) in documents.iter().enumerate() {
            writer.add_document(doc!(
                schema.content_field => document.content.clone(),
                schema.ordinal_field => ordinal as u64,
            ))?;
        }
        writer.commit()?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;

        Ok(Self {
            schema,
            index,
            reader,
            documents,
            config,
        })
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// The indexed snapshot, in snapshot order.
    pub fn documents(&self) -> &[CandidateDocument] {
        &self.documents
    }

    /// Up to `limit` snapshot documents by descending BM25 score, each with
    /// its score written to metadata. Documents sharing no term with the query
    /// score 0 and are dropped only when `match_only` is set. Ties keep
    /// snapshot order.
    pub fn search(&self, query: &str, limit: usize) -> LexicalResult<Vec<CandidateDocument>> {
        if limit == 0 || self.documents.is_empty() {
            return Ok(Vec::new());
        }
        let start = Instant::now();

        let parser = QueryParser::for_index(&self.index, vec![self.schema.content_field]);
        let (parsed, errors) = parser.parse_query_lenient(&self.truncate_terms(query));
        if !errors.is_empty() {
            debug!(errors = errors.len(), "Ignored unparsable query fragments");
        }

        let searcher = self.reader.searcher();
        let top_docs = searcher.search(&parsed, &TopDocs::with_limit(self.documents.len()))?;

        let mut scores: Vec<Option<f32>> = vec![None; self.documents.len()];
        for (score, address) in top_docs {
            let retrieved: TantivyDocument = searcher.doc(address)?;
            let ordinal = retrieved
                .get_first(self.schema.ordinal_field)
                .and_then(|value| value.as_u64())
                .ok_or(LexicalError::UnknownOrdinal(u64::MAX))?;
            let slot = scores
                .get_mut(ordinal as usize)
                .ok_or(LexicalError::UnknownOrdinal(ordinal))?;
            *slot = Some(score);
        }

        let mut hits: Vec<(f32, u64)> = scores
            .into_iter()
            .enumerate()
            .filter(|(_, score)| !self.config.match_only || score.is_some())
            .map(|(ordinal, score)| (score.unwrap_or(0.0), ordinal as u64))
            .collect();
        hits.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.1.cmp(&b.1))
        });
        hits.truncate(limit);

        let results = hits
            .into_iter()
            .map(|(score, ordinal)| {
                let mut doc = self
                    .documents
                    .get(ordinal as usize)
                    .cloned()
                    .ok_or(LexicalError::UnknownOrdinal(ordinal))?;
                doc.set_score(score as f64);
                Ok(doc)
            })
            .collect::<LexicalResult<Vec<_>>>()?;

        info!(
            elapsed_us = start.elapsed().as_micros() as u64,
            hits = results.len(),
            "Lexical search completed"
        );
        Ok(results)
    }

    fn truncate_terms(&self, query: &str) -> String {
        let tokens: Vec<&str> = query.split_whitespace().collect();
        if tokens.len() <= self.config.max_query_terms {
            tokens.join(" ")
        } else {
            tokens[..self.config.max_query_terms].join(" ")
        }
    }
}

#[async_trait]
impl Retriever for LexicalIndex {
    fn name(&self) -> &'static str {
        "lexical"
    }

    async fn retrieve(&self, query: &Query) -> RetrievalOutcome {
        match self.search(query.as_str(), self.config.top_k) {
            Ok(docs) => RetrievalOutcome::Retrieved(docs),
            Err(err) => {
                warn!(error = %err, "Lexical retrieval failed");
                RetrievalOutcome::Degraded(err.into())
            }
        }
    }
}
