//! Neo4j-backed document store.
//!
//! Each labelled node becomes one [`CandidateDocument`]: the configured text
//! attributes render into `content` as `attribute: value` lines, and every
//! other non-null property lands in `metadata`.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use stachat_core::{
    CandidateDocument, DocumentStore, EmbeddingProvider, Metadata, RetrievalSource, StoreError,
};
use tracing::{debug, info};

use crate::store::graph::{quote_identifier, GraphClient, Row};

/// Which nodes, attributes and index the store is bound to.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorStoreSettings {
    pub index_name: String,
    pub node_label: String,
    pub text_properties: Vec<String>,
    pub embedding_property: String,
}

/// Outcome of [`Neo4jVectorStore::from_existing_graph`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphBuildReport {
    pub embedded_nodes: usize,
    pub batches: usize,
}

pub struct Neo4jVectorStore {
    graph: Arc<dyn GraphClient>,
    embedder: Arc<dyn EmbeddingProvider>,
    settings: VectorStoreSettings,
}

impl Neo4jVectorStore {
    /// Bind to an index that already exists.
    pub fn new(
        graph: Arc<dyn GraphClient>,
        embedder: Arc<dyn EmbeddingProvider>,
        settings: VectorStoreSettings,
    ) -> Self {
        Self {
            graph,
            embedder,
            settings,
        }
    }

    /// Create the vector index if absent, then embed every labelled node that
    /// has at least one text attribute and no embedding yet.
    pub async fn from_existing_graph(
        graph: Arc<dyn GraphClient>,
        embedder: Arc<dyn EmbeddingProvider>,
        settings: VectorStoreSettings,
        batch_size: usize,
    ) -> Result<(Self, GraphBuildReport), StoreError> {
        let store = Self::new(graph, embedder, settings);
        store.ensure_index().await?;
        let report = store.backfill_embeddings(batch_size.max(1)).await?;
        info!(
            index = %store.settings.index_name,
            embedded_nodes = report.embedded_nodes,
            batches = report.batches,
            "Vector index ready"
        );
        Ok((store, report))
    }

    pub fn settings(&self) -> &VectorStoreSettings {
        &self.settings
    }

    async fn ensure_index(&self) -> Result<(), StoreError> {
        let statement = format!(
            "CREATE VECTOR INDEX {index} IF NOT EXISTS FOR (n:{label}) ON (n.{prop}) \
             OPTIONS {{indexConfig: {{`vector.dimensions`: {dim}, `vector.similarity_function`: 'cosine'}}}}",
            index = quote_identifier(&self.settings.index_name),
            label = quote_identifier(&self.settings.node_label),
            prop = quote_identifier(&self.settings.embedding_property),
            dim = self.embedder.dimension(),
        );
        self.graph.run(&statement, json!({})).await?;
        Ok(())
    }

    async fn backfill_embeddings(&self, batch_size: usize) -> Result<GraphBuildReport, StoreError> {
        let label = quote_identifier(&self.settings.node_label);
        let prop = quote_identifier(&self.settings.embedding_property);
        let pending = format!(
            "MATCH (n:{label}) WHERE n.{prop} IS NULL \
             AND any(k IN $props WHERE n[k] IS NOT NULL) \
             RETURN elementId(n) AS id, n {{.*, {prop}: Null}} AS props LIMIT $limit",
        );
        let update = format!(
            "UNWIND $data AS row MATCH (n:{label}) WHERE elementId(n) = row.id \
             CALL db.create.setNodeVectorProperty(n, $property, row.embedding) \
             RETURN count(*) AS updated",
        );

        let mut report = GraphBuildReport::default();
        loop {
            let rows = self
                .graph
                .run(
                    &pending,
                    json!({ "props": self.settings.text_properties, "limit": batch_size }),
                )
                .await?;
            if rows.is_empty() {
                break;
            }

            let mut ids = Vec::with_capacity(rows.len());
            let mut texts = Vec::with_capacity(rows.len());
            for row in &rows {
                let id = row_id(row)?;
                let props = row_props(row)?;
                ids.push(id);
                texts.push(self.render_content(props));
            }

            let vectors = self.embedder.embed_documents(&texts).await?;
            let data: Vec<Value> = ids
                .into_iter()
                .zip(vectors)
                .map(|(id, embedding)| json!({ "id": id, "embedding": embedding }))
                .collect();

            let updated = self
                .graph
                .run(
                    &update,
                    json!({ "data": data, "property": self.settings.embedding_property }),
                )
                .await?
                .first()
                .and_then(|row| row.get("updated"))
                .and_then(Value::as_u64)
                .unwrap_or(0) as usize;

            if updated == 0 {
                return Err(StoreError::Decode(
                    "embedding back-fill updated no nodes".to_string(),
                ));
            }
            report.embedded_nodes += updated;
            report.batches += 1;
            debug!(batch = report.batches, updated, "Embedded node batch");
        }
        Ok(report)
    }

    /// One `attribute: value` line per configured attribute, in order. The
    /// first line has no leading newline; this text is also what gets embedded.
    pub fn render_content(&self, props: &Map<String, Value>) -> String {
        self.settings
            .text_properties
            .iter()
            .map(|name| format!("{}: {}", name, value_text(props.get(name))))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn to_document(&self, row: &Row) -> Result<CandidateDocument, StoreError> {
        let id = row_id(row)?;
        let props = row_props(row)?;
        let content = self.render_content(props);

        let metadata: Metadata = props
            .iter()
            .filter(|(key, value)| {
                !value.is_null()
                    && key.as_str() != "id"
                    && *key != &self.settings.embedding_property
                    && !self.settings.text_properties.contains(*key)
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Ok(CandidateDocument::new(content, RetrievalSource::Vector)
            .with_metadata(metadata)
            .with_node_id(id))
    }
}

#[async_trait]
impl DocumentStore for Neo4jVectorStore {
    async fn similarity_search_with_score(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<(CandidateDocument, f32)>, StoreError> {
        let embedding = self.embedder.embed_query(query).await?;
        let statement = format!(
            "CALL db.index.vector.queryNodes($index, $k, $embedding) YIELD node, score \
             RETURN elementId(node) AS id, node {{.*, {prop}: Null}} AS props, score \
             ORDER BY score DESC",
            prop = quote_identifier(&self.settings.embedding_property),
        );
        let rows = self
            .graph
            .run(
                &statement,
                json!({
                    "index": self.settings.index_name,
                    "k": k,
                    "embedding": embedding,
                }),
            )
            .await?;

        rows.iter()
            .map(|row| {
                let score = row
                    .get("score")
                    .and_then(Value::as_f64)
                    .ok_or_else(|| StoreError::Decode("row has no numeric score".to_string()))?;
                Ok((self.to_document(row)?, score as f32))
            })
            .collect()
    }

    async fn all_documents(&self) -> Result<Vec<CandidateDocument>, StoreError> {
        let statement = format!(
            "MATCH (n:{label}) RETURN elementId(n) AS id, n {{.*, {prop}: Null}} AS props \
             ORDER BY id",
            label = quote_identifier(&self.settings.node_label),
            prop = quote_identifier(&self.settings.embedding_property),
        );
        let rows = self.graph.run(&statement, json!({})).await?;
        rows.iter().map(|row| self.to_document(row)).collect()
    }
}

fn row_id(row: &Row) -> Result<String, StoreError> {
    row.get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| StoreError::Decode("row has no node id".to_string()))
}

fn row_props(row: &Row) -> Result<&Map<String, Value>, StoreError> {
    row.get("props")
        .and_then(Value::as_object)
        .ok_or_else(|| StoreError::Decode("row has no property map".to_string()))
}

fn value_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
