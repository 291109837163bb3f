//! STACHAT - question answering over a geospatial product graph
//!
//! Questions arrive on a signed webhook. Each one is answered by retrieving
//! candidate products two ways (Neo4j vector similarity and an in-memory
//! BM25 index), concatenating the candidates into a context block, and asking
//! an OpenAI chat model to answer from that context only.

pub mod api;
pub mod config;
pub mod embeddings;
pub mod generation;
pub mod lexical;
pub mod pipeline;
pub mod retrieval;
pub mod store;
pub mod telemetry;

pub use api::{APIGateway, APIGatewayConfig};
pub use config::StachatConfig;
pub use pipeline::{
    assemble, initialize, AnswerPipeline, ContextAssembler, InitError, PipelineContext,
};
