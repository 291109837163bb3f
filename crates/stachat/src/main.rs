use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use stachat::{
    api::{APIGateway, APIGatewayConfig},
    config::StachatConfig,
    pipeline::{connect_store, initialize},
    telemetry::init_tracing,
};
use stachat_core::Query;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "stachat")]
#[command(about = "Hybrid retrieval question answering over a geospatial product graph")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Configuration file (defaults to ./stachat.toml when present)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the webhook API (default)
    Serve,
    /// Create the vector index and embed nodes that lack embeddings
    BuildIndex,
    /// Answer a single question and print the result
    Ask {
        /// Question text
        question: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config = StachatConfig::load(cli.config.as_deref()).context("loading configuration")?;
    init_tracing(&config.logging)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::BuildIndex => build_index(config).await,
        Command::Ask { question } => ask(config, question).await,
    }
}

async fn serve(config: StachatConfig) -> Result<()> {
    let context = initialize(&config).await?;
    if let Some(report) = &context.build_report {
        info!(
            embedded_nodes = report.embedded_nodes,
            batches = report.batches,
            "Vector index ready"
        );
    }

    let gateway_config = APIGatewayConfig::from_server_config(&config.server)?;
    let gateway = APIGateway::new(gateway_config, context.pipeline);
    gateway.start().await?;
    Ok(())
}

async fn build_index(config: StachatConfig) -> Result<()> {
    config.validate()?;
    let (_, report) = connect_store(&config, true).await?;
    if let Some(report) = report {
        println!(
            "Embedded {} nodes in {} batches into index {}",
            report.embedded_nodes, report.batches, config.neo4j.index_name
        );
    }
    Ok(())
}

async fn ask(config: StachatConfig, question: String) -> Result<()> {
    let query = Query::new(question)?;
    let context = initialize(&config).await?;
    let answer = context.pipeline.answer(&query).await?;
    println!("{}", answer);
    Ok(())
}
