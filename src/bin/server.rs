//! Ingestion server binary
//!
//! Run with: cargo run --bin review-rag-server

use review_rag::{config::PipelineConfig, server::ReviewServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "review_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = PipelineConfig::load_or_default()?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Embedding model: {} ({} dims)", config.embedding.model, config.embedding.dimensions);
    tracing::info!("  - LLM model: {}", config.llm.model);
    tracing::info!("  - Chunking: {} chars, {} overlap", config.chunking.chunk_size, config.chunking.chunk_overlap);
    tracing::info!("  - Workers: {}", config.processing.worker_count);

    let server = ReviewServer::new(config).await?;

    tracing::info!("Endpoints:");
    tracing::info!("  POST /api/jobs                      - submit an ingestion job");
    tracing::info!("  GET  /api/chats/:chat_id/documents  - poll document status");
    tracing::info!("  GET  /health                        - liveness");

    server.start().await?;

    Ok(())
}
