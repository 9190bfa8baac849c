//! Application state: every client constructed once and injected

use std::sync::Arc;

use crate::config::{BlobStoreConfig, PipelineConfig};
use crate::error::Result;
use crate::processing::{IngestWorker, JobQueue, PipelineContext};
use crate::providers::{
    BlobStore, DocumentStore, FsBlobStore, HttpBlobStore, OpenAiEmbedder, OpenAiLlm, QdrantIndex,
    VectorIndex,
};
use crate::storage::ReviewDb;
use crate::types::EvaluationQuestion;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: PipelineConfig,
    queue: Arc<JobQueue>,
    documents: Arc<dyn DocumentStore>,
    db: Arc<ReviewDb>,
}

impl AppState {
    /// Build every client, ensure the vector collection, and start the worker
    /// pool. Missing provider credentials fail here, before any job runs.
    pub async fn new(config: PipelineConfig) -> Result<Self> {
        let db = Arc::new(ReviewDb::new(&config.storage.database_path)?);
        tracing::info!(
            "Datastore opened at {}",
            config.storage.database_path.display()
        );

        let blob_store: Arc<dyn BlobStore> = match &config.blob_store {
            BlobStoreConfig::Local { root } => Arc::new(FsBlobStore::new(root.clone())),
            BlobStoreConfig::Http { base_url } => Arc::new(HttpBlobStore::new(base_url.clone())),
        };

        let embedder = Arc::new(OpenAiEmbedder::new(&config.embedding)?);
        let llm = Arc::new(OpenAiLlm::new(&config.llm)?);
        let index: Arc<dyn VectorIndex> = Arc::new(QdrantIndex::new(&config.vector_index)?);

        // Idempotent and safe to race with other starting processes
        index.ensure_collection(config.embedding.dimensions).await?;
        tracing::info!(
            collection = %config.vector_index.collection,
            dimensions = config.embedding.dimensions,
            "Vector index ready"
        );

        let (queue, receiver) = JobQueue::new(&config.processing);

        let ctx = Arc::new(PipelineContext {
            blob_store,
            embedder,
            index,
            llm,
            documents: db.clone(),
            sessions: db.clone(),
            questions: db.clone(),
            chunking: config.chunking.clone(),
            processing: config.processing.clone(),
            retrieval_top_k: config.llm.retrieval_top_k,
        });

        let worker = IngestWorker::new(ctx, Arc::clone(&queue));
        tokio::spawn(worker.run(receiver));

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                queue,
                documents: db.clone(),
                db,
            }),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.inner.config
    }

    pub fn queue(&self) -> &Arc<JobQueue> {
        &self.inner.queue
    }

    pub fn documents(&self) -> &Arc<dyn DocumentStore> {
        &self.inner.documents
    }

    /// Load the read-only question set into the datastore
    pub fn seed_questions(&self, questions: &[EvaluationQuestion]) -> Result<()> {
        self.inner.db.seed_questions(questions)
    }
}
