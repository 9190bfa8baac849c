//! Worker pool driving the ingestion pipeline end-to-end for one document

use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::time::timeout;

use crate::config::{ChunkingConfig, ProcessingConfig};
use crate::error::{Error, Result};
use crate::ingestion::{ExtractedContent, TextChunker, TextExtractor};
use crate::providers::{
    BlobStore, DocumentStore, EmbeddingProvider, LlmProvider, QuestionStore, ScoringSessionStore,
    VectorIndex,
};
use crate::scoring::ScoringEngine;
use crate::status::StatusTracker;
use crate::types::{Chunk, IngestJob};

use super::queue::JobQueue;

/// Every collaborator the pipeline touches, constructed once at process start
/// and injected here.
pub struct PipelineContext {
    pub blob_store: Arc<dyn BlobStore>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub index: Arc<dyn VectorIndex>,
    pub llm: Arc<dyn LlmProvider>,
    pub documents: Arc<dyn DocumentStore>,
    pub sessions: Arc<dyn ScoringSessionStore>,
    pub questions: Arc<dyn QuestionStore>,
    pub chunking: ChunkingConfig,
    pub processing: ProcessingConfig,
    /// Chunks retrieved per scoring question
    pub retrieval_top_k: usize,
}

/// How a pipeline run ended, before status mapping
enum PipelineOutcome {
    /// Chunks were embedded and committed to the index
    Indexed {
        chunk_count: usize,
        /// Unanswerable question ids, when a scoring pass ran
        missing: Option<Vec<String>>,
    },
    /// Deliberate no-op: the file type is not extractable here
    Unsupported { file_type: String },
    /// Structurally empty document; terminal, the queue must not retry
    EmptyContent(&'static str),
}

/// Pool of workers consuming ingestion jobs
#[derive(Clone)]
pub struct IngestWorker {
    ctx: Arc<PipelineContext>,
    queue: Arc<JobQueue>,
    tracker: StatusTracker,
    scoring: Arc<ScoringEngine>,
    chunker: Arc<TextChunker>,
}

impl IngestWorker {
    pub fn new(ctx: Arc<PipelineContext>, queue: Arc<JobQueue>) -> Self {
        let tracker = StatusTracker::new(Arc::clone(&ctx.documents));
        let scoring = Arc::new(ScoringEngine::new(
            Arc::clone(&ctx.embedder),
            Arc::clone(&ctx.index),
            Arc::clone(&ctx.llm),
            ctx.retrieval_top_k,
        ));
        let chunker = Arc::new(TextChunker::from_config(&ctx.chunking));

        Self {
            ctx,
            queue,
            tracker,
            scoring,
            chunker,
        }
    }

    /// Consume jobs until the channel closes. Distinct jobs run in parallel up
    /// to `worker_count`; within one job the stages run sequentially.
    pub async fn run(self, mut receiver: mpsc::Receiver<IngestJob>) {
        let worker_count = self.ctx.processing.worker_count.max(1);
        let job_timeout = Duration::from_secs(self.ctx.processing.job_timeout_secs);

        tracing::info!(
            "Ingestion worker pool started: {} workers, {} embeddings in flight per job, {}s job budget",
            worker_count,
            self.ctx.processing.embedding_parallelism(),
            job_timeout.as_secs()
        );

        let semaphore = Arc::new(Semaphore::new(worker_count));

        while let Some(job) = receiver.recv().await {
            let permit = semaphore.clone().acquire_owned().await.unwrap();
            let worker = self.clone();

            tokio::spawn(async move {
                let _permit = permit;
                worker.handle_job(job, job_timeout).await;
            });
        }

        tracing::info!("Job channel closed, worker pool stopping");
    }

    /// One delivery attempt: process, map the result onto the queue policy
    async fn handle_job(&self, job: IngestJob, job_timeout: Duration) {
        let doc_id = job.doc_id;
        let file_name = job.file_name.clone();
        let started = std::time::Instant::now();
        tracing::info!("[{}] Processing document {}", file_name, doc_id);

        let result = match timeout(job_timeout, self.process_job(&job)).await {
            Ok(result) => result,
            Err(_) => {
                let message = format!("processing timeout after {}s", job_timeout.as_secs());
                tracing::error!("[{}] {}", file_name, message);
                self.tracker.mark_failed(&job.document_key(), &message).await;
                Err(Error::internal(message))
            }
        };

        match result {
            Ok(()) => {
                tracing::info!(
                    "[{}] Job finished in {:.1}s",
                    file_name,
                    started.elapsed().as_secs_f64()
                );
                self.queue.settle(doc_id);
            }
            Err(e) if e.is_configuration() => {
                // Redelivery will not help a credentials problem
                tracing::error!("[{}] Fatal configuration error, not redelivering: {}", file_name, e);
                self.queue.settle(doc_id);
            }
            Err(e) => {
                tracing::error!("[{}] Job failed: {}", file_name, e);
                self.queue.redeliver(job);
            }
        }
    }

    /// Status bookkeeping around one pipeline run.
    ///
    /// Terminal-but-benign outcomes return `Ok` so the queue does not retry a
    /// structurally empty document; real failures are re-thrown after the
    /// FAILED status is recorded.
    async fn process_job(&self, job: &IngestJob) -> Result<()> {
        let key = job.document_key();
        self.tracker.mark_processing(&key).await;

        match self.run_pipeline(job).await {
            Ok(PipelineOutcome::Indexed { chunk_count, missing }) => {
                if let Some(missing) = &missing {
                    self.tracker.record_missing_questions(&key, missing).await;
                }
                self.tracker.mark_completed(&key, None).await;
                tracing::info!(
                    "[{}] COMPLETE: {} chunks indexed{}",
                    job.file_name,
                    chunk_count,
                    missing
                        .map(|m| format!(", {} questions unanswerable", m.len()))
                        .unwrap_or_default()
                );
                Ok(())
            }
            Ok(PipelineOutcome::Unsupported { file_type }) => {
                let note = format!("unsupported file type '{}', ingestion skipped", file_type);
                tracing::info!("[{}] {}", job.file_name, note);
                self.tracker.mark_completed(&key, Some(&note)).await;
                Ok(())
            }
            Ok(PipelineOutcome::EmptyContent(reason)) => {
                tracing::warn!("[{}] {}", job.file_name, reason);
                self.tracker.mark_failed(&key, reason).await;
                Ok(())
            }
            Err(e) => {
                self.tracker.mark_failed(&key, &e.to_string()).await;
                Err(e)
            }
        }
    }

    /// Extraction → chunking → embedding → upsert → (review jobs) scoring
    async fn run_pipeline(&self, job: &IngestJob) -> Result<PipelineOutcome> {
        let bytes = self.ctx.blob_store.get(&job.blob_key).await?;
        tracing::debug!("[{}] Fetched {} bytes from blob store", job.file_name, bytes.len());

        let extracted = TextExtractor::extract(&bytes, &job.file_type, &job.file_name)?;
        if let ExtractedContent::Unsupported { file_type } = &extracted {
            return Ok(PipelineOutcome::Unsupported {
                file_type: file_type.clone(),
            });
        }
        if extracted.is_empty() {
            return Ok(PipelineOutcome::EmptyContent("no text content extracted"));
        }

        let mut chunks = self.chunker.chunk_document(job, &extracted);
        if chunks.is_empty() {
            return Ok(PipelineOutcome::EmptyContent("no chunks generated"));
        }

        tracing::info!(
            "[{}] Created {} chunks, generating embeddings...",
            job.file_name,
            chunks.len()
        );
        self.embed_chunks(&mut chunks, &job.file_name).await?;

        // The status write must not race the index: upsert commits first
        self.ctx.index.upsert(&chunks).await?;

        let missing = match &job.review {
            Some(review) => {
                let questions = self
                    .ctx
                    .questions
                    .questions_for_owner(&review.owner_id)
                    .await?;
                tracing::info!(
                    "[{}] Scoring {} questions for session {}",
                    job.file_name,
                    questions.len(),
                    review.session_created_at
                );

                let outcome = self.scoring.score_document(&job.chat_id, &questions).await;
                self.ctx
                    .sessions
                    .merge_answers(&review.owner_id, &review.session_created_at, &outcome.answers)
                    .await?;
                Some(outcome.unanswerable)
            }
            None => None,
        };

        Ok(PipelineOutcome::Indexed {
            chunk_count: chunks.len(),
            missing,
        })
    }

    /// Fan out chunk embeddings in bounded batches.
    ///
    /// Embedding calls are independent, so a batch runs concurrently; the
    /// first failure aborts the whole job, with credentials and quota
    /// classifications surfaced in preference to generic errors.
    async fn embed_chunks(&self, chunks: &mut [Chunk], file_name: &str) -> Result<()> {
        let parallelism = self.ctx.processing.embedding_parallelism();

        for batch in chunks.chunks_mut(parallelism) {
            let futures: Vec<_> = batch
                .iter()
                .map(|chunk| self.ctx.embedder.embed(&chunk.text))
                .collect();
            let results = join_all(futures).await;

            let mut errors = Vec::new();
            for (chunk, result) in batch.iter_mut().zip(results) {
                match result {
                    Ok(embedding) => chunk.embedding = embedding,
                    Err(e) => errors.push(e),
                }
            }

            if !errors.is_empty() {
                let pick = errors
                    .iter()
                    .position(|e| matches!(e, Error::Credentials(_)))
                    .or_else(|| errors.iter().position(|e| matches!(e, Error::Quota(_))))
                    .unwrap_or(0);
                let error = errors.swap_remove(pick);
                tracing::error!("[{}] Embedding failed: {}", file_name, error);
                return Err(error);
            }
        }

        Ok(())
    }
}
