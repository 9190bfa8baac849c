//! review-rag: asynchronous document ingestion with retrieval-augmented scoring
//!
//! A pool of job-queue workers takes uploaded file references, extracts their
//! text, splits it into overlapping chunks, embeds and upserts them into a
//! shared vector index, and, for review jobs, runs each retrieval-backed
//! evaluation question through an LLM to produce a discrete score. Every
//! external collaborator (blob store, embedder, LLM, vector index, status
//! datastore) sits behind a trait so tests substitute fakes at the same seams
//! production wires real clients through.

pub mod config;
pub mod error;
pub mod ingestion;
pub mod processing;
pub mod providers;
pub mod scoring;
pub mod server;
pub mod status;
pub mod storage;
pub mod types;

pub use config::PipelineConfig;
pub use error::{Error, Result};
pub use types::{
    Chunk, DocumentKey, DocumentRecord, EvaluationQuestion, IngestJob, ProcessingStatus,
    QuestionAnswer, ReviewContext, ScoringOutcome,
};
