//! Shared data model for the ingestion and scoring pipeline

pub mod chunk;
pub mod document;
pub mod question;

pub use chunk::{Chunk, ChunkPayload};
pub use document::{DocumentKey, DocumentRecord, IngestJob, ProcessingStatus, ReviewContext};
pub use question::{AnswerLabel, EvaluationQuestion, QuestionAnswer, ScoringOutcome};
