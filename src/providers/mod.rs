//! Collaborator boundaries: traits for every external service the pipeline
//! touches, plus the concrete clients used in production.
//!
//! Every client is constructed once at process start and injected as an
//! `Arc<dyn Trait>`, so tests substitute fakes through the same seams.

pub mod blob_store;
pub mod document_store;
pub mod embedding;
pub mod llm;
pub mod openai;
pub mod qdrant;
pub mod vector_index;

pub use blob_store::{BlobStore, FsBlobStore, HttpBlobStore};
pub use document_store::{DocumentStore, QuestionStore, ScoringSessionStore};
pub use embedding::EmbeddingProvider;
pub use llm::LlmProvider;
pub use openai::{OpenAiEmbedder, OpenAiLlm};
pub use qdrant::QdrantIndex;
pub use vector_index::{PointFilter, SearchHit, VectorIndex};
