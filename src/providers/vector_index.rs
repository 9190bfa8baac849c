//! Vector index trait: upsert, filtered search, delete

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::Result;
use crate::types::{Chunk, ChunkPayload};

/// Boolean-AND metadata filter over payload keys
#[derive(Debug, Clone, Default)]
pub struct PointFilter {
    clauses: Vec<(String, Value)>,
}

impl PointFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `key == value` clause; all clauses must match
    pub fn must_match(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.push((key.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn clauses(&self) -> &[(String, Value)] {
        &self.clauses
    }

    /// Qdrant filter body: `{"must": [{"key": .., "match": {"value": ..}}, ..]}`
    pub fn to_qdrant(&self) -> Value {
        let must: Vec<Value> = self
            .clauses
            .iter()
            .map(|(key, value)| json!({ "key": key, "match": { "value": value } }))
            .collect();
        json!({ "must": must })
    }
}

/// A scored point returned from search
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub id: String,
    pub score: f32,
    pub payload: ChunkPayload,
}

/// Trait for the shared vector index.
///
/// One collection serves every chat; tenant isolation happens entirely through
/// the `chat_id`/`document_id` payload filter at query time.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Create the backing collection if missing (cosine distance, fixed size).
    ///
    /// Idempotent and safe to call concurrently at process startup.
    async fn ensure_collection(&self, dimensions: usize) -> Result<()>;

    /// Upsert all chunks as points; completes only once the write is committed
    async fn upsert(&self, chunks: &[Chunk]) -> Result<()>;

    /// Nearest-neighbour search constrained by the payload filter
    async fn search(
        &self,
        vector: &[f32],
        filter: &PointFilter,
        limit: usize,
    ) -> Result<Vec<SearchHit>>;

    /// Delete every point matching the filter
    async fn delete(&self, filter: &PointFilter) -> Result<()>;

    /// Provider name for logging
    fn name(&self) -> &str;
}
