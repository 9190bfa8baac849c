//! Embedding provider trait

use async_trait::async_trait;

use crate::error::Result;

/// Trait for turning text into fixed-length vectors.
///
/// Failure classification is part of the contract: implementations surface
/// `Error::Credentials` for invalid/missing keys and `Error::Quota` for
/// exhausted quota, so the job boundary can tell "fix config" from
/// "wait and retry". There is no internal retry; redelivery is the queue's job.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate the embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts.
    ///
    /// Default implementation calls `embed` sequentially; implementations with
    /// native batching should override.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Fixed output dimensionality
    fn dimensions(&self) -> usize;

    /// Provider name for logging
    fn name(&self) -> &str;
}
