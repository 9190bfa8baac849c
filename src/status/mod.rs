//! Best-effort document status tracking
//!
//! Status writes are a secondary concern: a failed persistence attempt is
//! logged, never retried in a loop, and never blocks the pipeline. All
//! transitions are last-write-wins.

use std::sync::Arc;

use crate::providers::DocumentStore;
use crate::types::{DocumentKey, ProcessingStatus};

/// Persists status transitions and per-question gaps for a document
#[derive(Clone)]
pub struct StatusTracker {
    store: Arc<dyn DocumentStore>,
}

impl StatusTracker {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Transition to PROCESSING when the job is dequeued
    pub async fn mark_processing(&self, key: &DocumentKey) {
        if let Err(e) = self
            .store
            .set_status(key, ProcessingStatus::Processing, None)
            .await
        {
            tracing::error!(document = %key, "Failed to mark document PROCESSING: {}", e);
        }
    }

    /// Terminal success; `note` explains benign no-op outcomes
    pub async fn mark_completed(&self, key: &DocumentKey, note: Option<&str>) {
        if let Err(e) = self
            .store
            .set_status(key, ProcessingStatus::Completed, note)
            .await
        {
            tracing::error!(document = %key, "Failed to mark document COMPLETED: {}", e);
        }
    }

    /// Terminal failure with the underlying message
    pub async fn mark_failed(&self, key: &DocumentKey, error: &str) {
        if let Err(e) = self
            .store
            .set_status(key, ProcessingStatus::Failed, Some(error))
            .await
        {
            tracing::error!(document = %key, "Failed to mark document FAILED: {}", e);
        }
    }

    /// Record the question ids the scoring pass could not answer
    pub async fn record_missing_questions(&self, key: &DocumentKey, ids: &[String]) {
        if let Err(e) = self.store.set_missing_questions(key, ids).await {
            tracing::error!(document = %key, "Failed to record missing questions: {}", e);
        }
    }
}
