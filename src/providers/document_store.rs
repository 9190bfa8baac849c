//! Datastore traits: document status records, scoring sessions, questions

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{DocumentKey, DocumentRecord, EvaluationQuestion, ProcessingStatus, QuestionAnswer};

/// Status-record datastore.
///
/// All writes are last-write-wins; no optimistic concurrency. Only the owning
/// job's worker writes a given record after registration.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Register a newly uploaded document (status QUEUED)
    async fn create(&self, record: &DocumentRecord) -> Result<()>;

    /// Transition the document's status.
    ///
    /// `detail` is stored as `processing_error` when the status is FAILED and as
    /// `processing_note` when COMPLETED; the counterpart field is cleared either
    /// way, preserving the error-iff-failed invariant.
    async fn set_status(
        &self,
        key: &DocumentKey,
        status: ProcessingStatus,
        detail: Option<&str>,
    ) -> Result<()>;

    /// Record the question ids a scoring pass could not answer
    async fn set_missing_questions(&self, key: &DocumentKey, ids: &[String]) -> Result<()>;

    /// Fetch one record
    async fn get(&self, key: &DocumentKey) -> Result<Option<DocumentRecord>>;

    /// Status read path polled by the UI, ordered by upload time
    async fn list_by_chat(&self, chat_id: &str) -> Result<Vec<DocumentRecord>>;
}

/// Scoring-session datastore: merges answers into an existing session record
#[async_trait]
pub trait ScoringSessionStore: Send + Sync {
    /// Merge answers into the session keyed by `(owner_id, session_created_at)`.
    ///
    /// Merging replaces by question id, then appends; re-merging the same answer
    /// never duplicates it.
    async fn merge_answers(
        &self,
        owner_id: &str,
        session_created_at: &str,
        answers: &[QuestionAnswer],
    ) -> Result<()>;
}

/// Read-only evaluation question set
#[async_trait]
pub trait QuestionStore: Send + Sync {
    /// All questions owned by `owner_id`
    async fn questions_for_owner(&self, owner_id: &str) -> Result<Vec<EvaluationQuestion>>;
}
