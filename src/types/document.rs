//! Document records, processing status, and ingestion job payloads

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Processing status of an uploaded document
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl ProcessingStatus {
    /// Whether this status admits no further transitions within a job attempt
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Valid transitions of the document state machine.
    ///
    /// Production writes stay permissive (last-write-wins); this function exists so
    /// tests can assert the machine's shape explicitly.
    pub fn can_transition_to(self, next: ProcessingStatus) -> bool {
        match (self, next) {
            (Self::Queued, Self::Processing) => true,
            (Self::Processing, Self::Completed) | (Self::Processing, Self::Failed) => true,
            _ => false,
        }
    }

    /// Stable string form used by the datastore
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "QUEUED",
            Self::Processing => "PROCESSING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }

    /// Parse the datastore string form
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "QUEUED" => Some(Self::Queued),
            "PROCESSING" => Some(Self::Processing),
            "COMPLETED" => Some(Self::Completed),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Primary key of a document record: chat partition plus upload timestamp
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct DocumentKey {
    /// Partition key: the owning chat or review session
    pub chat_id: String,
    /// Sort key: ISO upload timestamp; a re-upload starts a fresh state machine
    pub uploaded_at: String,
}

impl DocumentKey {
    pub fn new(chat_id: impl Into<String>, uploaded_at: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            uploaded_at: uploaded_at.into(),
        }
    }
}

impl std::fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.chat_id, self.uploaded_at)
    }
}

/// One row per uploaded file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub chat_id: String,
    pub uploaded_at: String,
    /// Stable across retries of the same upload
    pub doc_id: Uuid,
    pub file_name: String,
    pub blob_key: String,
    /// MIME type as reported at upload
    pub file_type: String,
    pub status: ProcessingStatus,
    /// Set if and only if status is FAILED
    pub processing_error: Option<String>,
    /// Explanatory note for benign terminal outcomes (e.g. unsupported file type)
    pub processing_note: Option<String>,
    /// Question ids the scoring engine could not answer; meaningful only after a scoring pass
    pub missing_question_ids: Vec<String>,
}

impl DocumentRecord {
    /// Key of this record
    pub fn key(&self) -> DocumentKey {
        DocumentKey::new(self.chat_id.clone(), self.uploaded_at.clone())
    }
}

/// Review context attached to jobs that should run the scoring pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewContext {
    /// Question-set owner and scoring-session partition key
    pub owner_id: String,
    /// Scoring-session sort key
    pub session_created_at: String,
}

/// Queue message driving one ingestion run.
///
/// `doc_id` doubles as the queue's deduplication key: at most one job per id is
/// in flight at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestJob {
    pub doc_id: Uuid,
    pub chat_id: String,
    /// Stamped by the submission boundary when the caller leaves it empty
    #[serde(default)]
    pub uploaded_at: String,
    pub file_name: String,
    pub blob_key: String,
    pub file_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review: Option<ReviewContext>,
}

impl IngestJob {
    /// Key of the document record this job mutates
    pub fn document_key(&self) -> DocumentKey {
        DocumentKey::new(self.chat_id.clone(), self.uploaded_at.clone())
    }

    /// Initial QUEUED record registered when the upload is accepted
    pub fn initial_record(&self) -> DocumentRecord {
        DocumentRecord {
            chat_id: self.chat_id.clone(),
            uploaded_at: self.uploaded_at.clone(),
            doc_id: self.doc_id,
            file_name: self.file_name.clone(),
            blob_key: self.blob_key.clone(),
            file_type: self.file_type.clone(),
            status: ProcessingStatus::Queued,
            processing_error: None,
            processing_note: None,
            missing_question_ids: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_machine_accepts_documented_transitions() {
        use ProcessingStatus::*;
        assert!(Queued.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Completed));
        assert!(Processing.can_transition_to(Failed));
    }

    #[test]
    fn status_machine_rejects_everything_else() {
        use ProcessingStatus::*;
        assert!(!Queued.can_transition_to(Completed));
        assert!(!Queued.can_transition_to(Failed));
        assert!(!Completed.can_transition_to(Processing));
        assert!(!Failed.can_transition_to(Processing));
        assert!(!Failed.can_transition_to(Completed));
        assert!(!Processing.can_transition_to(Queued));
        assert!(!Processing.can_transition_to(Processing));
    }

    #[test]
    fn status_round_trips_through_datastore_form() {
        for status in [
            ProcessingStatus::Queued,
            ProcessingStatus::Processing,
            ProcessingStatus::Completed,
            ProcessingStatus::Failed,
        ] {
            assert_eq!(ProcessingStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ProcessingStatus::parse("RUNNING"), None);
    }

    #[test]
    fn job_payload_round_trips_as_json() {
        let job = IngestJob {
            doc_id: Uuid::new_v4(),
            chat_id: "chat-1".into(),
            uploaded_at: "2024-06-01T10:00:00Z".into(),
            file_name: "report.pdf".into(),
            blob_key: "chat-1/report.pdf".into(),
            file_type: "application/pdf".into(),
            review: Some(ReviewContext {
                owner_id: "owner-1".into(),
                session_created_at: "2024-06-01T09:00:00Z".into(),
            }),
        };
        let encoded = serde_json::to_string(&job).expect("encodes");
        let decoded: IngestJob = serde_json::from_str(&encoded).expect("decodes");
        assert_eq!(decoded.doc_id, job.doc_id);
        assert_eq!(decoded.review.as_ref().map(|r| r.owner_id.as_str()), Some("owner-1"));
    }

    #[test]
    fn job_payload_tolerates_a_missing_upload_timestamp() {
        let raw = format!(
            r#"{{"doc_id":"{}","chat_id":"chat-1","file_name":"report.pdf","blob_key":"chat-1/report.pdf","file_type":"application/pdf"}}"#,
            Uuid::new_v4()
        );
        let job: IngestJob = serde_json::from_str(&raw).expect("decodes");
        assert!(job.uploaded_at.is_empty());
        assert!(job.review.is_none());
    }
}
