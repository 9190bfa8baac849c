//! SQLite datastore for document status, scoring sessions, and questions

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::providers::{DocumentStore, QuestionStore, ScoringSessionStore};
use crate::types::{
    DocumentKey, DocumentRecord, EvaluationQuestion, ProcessingStatus, QuestionAnswer,
};

/// SQLite-backed datastore behind all three storage traits
pub struct ReviewDb {
    conn: Arc<Mutex<Connection>>,
}

impl ReviewDb {
    /// Create or open the database at the given path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)
            .map_err(|e| Error::storage(format!("failed to open database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.migrate()?;
        Ok(db)
    }

    /// In-memory database for tests
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::storage(format!("failed to open in-memory database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
        "#,
        )
        .map_err(|e| Error::storage(format!("failed to set pragmas: {}", e)))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                chat_id TEXT NOT NULL,
                uploaded_at TEXT NOT NULL,
                doc_id TEXT NOT NULL,
                file_name TEXT NOT NULL,
                blob_key TEXT NOT NULL,
                file_type TEXT NOT NULL,
                status TEXT NOT NULL,
                processing_error TEXT,
                processing_note TEXT,
                missing_question_ids TEXT NOT NULL DEFAULT '[]',
                PRIMARY KEY (chat_id, uploaded_at)
            );

            CREATE INDEX IF NOT EXISTS idx_documents_doc_id ON documents(doc_id);
            CREATE INDEX IF NOT EXISTS idx_documents_status ON documents(status);

            CREATE TABLE IF NOT EXISTS scoring_sessions (
                owner_id TEXT NOT NULL,
                session_created_at TEXT NOT NULL,
                answers TEXT NOT NULL DEFAULT '[]',
                PRIMARY KEY (owner_id, session_created_at)
            );

            CREATE TABLE IF NOT EXISTS evaluation_questions (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                category_id TEXT NOT NULL,
                text TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_questions_owner ON evaluation_questions(owner_id);
        "#,
        )
        .map_err(|e| Error::storage(format!("migration failed: {}", e)))?;

        Ok(())
    }

    /// Load the read-only question set; existing rows are replaced by id
    pub fn seed_questions(&self, questions: &[EvaluationQuestion]) -> Result<()> {
        let conn = self.conn.lock();
        for question in questions {
            conn.execute(
                "INSERT OR REPLACE INTO evaluation_questions (id, owner_id, category_id, text)
                 VALUES (?1, ?2, ?3, ?4)",
                params![question.id, question.owner_id, question.category_id, question.text],
            )
            .map_err(|e| Error::storage(format!("failed to seed question: {}", e)))?;
        }
        Ok(())
    }

    /// Answers currently stored on a session, for the read side of merges
    pub fn session_answers(
        &self,
        owner_id: &str,
        session_created_at: &str,
    ) -> Result<Vec<QuestionAnswer>> {
        let conn = self.conn.lock();
        let raw: Option<String> = conn
            .query_row(
                "SELECT answers FROM scoring_sessions WHERE owner_id = ?1 AND session_created_at = ?2",
                params![owner_id, session_created_at],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| Error::storage(format!("failed to read session: {}", e)))?;

        match raw {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<(DocumentRecord, String)> {
        let doc_id: String = row.get(2)?;
        let status: String = row.get(6)?;
        let missing: String = row.get(9)?;
        Ok((
            DocumentRecord {
                chat_id: row.get(0)?,
                uploaded_at: row.get(1)?,
                doc_id: Uuid::parse_str(&doc_id).unwrap_or_default(),
                file_name: row.get(3)?,
                blob_key: row.get(4)?,
                file_type: row.get(5)?,
                status: ProcessingStatus::parse(&status).unwrap_or(ProcessingStatus::Failed),
                processing_error: row.get(7)?,
                processing_note: row.get(8)?,
                missing_question_ids: Vec::new(),
            },
            missing,
        ))
    }

    fn finish_record((mut record, missing): (DocumentRecord, String)) -> DocumentRecord {
        record.missing_question_ids = serde_json::from_str(&missing).unwrap_or_default();
        record
    }
}

const DOCUMENT_COLUMNS: &str = "chat_id, uploaded_at, doc_id, file_name, blob_key, file_type, \
                                status, processing_error, processing_note, missing_question_ids";

#[async_trait]
impl DocumentStore for ReviewDb {
    async fn create(&self, record: &DocumentRecord) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            &format!(
                "INSERT OR IGNORE INTO documents ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                DOCUMENT_COLUMNS
            ),
            params![
                record.chat_id,
                record.uploaded_at,
                record.doc_id.to_string(),
                record.file_name,
                record.blob_key,
                record.file_type,
                record.status.as_str(),
                record.processing_error,
                record.processing_note,
                serde_json::to_string(&record.missing_question_ids)?,
            ],
        )
        .map_err(|e| Error::storage(format!("failed to create document: {}", e)))?;
        Ok(())
    }

    async fn set_status(
        &self,
        key: &DocumentKey,
        status: ProcessingStatus,
        detail: Option<&str>,
    ) -> Result<()> {
        // processing_error is set iff FAILED; a COMPLETED detail is a note
        let (error, note) = match status {
            ProcessingStatus::Failed => (detail, None),
            ProcessingStatus::Completed => (None, detail),
            _ => (None, None),
        };

        let conn = self.conn.lock();
        let updated = conn
            .execute(
                "UPDATE documents SET status = ?1, processing_error = ?2, processing_note = ?3
                 WHERE chat_id = ?4 AND uploaded_at = ?5",
                params![status.as_str(), error, note, key.chat_id, key.uploaded_at],
            )
            .map_err(|e| Error::storage(format!("failed to set status: {}", e)))?;

        if updated == 0 {
            return Err(Error::storage(format!("document {} not registered", key)));
        }
        Ok(())
    }

    async fn set_missing_questions(&self, key: &DocumentKey, ids: &[String]) -> Result<()> {
        let conn = self.conn.lock();
        let updated = conn
            .execute(
                "UPDATE documents SET missing_question_ids = ?1
                 WHERE chat_id = ?2 AND uploaded_at = ?3",
                params![serde_json::to_string(ids)?, key.chat_id, key.uploaded_at],
            )
            .map_err(|e| Error::storage(format!("failed to set missing questions: {}", e)))?;

        if updated == 0 {
            return Err(Error::storage(format!("document {} not registered", key)));
        }
        Ok(())
    }

    async fn get(&self, key: &DocumentKey) -> Result<Option<DocumentRecord>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                &format!(
                    "SELECT {} FROM documents WHERE chat_id = ?1 AND uploaded_at = ?2",
                    DOCUMENT_COLUMNS
                ),
                params![key.chat_id, key.uploaded_at],
                Self::row_to_record,
            )
            .optional()
            .map_err(|e| Error::storage(format!("failed to read document: {}", e)))?;

        Ok(row.map(Self::finish_record))
    }

    async fn list_by_chat(&self, chat_id: &str) -> Result<Vec<DocumentRecord>> {
        let conn = self.conn.lock();
        let mut statement = conn
            .prepare(&format!(
                "SELECT {} FROM documents WHERE chat_id = ?1 ORDER BY uploaded_at",
                DOCUMENT_COLUMNS
            ))
            .map_err(|e| Error::storage(format!("failed to prepare list: {}", e)))?;

        let rows = statement
            .query_map(params![chat_id], Self::row_to_record)
            .map_err(|e| Error::storage(format!("failed to list documents: {}", e)))?;

        let mut records = Vec::new();
        for row in rows {
            let row = row.map_err(|e| Error::storage(format!("failed to read row: {}", e)))?;
            records.push(Self::finish_record(row));
        }
        Ok(records)
    }
}

#[async_trait]
impl ScoringSessionStore for ReviewDb {
    async fn merge_answers(
        &self,
        owner_id: &str,
        session_created_at: &str,
        answers: &[QuestionAnswer],
    ) -> Result<()> {
        if answers.is_empty() {
            return Ok(());
        }

        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR IGNORE INTO scoring_sessions (owner_id, session_created_at, answers)
             VALUES (?1, ?2, '[]')",
            params![owner_id, session_created_at],
        )
        .map_err(|e| Error::storage(format!("failed to ensure session: {}", e)))?;

        let raw: String = conn
            .query_row(
                "SELECT answers FROM scoring_sessions WHERE owner_id = ?1 AND session_created_at = ?2",
                params![owner_id, session_created_at],
                |row| row.get(0),
            )
            .map_err(|e| Error::storage(format!("failed to read session: {}", e)))?;

        let mut merged: Vec<QuestionAnswer> = serde_json::from_str(&raw)?;
        for answer in answers {
            merged.retain(|existing| existing.question_id != answer.question_id);
            merged.push(answer.clone());
        }

        conn.execute(
            "UPDATE scoring_sessions SET answers = ?1
             WHERE owner_id = ?2 AND session_created_at = ?3",
            params![serde_json::to_string(&merged)?, owner_id, session_created_at],
        )
        .map_err(|e| Error::storage(format!("failed to merge answers: {}", e)))?;

        Ok(())
    }
}

#[async_trait]
impl QuestionStore for ReviewDb {
    async fn questions_for_owner(&self, owner_id: &str) -> Result<Vec<EvaluationQuestion>> {
        let conn = self.conn.lock();
        let mut statement = conn
            .prepare(
                "SELECT id, owner_id, category_id, text FROM evaluation_questions
                 WHERE owner_id = ?1 ORDER BY id",
            )
            .map_err(|e| Error::storage(format!("failed to prepare questions: {}", e)))?;

        let rows = statement
            .query_map(params![owner_id], |row| {
                Ok(EvaluationQuestion {
                    id: row.get(0)?,
                    owner_id: row.get(1)?,
                    category_id: row.get(2)?,
                    text: row.get(3)?,
                })
            })
            .map_err(|e| Error::storage(format!("failed to list questions: {}", e)))?;

        let mut questions = Vec::new();
        for row in rows {
            questions.push(row.map_err(|e| Error::storage(format!("failed to read row: {}", e)))?);
        }
        Ok(questions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IngestJob;

    fn sample_job(uploaded_at: &str) -> IngestJob {
        IngestJob {
            doc_id: Uuid::new_v4(),
            chat_id: "chat-1".into(),
            uploaded_at: uploaded_at.into(),
            file_name: "report.pdf".into(),
            blob_key: "chat-1/report.pdf".into(),
            file_type: "application/pdf".into(),
            review: None,
        }
    }

    #[tokio::test]
    async fn registered_documents_round_trip() {
        let db = ReviewDb::in_memory().expect("db");
        let job = sample_job("2024-06-01T10:00:00Z");
        db.create(&job.initial_record()).await.expect("create");

        let record = db
            .get(&job.document_key())
            .await
            .expect("get")
            .expect("present");
        assert_eq!(record.doc_id, job.doc_id);
        assert_eq!(record.status, ProcessingStatus::Queued);
        assert!(record.processing_error.is_none());
    }

    #[tokio::test]
    async fn error_is_present_iff_failed() {
        let db = ReviewDb::in_memory().expect("db");
        let job = sample_job("2024-06-01T10:00:00Z");
        let key = job.document_key();
        db.create(&job.initial_record()).await.expect("create");

        db.set_status(&key, ProcessingStatus::Failed, Some("no chunks generated"))
            .await
            .expect("fail");
        let record = db.get(&key).await.expect("get").expect("present");
        assert_eq!(record.status, ProcessingStatus::Failed);
        assert_eq!(record.processing_error.as_deref(), Some("no chunks generated"));

        // A later successful run clears the error; the detail becomes a note
        db.set_status(&key, ProcessingStatus::Completed, Some("unsupported file type"))
            .await
            .expect("complete");
        let record = db.get(&key).await.expect("get").expect("present");
        assert_eq!(record.status, ProcessingStatus::Completed);
        assert!(record.processing_error.is_none());
        assert_eq!(record.processing_note.as_deref(), Some("unsupported file type"));
    }

    #[tokio::test]
    async fn status_write_for_unregistered_document_errors() {
        let db = ReviewDb::in_memory().expect("db");
        let key = DocumentKey::new("chat-x", "2024-01-01T00:00:00Z");
        let err = db
            .set_status(&key, ProcessingStatus::Processing, None)
            .await
            .expect_err("must fail");
        assert!(matches!(err, Error::Storage(_)));
    }

    #[tokio::test]
    async fn missing_questions_are_stored_as_a_set() {
        let db = ReviewDb::in_memory().expect("db");
        let job = sample_job("2024-06-01T10:00:00Z");
        let key = job.document_key();
        db.create(&job.initial_record()).await.expect("create");

        db.set_missing_questions(&key, &["q3".into(), "q7".into()])
            .await
            .expect("set");
        let record = db.get(&key).await.expect("get").expect("present");
        assert_eq!(record.missing_question_ids, vec!["q3", "q7"]);
    }

    #[tokio::test]
    async fn list_by_chat_orders_by_upload_time() {
        let db = ReviewDb::in_memory().expect("db");
        for uploaded_at in ["2024-06-02T08:00:00Z", "2024-06-01T10:00:00Z"] {
            db.create(&sample_job(uploaded_at).initial_record())
                .await
                .expect("create");
        }

        let records = db.list_by_chat("chat-1").await.expect("list");
        assert_eq!(records.len(), 2);
        assert!(records[0].uploaded_at < records[1].uploaded_at);
        assert!(db.list_by_chat("chat-2").await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn merge_answers_replaces_by_question_id() {
        let db = ReviewDb::in_memory().expect("db");
        let first = vec![
            QuestionAnswer {
                question_id: "q1".into(),
                answer: 1,
                reasoning: "draft policy".into(),
            },
            QuestionAnswer {
                question_id: "q2".into(),
                answer: 0,
                reasoning: "contradicted".into(),
            },
        ];
        db.merge_answers("owner-1", "2024-06-01T09:00:00Z", &first)
            .await
            .expect("merge");

        // A re-run upgrades q1; q2 is untouched
        let second = vec![QuestionAnswer {
            question_id: "q1".into(),
            answer: 2,
            reasoning: "final policy found".into(),
        }];
        db.merge_answers("owner-1", "2024-06-01T09:00:00Z", &second)
            .await
            .expect("merge");

        let answers = db
            .session_answers("owner-1", "2024-06-01T09:00:00Z")
            .expect("answers");
        assert_eq!(answers.len(), 2);
        let q1 = answers.iter().find(|a| a.question_id == "q1").unwrap();
        assert_eq!(q1.answer, 2);
    }

    #[tokio::test]
    async fn questions_are_scoped_to_their_owner() {
        let db = ReviewDb::in_memory().expect("db");
        db.seed_questions(&[
            EvaluationQuestion {
                id: "q1".into(),
                owner_id: "owner-1".into(),
                category_id: "security".into(),
                text: "Is data encrypted at rest?".into(),
            },
            EvaluationQuestion {
                id: "q2".into(),
                owner_id: "owner-2".into(),
                category_id: "security".into(),
                text: "Is there an incident response plan?".into(),
            },
        ])
        .expect("seed");

        let questions = db.questions_for_owner("owner-1").await.expect("questions");
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].id, "q1");
    }
}
