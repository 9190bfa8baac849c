//! The boundary exposed to callers: job submission and the status read path

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::Result;
use crate::processing::SubmitOutcome;
use crate::types::{DocumentRecord, IngestJob};

use super::state::AppState;

/// Response from job submission
#[derive(Debug, Serialize)]
pub struct SubmitJobResponse {
    pub doc_id: Uuid,
    /// True when an in-flight job for this doc id absorbed the submission
    pub deduplicated: bool,
}

/// POST /api/jobs - register the upload and enqueue its ingestion job
pub async fn submit_job(
    State(state): State<AppState>,
    Json(mut job): Json<IngestJob>,
) -> Result<(StatusCode, Json<SubmitJobResponse>)> {
    // A fresh upload without a timestamp starts its own state machine now
    if job.uploaded_at.is_empty() {
        job.uploaded_at = chrono::Utc::now().to_rfc3339();
    }

    // Registration is idempotent; an existing record is left untouched
    state.documents().create(&job.initial_record()).await?;

    let doc_id = job.doc_id;
    let outcome = state.queue().submit(job).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitJobResponse {
            doc_id,
            deduplicated: outcome == SubmitOutcome::Duplicate,
        }),
    ))
}

/// GET /api/chats/:chat_id/documents - status read path polled by the UI
pub async fn list_chat_documents(
    State(state): State<AppState>,
    Path(chat_id): Path<String>,
) -> Result<Json<Vec<DocumentRecord>>> {
    let records = state.documents().list_by_chat(&chat_id).await?;
    Ok(Json(records))
}
