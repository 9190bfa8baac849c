//! Error types for the ingestion and scoring pipeline

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid or missing provider credentials (fatal, retrying will not help)
    #[error("Invalid or missing credentials: {0}")]
    Credentials(String),

    /// Provider quota exhausted (fatal for the job, distinct so callers can back off)
    #[error("Provider quota exceeded: {0}")]
    Quota(String),

    /// Blob store failure fetching raw file bytes
    #[error("Blob store error for key '{key}': {message}")]
    Blob { key: String, message: String },

    /// Text extraction failure
    #[error("Failed to extract text from '{file_name}': {message}")]
    Extract { file_name: String, message: String },

    /// Embedding generation failure
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Vector index failure
    #[error("Vector index error: {0}")]
    VectorIndex(String),

    /// LLM provider failure
    #[error("LLM error: {0}")]
    Llm(String),

    /// Status / session datastore failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Job queue failure
    #[error("Queue error: {0}")]
    Queue(String),

    /// Document not found
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a blob store error
    pub fn blob(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Blob {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a text extraction error
    pub fn extract(file_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Extract {
            file_name: file_name.into(),
            message: message.into(),
        }
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create a vector index error
    pub fn vector_index(message: impl Into<String>) -> Self {
        Self::VectorIndex(message.into())
    }

    /// Create an LLM error
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm(message.into())
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// True for failures where queue redelivery cannot help
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Credentials(_))
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            Error::Config(msg) => (StatusCode::BAD_REQUEST, "config_error", msg.clone()),
            Error::Credentials(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "credentials_error", msg.clone())
            }
            Error::Quota(msg) => (StatusCode::SERVICE_UNAVAILABLE, "quota_error", msg.clone()),
            Error::Blob { key, message } => (
                StatusCode::BAD_GATEWAY,
                "blob_error",
                format!("Blob '{}': {}", key, message),
            ),
            Error::Extract { file_name, message } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "extract_error",
                format!("Failed to extract '{}': {}", file_name, message),
            ),
            Error::Embedding(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "embedding_error", msg.clone())
            }
            Error::VectorIndex(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "vector_index_error", msg.clone())
            }
            Error::Llm(msg) => (StatusCode::SERVICE_UNAVAILABLE, "llm_error", msg.clone()),
            Error::Storage(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "storage_error", msg.clone())
            }
            Error::Queue(msg) => (StatusCode::SERVICE_UNAVAILABLE, "queue_error", msg.clone()),
            Error::DocumentNotFound(id) => (
                StatusCode::NOT_FOUND,
                "not_found",
                format!("Document not found: {}", id),
            ),
            Error::Io(err) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error", err.to_string()),
            Error::Json(err) => (StatusCode::BAD_REQUEST, "json_error", err.to_string()),
            Error::Http(err) => (StatusCode::BAD_GATEWAY, "http_error", err.to_string()),
            Error::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg.clone())
            }
        };

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}
