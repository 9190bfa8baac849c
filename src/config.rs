//! Configuration for the ingestion and scoring pipeline

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PipelineConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Chunking configuration
    #[serde(default)]
    pub chunking: ChunkingConfig,
    /// Embedding provider configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    /// LLM provider configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// Vector index configuration
    #[serde(default)]
    pub vector_index: VectorIndexConfig,
    /// Blob store configuration
    #[serde(default)]
    pub blob_store: BlobStoreConfig,
    /// Datastore configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// Worker pool configuration
    #[serde(default)]
    pub processing: ProcessingConfig,
}

impl PipelineConfig {
    /// Load configuration from a TOML file, then apply environment overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let mut config: Self = toml::from_str(&raw)
            .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?;
        config.apply_env();
        Ok(config)
    }

    /// Load from the path in `REVIEW_RAG_CONFIG`, falling back to defaults
    pub fn load_or_default() -> Result<Self> {
        match std::env::var("REVIEW_RAG_CONFIG") {
            Ok(path) => Self::load(path),
            Err(_) => {
                let mut config = Self::default();
                config.apply_env();
                Ok(config)
            }
        }
    }

    /// Pull credentials from the environment; keys never live in the config file
    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("EMBEDDING_API_KEY") {
            self.embedding.api_key = Some(key);
        }
        if let Ok(key) = std::env::var("LLM_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Ok(key) = std::env::var("VECTOR_INDEX_API_KEY") {
            self.vector_index.api_key = Some(key);
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Maximum request body size in bytes
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_body_size: 1024 * 1024,
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
        }
    }
}

/// Embedding provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Base URL of the OpenAI-compatible embedding API
    pub base_url: String,
    /// Model name
    pub model: String,
    /// Embedding dimensions; the vector index collection is created with this size
    pub dimensions: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// API key, sourced from `EMBEDDING_API_KEY`
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            timeout_secs: 30,
            api_key: None,
        }
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of the OpenAI-compatible chat API
    pub base_url: String,
    /// Model name
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of chunks retrieved per scoring question
    pub retrieval_top_k: usize,
    /// API key, sourced from `LLM_API_KEY`
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.1,
            timeout_secs: 60,
            retrieval_top_k: 5,
            api_key: None,
        }
    }
}

/// Vector index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndexConfig {
    /// Qdrant base URL
    pub url: String,
    /// Collection name shared by all chats; isolation is by payload filter
    pub collection: String,
    /// Optional API key, sourced from `VECTOR_INDEX_API_KEY`
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6333".to_string(),
            collection: "chat_documents".to_string(),
            api_key: None,
        }
    }
}

/// Blob store backend selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum BlobStoreConfig {
    /// Local directory-rooted store
    Local {
        /// Root directory holding uploaded blobs
        root: PathBuf,
    },
    /// Remote store fetched over HTTP
    Http {
        /// Base URL; blob keys are appended as the path
        base_url: String,
    },
}

impl Default for BlobStoreConfig {
    fn default() -> Self {
        Self::Local {
            root: PathBuf::from("./uploads"),
        }
    }
}

/// Datastore configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database holding document status and scoring sessions
    pub database_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("./review-rag.db"),
        }
    }
}

/// Worker pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Number of jobs processed in parallel
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// Concurrent embedding calls per job; defaults to CPU count capped at 4
    pub parallel_embeddings: Option<usize>,
    /// Wall-clock budget for a single job in seconds
    #[serde(default = "default_job_timeout")]
    pub job_timeout_secs: u64,
    /// Delivery attempts before the queue gives up on a failing job
    #[serde(default = "default_max_attempts")]
    pub max_delivery_attempts: u32,
    /// Base delay between redeliveries in seconds (doubled per attempt)
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_secs: u64,
}

fn default_worker_count() -> usize {
    3
}
fn default_job_timeout() -> u64 {
    300
}
fn default_max_attempts() -> u32 {
    3
}
fn default_retry_backoff() -> u64 {
    2
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            parallel_embeddings: None,
            job_timeout_secs: default_job_timeout(),
            max_delivery_attempts: default_max_attempts(),
            retry_backoff_secs: default_retry_backoff(),
        }
    }
}

impl ProcessingConfig {
    /// Effective embedding parallelism
    pub fn embedding_parallelism(&self) -> usize {
        self.parallel_embeddings
            .unwrap_or_else(|| num_cpus::get().min(4))
            .max(1)
    }
}
