//! Blob store: fetches raw file bytes by key

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// Trait for fetching uploaded file bytes
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Fetch the raw bytes stored under `key`
    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Provider name for logging
    fn name(&self) -> &str;
}

/// Directory-rooted blob store for local runs
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a key under the root, rejecting path traversal
    fn resolve(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        if relative
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
        {
            return Err(Error::blob(key, "key escapes the store root"));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.resolve(key)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| Error::blob(key, e.to_string()))
    }

    fn name(&self) -> &str {
        "fs"
    }
}

/// Blob store fetched over HTTP; keys are appended to the base URL
pub struct HttpBlobStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBlobStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), key);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::blob(key, e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::blob(
                key,
                format!("unexpected status {}", response.status()),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::blob(key, e.to_string()))?;
        Ok(bytes.to_vec())
    }

    fn name(&self) -> &str {
        "http"
    }
}
