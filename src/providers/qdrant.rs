//! Qdrant-backed vector index over the REST API

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::VectorIndexConfig;
use crate::error::{Error, Result};
use crate::types::Chunk;

use super::vector_index::{PointFilter, SearchHit, VectorIndex};

/// Lightweight HTTP client for Qdrant operations
pub struct QdrantIndex {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    collection: String,
}

impl QdrantIndex {
    pub fn new(config: &VectorIndexConfig) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            collection: config.collection.clone(),
        })
    }

    /// Collection this index writes to
    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut req = self.client.request(method, url);
        if let Some(api_key) = &self.api_key {
            if !api_key.is_empty() {
                req = req.header("api-key", api_key);
            }
        }
        req
    }

    async fn collection_exists(&self) -> Result<bool> {
        let response = self
            .request(Method::GET, &format!("collections/{}", self.collection))
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(Error::vector_index(format!(
                    "collection existence check failed ({}): {}",
                    status, body
                )))
            }
        }
    }

    /// Ensure keyword payload indexes for the filterable keys
    async fn ensure_payload_indexes(&self) -> Result<()> {
        for field in ["chat_id", "document_id"] {
            let body = json!({
                "field_name": field,
                "field_schema": "keyword",
            });

            let response = self
                .request(Method::PUT, &format!("collections/{}/index", self.collection))
                .json(&body)
                .send()
                .await?;

            if response.status().is_success() || response.status() == StatusCode::CONFLICT {
                tracing::debug!(collection = %self.collection, field, "Payload index ensured");
            } else {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                tracing::warn!(
                    collection = %self.collection,
                    field,
                    "Failed to ensure payload index ({}): {}",
                    status,
                    body
                );
            }
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct QueryResponse {
    result: QueryResult,
}

/// Qdrant returns either a bare array or an object with a `points` field,
/// depending on version.
#[derive(Deserialize)]
#[serde(untagged)]
enum QueryResult {
    Points(Vec<RawScoredPoint>),
    Object { points: Vec<RawScoredPoint> },
}

#[derive(Deserialize)]
struct RawScoredPoint {
    id: Value,
    score: f32,
    payload: Option<Value>,
}

fn stringify_point_id(id: Value) -> String {
    match id {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        other => other.to_string(),
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn ensure_collection(&self, dimensions: usize) -> Result<()> {
        if !self.collection_exists().await? {
            let body = json!({
                "vectors": {
                    "size": dimensions,
                    "distance": "Cosine"
                }
            });

            let response = self
                .request(Method::PUT, &format!("collections/{}", self.collection))
                .json(&body)
                .send()
                .await?;

            // A concurrent starter may win the creation race; conflict is fine
            if !response.status().is_success() && response.status() != StatusCode::CONFLICT {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(Error::vector_index(format!(
                    "failed to create collection ({}): {}",
                    status, body
                )));
            }
            tracing::info!(
                collection = %self.collection,
                dimensions,
                "Vector collection ensured"
            );
        }

        self.ensure_payload_indexes().await
    }

    async fn upsert(&self, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let points: Vec<Value> = chunks
            .iter()
            .map(|chunk| {
                json!({
                    "id": chunk.id.to_string(),
                    "vector": chunk.embedding,
                    "payload": chunk.payload(),
                })
            })
            .collect();

        let response = self
            .request(Method::PUT, &format!("collections/{}/points", self.collection))
            .query(&[("wait", "true")])
            .json(&json!({ "points": points }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::vector_index(format!(
                "upsert of {} points failed ({}): {}",
                chunks.len(),
                status,
                body
            )));
        }

        tracing::debug!(collection = %self.collection, points = chunks.len(), "Points upserted");
        Ok(())
    }

    async fn search(
        &self,
        vector: &[f32],
        filter: &PointFilter,
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        let mut body = serde_json::Map::new();
        body.insert("query".into(), json!(vector));
        body.insert("limit".into(), json!(limit));
        body.insert("with_payload".into(), json!(true));
        if !filter.is_empty() {
            body.insert("filter".into(), filter.to_qdrant());
        }
        let body = Value::Object(body);

        let response = self
            .request(
                Method::POST,
                &format!("collections/{}/points/query", self.collection),
            )
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::vector_index(format!(
                "search failed ({}): {}",
                status, body
            )));
        }

        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|e| Error::vector_index(format!("unexpected search response: {}", e)))?;

        let points = match parsed.result {
            QueryResult::Points(points) => points,
            QueryResult::Object { points } => points,
        };

        let mut hits = Vec::with_capacity(points.len());
        for point in points {
            let Some(payload_value) = point.payload else {
                continue;
            };
            match serde_json::from_value(payload_value) {
                Ok(payload) => hits.push(SearchHit {
                    id: stringify_point_id(point.id),
                    score: point.score,
                    payload,
                }),
                Err(e) => {
                    tracing::warn!(collection = %self.collection, "Skipping malformed payload: {}", e);
                }
            }
        }

        Ok(hits)
    }

    async fn delete(&self, filter: &PointFilter) -> Result<()> {
        let response = self
            .request(
                Method::POST,
                &format!("collections/{}/points/delete", self.collection),
            )
            .query(&[("wait", "true")])
            .json(&json!({ "filter": filter.to_qdrant() }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::vector_index(format!(
                "delete failed ({}): {}",
                status, body
            )));
        }

        Ok(())
    }

    fn name(&self) -> &str {
        "qdrant"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::GET, Method::POST, Method::PUT, MockServer};
    use uuid::Uuid;

    fn index_for(server: &MockServer) -> QdrantIndex {
        QdrantIndex::new(&VectorIndexConfig {
            url: server.base_url(),
            collection: "chat_documents".into(),
            api_key: None,
        })
        .expect("index")
    }

    fn sample_chunk() -> Chunk {
        Chunk {
            id: Uuid::new_v4(),
            text: "The supplier provides a data processing agreement.".into(),
            document_id: Uuid::new_v4(),
            chat_id: "chat-1".into(),
            blob_key: "chat-1/contract.pdf".into(),
            file_name: "contract.pdf".into(),
            page_number: Some(1),
            chunk_index: 0,
            embedding: vec![0.1, 0.2, 0.3],
        }
    }

    #[tokio::test]
    async fn ensure_collection_creates_only_when_missing() {
        let server = MockServer::start_async().await;
        let existence = server
            .mock_async(|when, then| {
                when.method(GET).path("/collections/chat_documents");
                then.status(404);
            })
            .await;
        let create = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/collections/chat_documents")
                    .json_body_partial(r#"{"vectors": {"size": 3, "distance": "Cosine"}}"#);
                then.status(200).json_body(serde_json::json!({"result": true}));
            })
            .await;
        let indexes = server
            .mock_async(|when, then| {
                when.method(PUT).path("/collections/chat_documents/index");
                then.status(200).json_body(serde_json::json!({"result": true}));
            })
            .await;

        let index = index_for(&server);
        index.ensure_collection(3).await.expect("ensure ok");

        existence.assert_async().await;
        create.assert_async().await;
        assert_eq!(indexes.hits_async().await, 2);
    }

    #[tokio::test]
    async fn ensure_collection_skips_creation_when_present() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/collections/chat_documents");
                then.status(200).json_body(serde_json::json!({"result": {}}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(PUT).path("/collections/chat_documents/index");
                then.status(409);
            })
            .await;
        let create = server
            .mock_async(|when, then| {
                when.method(PUT).path("/collections/chat_documents");
                then.status(200);
            })
            .await;

        let index = index_for(&server);
        index.ensure_collection(3).await.expect("ensure ok");
        assert_eq!(create.hits_async().await, 0);
    }

    #[tokio::test]
    async fn search_sends_filter_and_parses_hits() {
        let server = MockServer::start_async().await;
        let query = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/collections/chat_documents/points/query")
                    .json_body_partial(
                        r#"{"filter": {"must": [{"key": "chat_id", "match": {"value": "chat-1"}}]}}"#,
                    );
                then.status(200).json_body(serde_json::json!({
                    "result": {
                        "points": [
                            {
                                "id": "9d3b4b2e-0000-0000-0000-000000000001",
                                "score": 0.87,
                                "payload": {
                                    "text": "relevant excerpt",
                                    "document_id": "9d3b4b2e-0000-0000-0000-0000000000aa",
                                    "chat_id": "chat-1",
                                    "blob_key": "chat-1/contract.pdf",
                                    "file_name": "contract.pdf",
                                    "page_number": 2,
                                    "chunk_index": 4
                                }
                            }
                        ]
                    }
                }));
            })
            .await;

        let index = index_for(&server);
        let filter = PointFilter::new().must_match("chat_id", "chat-1");
        let hits = index.search(&[0.1, 0.2, 0.3], &filter, 5).await.expect("hits");

        query.assert_async().await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].payload.chat_id, "chat-1");
        assert_eq!(hits[0].payload.page_number, Some(2));
        assert!((hits[0].score - 0.87).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn upsert_waits_for_commit() {
        let server = MockServer::start_async().await;
        let upsert = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/collections/chat_documents/points")
                    .query_param("wait", "true");
                then.status(200).json_body(serde_json::json!({"result": {"status": "completed"}}));
            })
            .await;

        let index = index_for(&server);
        index.upsert(&[sample_chunk()]).await.expect("upsert ok");
        upsert.assert_async().await;
    }

    #[tokio::test]
    async fn delete_by_filter_targets_the_matching_points() {
        let server = MockServer::start_async().await;
        let delete = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/collections/chat_documents/points/delete")
                    .query_param("wait", "true")
                    .json_body_partial(
                        r#"{"filter": {"must": [{"key": "document_id", "match": {"value": "doc-1"}}]}}"#,
                    );
                then.status(200)
                    .json_body(serde_json::json!({"result": {"status": "completed"}}));
            })
            .await;

        let index = index_for(&server);
        let filter = PointFilter::new().must_match("document_id", "doc-1");
        index.delete(&filter).await.expect("delete ok");
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn failed_upsert_is_an_index_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(PUT).path("/collections/chat_documents/points");
                then.status(500).body("storage offline");
            })
            .await;

        let index = index_for(&server);
        let err = index.upsert(&[sample_chunk()]).await.expect_err("must fail");
        assert!(matches!(err, Error::VectorIndex(_)));
    }
}
