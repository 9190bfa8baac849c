//! Chunk type: the unit of embedding, upsert, and retrieval

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A bounded-length text segment cut from a document.
///
/// Chunk ids are fresh per ingestion run; isolation between documents and chats
/// is enforced by the payload filter, never by id scheme.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Synthetic point id
    pub id: Uuid,
    /// Non-empty text content
    pub text: String,
    /// Owning document
    pub document_id: Uuid,
    /// Owning chat partition
    pub chat_id: String,
    /// Blob key of the source file
    pub blob_key: String,
    /// Original file name, for provenance in retrieval payloads
    pub file_name: String,
    /// 1-indexed source page (paginated formats only)
    pub page_number: Option<u32>,
    /// 0-indexed position: page-local for paginated input, document-wide otherwise
    pub chunk_index: u32,
    /// Embedding vector; one fixed dimensionality per index
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub embedding: Vec<f32>,
}

/// Payload stored alongside each vector in the index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkPayload {
    pub text: String,
    pub document_id: Uuid,
    pub chat_id: String,
    pub blob_key: String,
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    pub chunk_index: u32,
}

impl Chunk {
    /// Payload for the vector index point
    pub fn payload(&self) -> ChunkPayload {
        ChunkPayload {
            text: self.text.clone(),
            document_id: self.document_id,
            chat_id: self.chat_id.clone(),
            blob_key: self.blob_key.clone(),
            file_name: self.file_name.clone(),
            page_number: self.page_number,
            chunk_index: self.chunk_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_omits_page_number_for_unpaginated_chunks() {
        let chunk = Chunk {
            id: Uuid::new_v4(),
            text: "body".into(),
            document_id: Uuid::new_v4(),
            chat_id: "chat-1".into(),
            blob_key: "chat-1/notes.docx".into(),
            file_name: "notes.docx".into(),
            page_number: None,
            chunk_index: 0,
            embedding: vec![0.1, 0.2],
        };
        let value = serde_json::to_value(chunk.payload()).expect("payload encodes");
        assert!(value.get("page_number").is_none());
        assert_eq!(value["chunk_index"], 0);
        assert_eq!(value["chat_id"], "chat-1");
    }
}
