use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::KnowledgeBase;

/// Pointer to a raw upload in blob storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserFile {
    pub id: String,
    /// `None` for uploads into the default knowledge base
    pub user_id: Option<String>,
    pub filename: String,
    pub storage_path: String,
    pub content_type: String,
    pub chunk_count: usize,
    pub created_at: DateTime<Utc>,
}

impl UserFile {
    pub fn new(
        user_id: Option<String>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            filename: filename.into(),
            storage_path: String::new(),
            content_type: content_type.into(),
            chunk_count: 0,
            created_at: Utc::now(),
        }
    }

    pub fn knowledge_base(&self) -> KnowledgeBase {
        match &self.user_id {
            Some(id) => KnowledgeBase::User(id.clone()),
            None => KnowledgeBase::Default,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: String,
    pub kb: KnowledgeBase,
    pub user_id: Option<String>,
    pub file_id: Option<String>,
    pub content: String,
    pub metadata: Map<String, Value>,
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

impl DocumentChunk {
    pub fn new(
        kb: KnowledgeBase,
        content: impl Into<String>,
        metadata: Map<String, Value>,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: kb.user_id().map(str::to_string),
            kb,
            file_id: None,
            content: content.into(),
            metadata,
            embedding,
            created_at: Utc::now(),
        }
    }

    pub fn with_file_id(mut self, file_id: impl Into<String>) -> Self {
        self.file_id = Some(file_id.into());
        self
    }

    /// `metadata.source`, falling back to the empty string
    pub fn source(&self) -> &str {
        self.metadata
            .get("source")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }
}

/// A chunk returned from similarity search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: DocumentChunk,
    pub similarity: f32,
}
