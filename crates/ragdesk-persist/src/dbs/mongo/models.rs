use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::{
    Conversation, DocumentChunk, KbAccess, KnowledgeBase, MessageRole, MessageType, Prompt,
    StoredMessage, UserFile, UserMemory,
};

// Collection documents: `_id` carries the record id, timestamps are BSON dates.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoPrompt {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub prompt: String,
    pub is_active: bool,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoUserFile {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: Option<String>,
    pub filename: String,
    pub storage_path: String,
    pub content_type: String,
    pub chunk_count: i64,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoChunk {
    #[serde(rename = "_id")]
    pub id: String,
    pub kb: KnowledgeBase,
    pub user_id: Option<String>,
    pub file_id: Option<String>,
    pub content: String,
    pub metadata: Map<String, Value>,
    /// Absent on search results, which unset it
    #[serde(default)]
    pub embedding: Vec<f32>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoScoredChunk {
    #[serde(flatten)]
    pub chunk: MongoChunk,
    pub similarity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoConversation {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoMessage {
    #[serde(rename = "_id")]
    pub id: String,
    pub conversation_id: String,
    pub user_id: String,
    pub role: MessageRole,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Value>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoKbAccess {
    #[serde(rename = "_id")]
    pub user_id: String,
    pub has_access_to_default_kb: bool,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoMemory {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub memory_text: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl From<Prompt> for MongoPrompt {
    fn from(p: Prompt) -> Self {
        Self {
            id: p.id,
            user_id: p.user_id,
            name: p.name,
            prompt: p.prompt,
            is_active: p.is_active,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

impl From<MongoPrompt> for Prompt {
    fn from(p: MongoPrompt) -> Self {
        Self {
            id: p.id,
            user_id: p.user_id,
            name: p.name,
            prompt: p.prompt,
            is_active: p.is_active,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

impl From<UserFile> for MongoUserFile {
    fn from(f: UserFile) -> Self {
        Self {
            id: f.id,
            user_id: f.user_id,
            filename: f.filename,
            storage_path: f.storage_path,
            content_type: f.content_type,
            chunk_count: f.chunk_count as i64,
            created_at: f.created_at,
        }
    }
}

impl From<MongoUserFile> for UserFile {
    fn from(f: MongoUserFile) -> Self {
        Self {
            id: f.id,
            user_id: f.user_id,
            filename: f.filename,
            storage_path: f.storage_path,
            content_type: f.content_type,
            chunk_count: f.chunk_count.max(0) as usize,
            created_at: f.created_at,
        }
    }
}

impl From<DocumentChunk> for MongoChunk {
    fn from(c: DocumentChunk) -> Self {
        Self {
            id: c.id,
            kb: c.kb,
            user_id: c.user_id,
            file_id: c.file_id,
            content: c.content,
            metadata: c.metadata,
            embedding: c.embedding,
            created_at: c.created_at,
        }
    }
}

impl From<MongoChunk> for DocumentChunk {
    fn from(c: MongoChunk) -> Self {
        Self {
            id: c.id,
            kb: c.kb,
            user_id: c.user_id,
            file_id: c.file_id,
            content: c.content,
            metadata: c.metadata,
            embedding: c.embedding,
            created_at: c.created_at,
        }
    }
}

impl From<MongoConversation> for Conversation {
    fn from(c: MongoConversation) -> Self {
        Self {
            id: c.id,
            user_id: c.user_id,
            title: c.title,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

impl From<Conversation> for MongoConversation {
    fn from(c: Conversation) -> Self {
        Self {
            id: c.id,
            user_id: c.user_id,
            title: c.title,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

impl From<StoredMessage> for MongoMessage {
    fn from(m: StoredMessage) -> Self {
        Self {
            id: m.id,
            conversation_id: m.conversation_id,
            user_id: m.user_id,
            role: m.role,
            message_type: m.message_type,
            content: m.content,
            tool_call_id: m.tool_call_id,
            tool_name: m.tool_name,
            arguments: m.arguments,
            sources: m.sources,
            created_at: m.created_at,
        }
    }
}

impl From<MongoMessage> for StoredMessage {
    fn from(m: MongoMessage) -> Self {
        Self {
            id: m.id,
            conversation_id: m.conversation_id,
            user_id: m.user_id,
            role: m.role,
            message_type: m.message_type,
            content: m.content,
            tool_call_id: m.tool_call_id,
            tool_name: m.tool_name,
            arguments: m.arguments,
            sources: m.sources,
            created_at: m.created_at,
        }
    }
}

impl From<MongoKbAccess> for KbAccess {
    fn from(a: MongoKbAccess) -> Self {
        Self {
            user_id: a.user_id,
            has_access_to_default_kb: a.has_access_to_default_kb,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

impl From<UserMemory> for MongoMemory {
    fn from(m: UserMemory) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            memory_text: m.memory_text,
            created_at: m.created_at,
        }
    }
}

impl From<MongoMemory> for UserMemory {
    fn from(m: MongoMemory) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            memory_text: m.memory_text,
            created_at: m.created_at,
        }
    }
}
