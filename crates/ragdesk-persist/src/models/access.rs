use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Grant to query the shared knowledge base
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KbAccess {
    pub user_id: String,
    pub has_access_to_default_kb: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserMemory {
    pub id: String,
    pub user_id: String,
    pub memory_text: String,
    pub created_at: DateTime<Utc>,
}

impl UserMemory {
    pub fn new(user_id: impl Into<String>, memory_text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            memory_text: memory_text.into(),
            created_at: Utc::now(),
        }
    }
}
