use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Named system prompt. Names are unique per user; at most one is active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub prompt: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Prompt {
    pub fn new(user_id: impl Into<String>, name: impl Into<String>, prompt: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            name: name.into(),
            prompt: prompt.into(),
            is_active: false,
            created_at: now,
            updated_at: now,
        }
    }
}
