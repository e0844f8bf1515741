use serde::{Deserialize, Serialize};
use std::fmt;

const USER_PREFIX: &str = "user:";

/// Partition of document chunks.
///
/// Stored on every chunk as a partition key: `"default"` or `"user:<id>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum KnowledgeBase {
    Default,
    User(String),
}

impl KnowledgeBase {
    pub fn user(user_id: impl Into<String>) -> Self {
        Self::User(user_id.into())
    }

    pub fn partition_key(&self) -> String {
        match self {
            Self::Default => "default".to_string(),
            Self::User(id) => format!("{}{}", USER_PREFIX, id),
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::Default => None,
            Self::User(id) => Some(id),
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Self::Default)
    }

    /// Label used in API responses
    pub fn label(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::User(_) => "user",
        }
    }
}

impl fmt::Display for KnowledgeBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.partition_key())
    }
}

impl From<KnowledgeBase> for String {
    fn from(kb: KnowledgeBase) -> Self {
        kb.partition_key()
    }
}

impl TryFrom<String> for KnowledgeBase {
    type Error = String;

    fn try_from(key: String) -> std::result::Result<Self, Self::Error> {
        if key == "default" {
            return Ok(Self::Default);
        }
        match key.strip_prefix(USER_PREFIX) {
            Some(id) if !id.is_empty() => Ok(Self::User(id.to_string())),
            _ => Err(format!("invalid knowledge base key: {}", key)),
        }
    }
}
