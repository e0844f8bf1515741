use std::fmt;
use std::str::FromStr;

use ragdesk_persist::{AccessStore, DocumentStore, KnowledgeBase};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RetrievalError};

/// Which knowledge base a query asks for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KbType {
    Default,
    #[serde(alias = "user")]
    Custom,
    /// The user's own KB when it has documents
    #[default]
    Auto,
}

impl FromStr for KbType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "default" => Ok(Self::Default),
            "custom" | "user" => Ok(Self::Custom),
            "auto" => Ok(Self::Auto),
            other => Err(format!("Unknown kb_type: {}", other)),
        }
    }
}

impl fmt::Display for KbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Default => "default",
            Self::Custom => "custom",
            Self::Auto => "auto",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionPolicy {
    /// Querying the default KB requires a `KbAccess` grant
    pub restrict_default_kb: bool,
}

pub async fn select_knowledge_base<S>(
    store: &S,
    user_id: &str,
    kb_type: KbType,
    policy: SelectionPolicy,
) -> Result<KnowledgeBase>
where
    S: DocumentStore + AccessStore + ?Sized,
{
    let kb = match kb_type {
        KbType::Default => KnowledgeBase::Default,
        KbType::Custom => {
            if store.has_documents(user_id).await? {
                KnowledgeBase::user(user_id)
            } else {
                tracing::warn!(
                    user_id = %user_id,
                    "Custom knowledge base requested but user has no documents, using default"
                );
                KnowledgeBase::Default
            }
        }
        KbType::Auto => {
            if store.has_documents(user_id).await? {
                KnowledgeBase::user(user_id)
            } else {
                KnowledgeBase::Default
            }
        }
    };

    if kb.is_default() && policy.restrict_default_kb {
        let granted = store
            .get_kb_access(user_id)
            .await?
            .is_some_and(|access| access.has_access_to_default_kb);
        if !granted {
            return Err(RetrievalError::AccessDenied(user_id.to_string()));
        }
    }

    tracing::debug!(user_id = %user_id, requested = %kb_type, selected = %kb, "Knowledge base selected");
    Ok(kb)
}
