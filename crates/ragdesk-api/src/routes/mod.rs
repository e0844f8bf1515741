pub mod conversations;
pub mod documents;
pub mod health;
pub mod kb_access;
pub mod memories;
pub mod openapi;
pub mod prompts;
pub mod query;

use serde::Serialize;
use utoipa::ToSchema;

/// Plain acknowledgement body
#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
}

impl StatusResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
        }
    }
}
