use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use ragdesk_persist::{MemoryStore, UserMemory};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct MemoryRequest {
    pub memory_text: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MemoryResponse {
    pub id: String,
    pub memory_text: String,
    pub created_at: DateTime<Utc>,
}

impl From<UserMemory> for MemoryResponse {
    fn from(m: UserMemory) -> Self {
        Self {
            id: m.id,
            memory_text: m.memory_text,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MemoryListResponse {
    pub memories: Vec<MemoryResponse>,
}

#[utoipa::path(
    get,
    path = "/memories/{user_id}",
    params(("user_id" = String, Path, description = "User ID")),
    responses((status = 200, description = "Remembered facts, oldest first", body = MemoryListResponse)),
    tag = "memories"
)]
pub async fn list_memories(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<MemoryListResponse>> {
    let memories = state.persist.load_memories(&user_id).await?;
    Ok(Json(MemoryListResponse {
        memories: memories.into_iter().map(MemoryResponse::from).collect(),
    }))
}

/// Remember a fact about the user; it is added to the system prompt of later queries
#[utoipa::path(
    post,
    path = "/memories/{user_id}",
    params(("user_id" = String, Path, description = "User ID")),
    request_body = MemoryRequest,
    responses(
        (status = 201, description = "Memory stored", body = MemoryResponse),
        (status = 400, description = "Empty memory text")
    ),
    tag = "memories"
)]
pub async fn add_memory(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(req): Json<MemoryRequest>,
) -> ApiResult<(StatusCode, Json<MemoryResponse>)> {
    let text = req.memory_text.trim();
    if text.is_empty() {
        return Err(ApiError::BadRequest("memory_text must not be empty".to_string()));
    }

    let memory = state.persist.save_memory(&user_id, text).await?;
    Ok((StatusCode::CREATED, Json(memory.into())))
}
