use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use ragdesk_persist::Prompt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use super::StatusResponse;
use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

pub const NO_ACTIVE_PROMPT: &str = "No active prompt found for this user.";

#[derive(Debug, Deserialize, ToSchema)]
pub struct PromptRequest {
    pub name: String,
    pub prompt: String,
    pub user_id: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct EditPromptRequest {
    pub old_name: String,
    #[serde(default)]
    pub new_name: Option<String>,
    #[serde(default)]
    pub new_prompt: Option<String>,
    pub user_id: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PromptResponse {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub prompt: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Prompt> for PromptResponse {
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

#[derive(Debug, Serialize, ToSchema)]
pub struct PromptResult {
    pub status: String,
    pub prompt: PromptResponse,
}

impl PromptResult {
    fn success(prompt: Prompt) -> Self {
        Self {
            status: "success".to_string(),
            prompt: prompt.into(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PromptListResponse {
    pub prompts: Vec<PromptResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ActivePromptResponse {
    pub active_prompt: PromptResponse,
}

fn require(field: &str, value: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::BadRequest(format!("{} must not be empty", field)));
    }
    Ok(())
}

/// Add a named prompt; it becomes active when the user has none
#[utoipa::path(
    post,
    path = "/add_prompt",
    request_body = PromptRequest,
    responses(
        (status = 201, description = "Prompt created", body = PromptResult),
        (status = 409, description = "A prompt with this name already exists")
    ),
    tag = "prompts"
)]
pub async fn add_prompt(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PromptRequest>,
) -> ApiResult<(StatusCode, Json<PromptResult>)> {
    require("user_id", &req.user_id)?;
    require("name", &req.name)?;
    require("prompt", &req.prompt)?;

    let prompt = state
        .persist
        .add_prompt(&req.user_id, req.name.trim(), &req.prompt)
        .await?;

    Ok((StatusCode::CREATED, Json(PromptResult::success(prompt))))
}

#[utoipa::path(
    get,
    path = "/get_prompts/{user_id}",
    params(("user_id" = String, Path, description = "User ID")),
    responses((status = 200, description = "All prompts of the user", body = PromptListResponse)),
    tag = "prompts"
)]
pub async fn get_prompts(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<PromptListResponse>> {
    let prompts = state.persist.list_prompts(&user_id).await?;
    Ok(Json(PromptListResponse {
        prompts: prompts.into_iter().map(PromptResponse::from).collect(),
    }))
}

/// Rename a prompt and/or replace its text
#[utoipa::path(
    put,
    path = "/edit_prompt",
    request_body = EditPromptRequest,
    responses(
        (status = 200, description = "Prompt updated", body = PromptResult),
        (status = 404, description = "Prompt not found"),
        (status = 409, description = "New name already taken")
    ),
    tag = "prompts"
)]
pub async fn edit_prompt(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EditPromptRequest>,
) -> ApiResult<Json<PromptResult>> {
    if req.new_name.is_none() && req.new_prompt.is_none() {
        return Err(ApiError::BadRequest(
            "Provide new_name and/or new_prompt".to_string(),
        ));
    }
    if let Some(name) = &req.new_name {
        require("new_name", name)?;
    }

    let prompt = state
        .persist
        .edit_prompt(
            &req.user_id,
            &req.old_name,
            req.new_name.as_deref().map(str::trim),
            req.new_prompt.as_deref(),
        )
        .await?;

    Ok(Json(PromptResult::success(prompt)))
}

#[utoipa::path(
    delete,
    path = "/delete_prompt/{user_id}/{name}",
    params(
        ("user_id" = String, Path, description = "User ID"),
        ("name" = String, Path, description = "Prompt name")
    ),
    responses(
        (status = 200, description = "Prompt deleted", body = StatusResponse),
        (status = 404, description = "Prompt not found")
    ),
    tag = "prompts"
)]
pub async fn delete_prompt(
    State(state): State<Arc<AppState>>,
    Path((user_id, name)): Path<(String, String)>,
) -> ApiResult<Json<StatusResponse>> {
    state.persist.delete_prompt(&user_id, &name).await?;
    Ok(Json(StatusResponse::success(format!("Prompt '{}' deleted", name))))
}

#[utoipa::path(
    post,
    path = "/set_active_prompt/{user_id}/{name}",
    params(
        ("user_id" = String, Path, description = "User ID"),
        ("name" = String, Path, description = "Prompt name")
    ),
    responses(
        (status = 200, description = "Prompt activated", body = PromptResult),
        (status = 404, description = "Prompt not found")
    ),
    tag = "prompts"
)]
pub async fn set_active_prompt(
    State(state): State<Arc<AppState>>,
    Path((user_id, name)): Path<(String, String)>,
) -> ApiResult<Json<PromptResult>> {
    let prompt = state.persist.set_active_prompt(&user_id, &name).await?;
    Ok(Json(PromptResult::success(prompt)))
}

#[utoipa::path(
    get,
    path = "/get_active_prompt/{user_id}",
    params(("user_id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "The active prompt", body = ActivePromptResponse),
        (status = 404, description = "No active prompt")
    ),
    tag = "prompts"
)]
pub async fn get_active_prompt(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<ActivePromptResponse>> {
    let prompt = state
        .persist
        .get_active_prompt(&user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(NO_ACTIVE_PROMPT.to_string()))?;

    Ok(Json(ActivePromptResponse {
        active_prompt: prompt.into(),
    }))
}
