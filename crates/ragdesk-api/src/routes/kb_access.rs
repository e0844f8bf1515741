use axum::{
    extract::{Path, State},
    Json,
};
use ragdesk_persist::{AccessStore, KbAccess};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::{error::ApiResult, state::AppState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct KbAccessRequest {
    pub has_access_to_default_kb: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct KbAccessResponse {
    pub user_id: String,
    pub has_access_to_default_kb: bool,
}

impl From<KbAccess> for KbAccessResponse {
    fn from(access: KbAccess) -> Self {
        Self {
            user_id: access.user_id,
            has_access_to_default_kb: access.has_access_to_default_kb,
        }
    }
}

/// A user without a record has no grant
#[utoipa::path(
    get,
    path = "/kb_access/{user_id}",
    params(("user_id" = String, Path, description = "User ID")),
    responses((status = 200, description = "Default knowledge base grant", body = KbAccessResponse)),
    tag = "kb_access"
)]
pub async fn get_kb_access(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<KbAccessResponse>> {
    let response = match state.persist.get_kb_access(&user_id).await? {
        Some(access) => access.into(),
        None => KbAccessResponse {
            user_id,
            has_access_to_default_kb: false,
        },
    };
    Ok(Json(response))
}

#[utoipa::path(
    put,
    path = "/kb_access/{user_id}",
    params(("user_id" = String, Path, description = "User ID")),
    request_body = KbAccessRequest,
    responses((status = 200, description = "Grant updated", body = KbAccessResponse)),
    tag = "kb_access"
)]
pub async fn set_kb_access(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(req): Json<KbAccessRequest>,
) -> ApiResult<Json<KbAccessResponse>> {
    let access = state
        .persist
        .set_kb_access(&user_id, req.has_access_to_default_kb)
        .await?;

    tracing::info!(user_id = %user_id, granted = access.has_access_to_default_kb, "Default KB access updated");
    Ok(Json(access.into()))
}
