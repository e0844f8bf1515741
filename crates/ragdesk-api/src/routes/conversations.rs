use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use ragdesk_persist::{Conversation, MessageRole, MessageType, StoredMessage};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct ListConversationsQuery {
    pub user_id: String,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub skip: u64,
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    pub user_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConversationResponse {
    pub conversation_id: String,
    pub user_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Conversation> for ConversationResponse {
    fn from(c: Conversation) -> Self {
        Self {
            conversation_id: c.id,
            user_id: c.user_id,
            title: c.title,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListConversationsResponse {
    pub conversations: Vec<ConversationResponse>,
    pub has_more: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub id: String,
    #[schema(value_type = String, example = "assistant")]
    pub role: MessageRole,
    #[schema(value_type = String, example = "message")]
    pub message_type: MessageType,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub arguments: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub sources: Option<Value>,
    pub created_at: DateTime<Utc>,
}

impl From<StoredMessage> for MessageResponse {
    fn from(m: StoredMessage) -> Self {
        Self {
            id: m.id,
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

#[derive(Debug, Serialize, ToSchema)]
pub struct ListMessagesResponse {
    pub conversation_id: String,
    pub messages: Vec<MessageResponse>,
}

async fn owned_conversation(
    state: &AppState,
    conversation_id: &str,
    user_id: &str,
) -> ApiResult<Conversation> {
    state
        .persist
        .get_conversation(conversation_id)
        .await?
        .filter(|c| c.user_id == user_id)
        .ok_or_else(|| ApiError::NotFound(format!("Conversation not found: {}", conversation_id)))
}

/// List a user's conversations, most recently active first
#[utoipa::path(
    get,
    path = "/conversations",
    params(
        ("user_id" = String, Query, description = "Owner of the conversations"),
        ("limit" = Option<i64>, Query, description = "Page size (default 20, max 100)"),
        ("skip" = Option<u64>, Query, description = "Conversations to skip")
    ),
    responses((status = 200, description = "Conversations", body = ListConversationsResponse)),
    tag = "conversations"
)]
pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListConversationsQuery>,
) -> ApiResult<Json<ListConversationsResponse>> {
    let limit = query.limit.clamp(1, MAX_PAGE_SIZE);

    let conversations = state
        .persist
        .list_conversations(&query.user_id, Some(limit), Some(query.skip))
        .await?;

    let has_more = conversations.len() as i64 == limit;
    Ok(Json(ListConversationsResponse {
        conversations: conversations
            .into_iter()
            .map(ConversationResponse::from)
            .collect(),
        has_more,
    }))
}

#[utoipa::path(
    get,
    path = "/conversations/{conversation_id}",
    params(
        ("conversation_id" = String, Path, description = "Conversation ID"),
        ("user_id" = String, Query, description = "Owner")
    ),
    responses(
        (status = 200, description = "Conversation", body = ConversationResponse),
        (status = 404, description = "Conversation not found")
    ),
    tag = "conversations"
)]
pub async fn get_conversation(
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<String>,
    Query(owner): Query<OwnerQuery>,
) -> ApiResult<Json<ConversationResponse>> {
    let conversation = owned_conversation(&state, &conversation_id, &owner.user_id).await?;
    Ok(Json(conversation.into()))
}

/// Delete a conversation with all its messages
#[utoipa::path(
    delete,
    path = "/conversations/{conversation_id}",
    params(
        ("conversation_id" = String, Path, description = "Conversation ID"),
        ("user_id" = String, Query, description = "Owner")
    ),
    responses(
        (status = 204, description = "Conversation deleted"),
        (status = 404, description = "Conversation not found")
    ),
    tag = "conversations"
)]
pub async fn delete_conversation(
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<String>,
    Query(owner): Query<OwnerQuery>,
) -> ApiResult<StatusCode> {
    if !state
        .persist
        .delete_conversation(&conversation_id, &owner.user_id)
        .await?
    {
        return Err(ApiError::NotFound(format!(
            "Conversation not found: {}",
            conversation_id
        )));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/conversations/{conversation_id}/messages",
    params(
        ("conversation_id" = String, Path, description = "Conversation ID"),
        ("user_id" = String, Query, description = "Owner")
    ),
    responses(
        (status = 200, description = "Messages, oldest first", body = ListMessagesResponse),
        (status = 404, description = "Conversation not found")
    ),
    tag = "conversations"
)]
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<String>,
    Query(owner): Query<OwnerQuery>,
) -> ApiResult<Json<ListMessagesResponse>> {
    owned_conversation(&state, &conversation_id, &owner.user_id).await?;

    let messages = state.persist.get_messages(&conversation_id).await?;
    Ok(Json(ListMessagesResponse {
        conversation_id,
        messages: messages.into_iter().map(MessageResponse::from).collect(),
    }))
}
