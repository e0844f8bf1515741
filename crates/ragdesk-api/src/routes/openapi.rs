use axum::Json;
use utoipa::OpenApi;

use super::{
    conversations, documents, health, kb_access, memories, prompts, query, StatusResponse,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Ragdesk API",
        description = "Retrieval-augmented question answering over shared and per-user knowledge bases"
    ),
    paths(
        health::health_check,
        query::query,
        query::query_stream,
        documents::upload_user_document,
        documents::upload_default_document,
        documents::get_user_documents,
        documents::delete_user_document,
        documents::check_user_kb,
        prompts::add_prompt,
        prompts::get_prompts,
        prompts::edit_prompt,
        prompts::delete_prompt,
        prompts::set_active_prompt,
        prompts::get_active_prompt,
        conversations::list_conversations,
        conversations::get_conversation,
        conversations::delete_conversation,
        conversations::list_messages,
        kb_access::get_kb_access,
        kb_access::set_kb_access,
        memories::list_memories,
        memories::add_memory,
    ),
    components(schemas(
        StatusResponse,
        health::HealthResponse,
        query::QueryRequest,
        query::QueryResponse,
        documents::UploadResponse,
        documents::DocumentSummary,
        documents::DocumentListResponse,
        documents::KbCheckResponse,
        prompts::PromptRequest,
        prompts::EditPromptRequest,
        prompts::PromptResponse,
        prompts::PromptResult,
        prompts::PromptListResponse,
        prompts::ActivePromptResponse,
        conversations::ConversationResponse,
        conversations::ListConversationsResponse,
        conversations::MessageResponse,
        conversations::ListMessagesResponse,
        kb_access::KbAccessRequest,
        kb_access::KbAccessResponse,
        memories::MemoryRequest,
        memories::MemoryResponse,
        memories::MemoryListResponse,
    )),
    tags(
        (name = "health", description = "Service status"),
        (name = "query", description = "Question answering"),
        (name = "documents", description = "Knowledge base documents"),
        (name = "prompts", description = "System prompts"),
        (name = "conversations", description = "Conversation history"),
        (name = "kb_access", description = "Default knowledge base grants"),
        (name = "memories", description = "Remembered user facts"),
    )
)]
pub struct ApiDoc;

/// Serve the OpenAPI document
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
