use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::{
    config::CorsConfig,
    middleware::logging,
    routes::{conversations, documents, health, kb_access, memories, openapi, prompts, query},
    state::AppState,
};

pub fn build_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Health
        .route("/health", get(health::health_check))
        .route("/api-docs/openapi.json", get(openapi::openapi_json))
        // Query
        .route("/query", post(query::query))
        .route("/query/stream", post(query::query_stream))
        // Documents
        .route("/upload", post(documents::upload_default_document))
        .route("/upload_user_document", post(documents::upload_user_document))
        .route("/get_user_documents/:user_id", get(documents::get_user_documents))
        .route(
            "/delete_user_document/:user_id/:document_id",
            delete(documents::delete_user_document),
        )
        .route("/check_user_kb/:user_id", get(documents::check_user_kb))
        // Prompts
        .route("/add_prompt", post(prompts::add_prompt))
        .route("/get_prompts/:user_id", get(prompts::get_prompts))
        .route("/edit_prompt", put(prompts::edit_prompt))
        .route("/delete_prompt/:user_id/:name", delete(prompts::delete_prompt))
        .route("/set_active_prompt/:user_id/:name", post(prompts::set_active_prompt))
        .route("/get_active_prompt/:user_id", get(prompts::get_active_prompt))
        // Conversations
        .route("/conversations", get(conversations::list_conversations))
        .route(
            "/conversations/:conversation_id",
            get(conversations::get_conversation).delete(conversations::delete_conversation),
        )
        .route(
            "/conversations/:conversation_id/messages",
            get(conversations::list_messages),
        )
        // Access and memories
        .route(
            "/kb_access/:user_id",
            get(kb_access::get_kb_access).put(kb_access::set_kb_access),
        )
        .route(
            "/memories/:user_id",
            get(memories::list_memories).post(memories::add_memory),
        );

    let server = &state.config.server;
    Router::new()
        .merge(api_routes)
        .layer(DefaultBodyLimit::max(server.max_upload_bytes))
        .layer(middleware::from_fn(logging::log_request))
        .layer(TimeoutLayer::new(Duration::from_secs(server.request_timeout_secs)))
        .layer(CompressionLayer::new())
        .layer(build_cors_layer(&state.config.cors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn build_cors_layer(cors: &CorsConfig) -> CorsLayer {
    if !cors.enabled {
        return CorsLayer::permissive();
    }

    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    if cors.origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = cors
        .origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}
