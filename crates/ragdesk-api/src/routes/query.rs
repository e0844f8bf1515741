use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::{Stream, StreamExt};
use ragdesk_graph::{
    build_history, Graph, GraphInput, PersistenceContext, StreamEvent as GraphStreamEvent,
    ToolArtifact,
};
use ragdesk_llm::Message;
use ragdesk_persist::{KnowledgeBase, StoredMessage, UserMemory};
use ragdesk_retrieval::{collect_sources, select_knowledge_base, KbType, Source};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::ReceiverStream;
use utoipa::ToSchema;

use super::prompts::NO_ACTIVE_PROMPT;
use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

const TITLE_MAX_CHARS: usize = 60;

#[derive(Debug, Deserialize, ToSchema)]
pub struct QueryRequest {
    pub query: String,
    pub user_id: String,
    /// `default`, `custom` or omitted for automatic selection
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "custom")]
    pub kb_type: Option<KbType>,
    /// Continue an existing conversation; a new one is created when omitted
    #[serde(default)]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QueryResponse {
    pub response: String,
    #[schema(value_type = Vec<Object>)]
    pub sources: Vec<Source>,
    pub conversation_id: String,
    pub knowledge_base: String,
}

/// Everything needed to start an agent run for one query
struct PreparedRun {
    graph: Graph,
    input: GraphInput,
    ctx: PersistenceContext,
    conversation_id: String,
    user_id: String,
    kb: KnowledgeBase,
}

/// Answer a query with the user's active prompt and the selected knowledge base
#[utoipa::path(
    post,
    path = "/query",
    request_body = QueryRequest,
    responses(
        (status = 200, description = "Answer with its sources", body = QueryResponse),
        (status = 403, description = "Default knowledge base not granted"),
        (status = 404, description = "No active prompt, or unknown conversation")
    ),
    tag = "query"
)]
pub async fn query(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QueryRequest>,
) -> ApiResult<Json<QueryResponse>> {
    let run = prepare_run(&state, req).await?;

    let outcome = run.graph.invoke(run.input, Some(run.ctx)).await?;

    let response = outcome.final_response().unwrap_or_default();
    let sources = collect_sources(&outcome.artifacts);
    finish_run(&state, &run.conversation_id, &run.user_id, &response, &sources).await?;

    tracing::info!(
        conversation_id = %run.conversation_id,
        kb = %run.kb,
        sources = sources.len(),
        "Query answered"
    );

    Ok(Json(QueryResponse {
        response,
        sources,
        conversation_id: run.conversation_id,
        knowledge_base: run.kb.label().to_string(),
    }))
}

/// Same as `/query`, streamed as Server-Sent Events
///
/// Emits `conversation` first, then the agent events, then `sources` just
/// before `end_stream` when the run succeeds.
#[utoipa::path(
    post,
    path = "/query/stream",
    request_body = QueryRequest,
    responses(
        (status = 200, description = "Streaming response", content_type = "text/event-stream"),
        (status = 404, description = "No active prompt, or unknown conversation")
    ),
    tag = "query"
)]
pub async fn query_stream(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QueryRequest>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let PreparedRun {
        graph,
        input,
        ctx,
        conversation_id,
        user_id,
        kb,
    } = prepare_run(&state, req).await?;

    let mut events = ReceiverStream::new(graph.spawn_run(input, Some(ctx)));

    let sse_stream = async_stream::stream! {
        yield Ok::<Event, Infallible>(sse_json("conversation", &json!({
            "conversation_id": conversation_id,
            "knowledge_base": kb.label(),
        })));

        let mut collector = RunCollector::default();
        while let Some(event) = events.next().await {
            collector.observe(&event);

            if let GraphStreamEvent::EndStream { status, .. } = &event {
                if status == "success" {
                    let response = collector.final_response();
                    let sources = collect_sources(&collector.artifacts);
                    if let Err(e) = finish_run(&state, &conversation_id, &user_id, &response, &sources).await {
                        tracing::error!(conversation_id = %conversation_id, error = %e, "Failed to store final answer");
                    }
                    yield Ok::<Event, Infallible>(sse_json("sources", &json!({ "sources": sources })));
                }
            }

            yield Ok::<Event, Infallible>(to_sse_event(&event));
        }
    };

    Ok(Sse::new(sse_stream).keep_alive(KeepAlive::default()))
}

async fn prepare_run(state: &AppState, req: QueryRequest) -> ApiResult<PreparedRun> {
    if req.user_id.trim().is_empty() {
        return Err(ApiError::BadRequest("user_id must not be empty".to_string()));
    }
    if req.query.trim().is_empty() {
        return Err(ApiError::BadRequest("query must not be empty".to_string()));
    }
    let user_id = req.user_id;

    let prompt = state
        .persist
        .get_active_prompt(&user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(NO_ACTIVE_PROMPT.to_string()))?;

    let kb = select_knowledge_base(
        state.persist.as_ref(),
        &user_id,
        req.kb_type.unwrap_or_default(),
        state.config.selection_policy(),
    )
    .await?;

    let conversation_id = match req.conversation_id {
        Some(id) => {
            state
                .persist
                .get_conversation(&id)
                .await?
                .filter(|c| c.user_id == user_id)
                .ok_or_else(|| ApiError::NotFound(format!("Conversation not found: {}", id)))?
                .id
        }
        None => {
            state
                .persist
                .create_conversation(&user_id, Some(&conversation_title(&req.query)))
                .await?
                .id
        }
    };

    // History is read before the new user message is stored
    let history = build_history(
        state.persist.get_messages(&conversation_id).await?,
        &state.config.agent.history,
    );
    let memories = state.persist.load_memories(&user_id).await?;

    state
        .persist
        .save_message(StoredMessage::user_text(&conversation_id, &user_id, req.query.as_str()))
        .await?;

    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(Message::system(system_prompt(&prompt.prompt, &memories)));
    messages.extend(history);
    messages.push(Message::human(req.query));

    let graph = state.graph_for(kb.clone())?;
    let input = GraphInput::new(
        conversation_id.clone(),
        messages,
        (&state.config.llm).into(),
    );
    let ctx = PersistenceContext::new(conversation_id.clone(), user_id.clone()).defer_final_answer();

    tracing::debug!(conversation_id = %conversation_id, kb = %kb, "Starting agent run");

    Ok(PreparedRun {
        graph,
        input,
        ctx,
        conversation_id,
        user_id,
        kb,
    })
}

/// Stores the final answer with its sources and bumps the conversation
async fn finish_run(
    state: &AppState,
    conversation_id: &str,
    user_id: &str,
    response: &str,
    sources: &[Source],
) -> ApiResult<()> {
    if !response.is_empty() {
        let sources = serde_json::to_value(sources)
            .map_err(|e| ApiError::Internal(format!("Failed to encode sources: {}", e)))?;
        state
            .persist
            .save_message(
                StoredMessage::assistant_text(conversation_id, user_id, response)
                    .with_sources(sources),
            )
            .await?;
    }
    state.persist.touch_conversation(conversation_id).await?;
    Ok(())
}

fn system_prompt(prompt: &str, memories: &[UserMemory]) -> String {
    if memories.is_empty() {
        return prompt.to_string();
    }

    let facts: Vec<String> = memories
        .iter()
        .map(|m| format!("- {}", m.memory_text))
        .collect();
    format!("{}\n\nKnown facts about the user:\n{}", prompt, facts.join("\n"))
}

fn conversation_title(query: &str) -> String {
    query.trim().chars().take(TITLE_MAX_CHARS).collect()
}

/// Rebuilds the final answer and artifacts from a run's event stream
#[derive(Debug, Default)]
struct RunCollector {
    current_text: String,
    last_text: Option<String>,
    artifacts: Vec<ToolArtifact>,
}

impl RunCollector {
    fn observe(&mut self, event: &GraphStreamEvent) {
        match event {
            GraphStreamEvent::Message { content } => self.current_text.push_str(content),
            GraphStreamEvent::Done { .. } => {
                let text = std::mem::take(&mut self.current_text);
                if !text.trim().is_empty() {
                    self.last_text = Some(text);
                }
            }
            GraphStreamEvent::ToolResult {
                tool_call_id,
                tool_name,
                artifact: Some(data),
                ..
            } => self.artifacts.push(ToolArtifact {
                tool_call_id: tool_call_id.clone(),
                tool_name: tool_name.clone(),
                data: data.clone(),
            }),
            _ => {}
        }
    }

    fn final_response(&self) -> String {
        self.last_text.clone().unwrap_or_default()
    }
}

fn event_name(event: &GraphStreamEvent) -> &'static str {
    match event {
        GraphStreamEvent::InitStream { .. } => "init_stream",
        GraphStreamEvent::Message { .. } => "message",
        GraphStreamEvent::ToolCall { .. } => "tool_call",
        GraphStreamEvent::ToolResult { .. } => "tool_result",
        GraphStreamEvent::Done { .. } => "done",
        GraphStreamEvent::Error { .. } => "error",
        GraphStreamEvent::EndStream { .. } => "end_stream",
    }
}

fn to_sse_event(event: &GraphStreamEvent) -> Event {
    sse_json(event_name(event), event)
}

fn sse_json<T: Serialize>(name: &str, data: &T) -> Event {
    Event::default()
        .event(name)
        .json_data(data)
        .unwrap_or_else(|e| Event::default().event("error").data(e.to_string()))
}
