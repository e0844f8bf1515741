use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use ragdesk_graph::{
    Graph, GraphConfig, GraphInput, LLMConfig, PersistenceContext, StreamEvent, ToolExecutor,
    ToolOutput, ToolRegistry,
};
use ragdesk_llm::mock::{ScriptedChatClient, ScriptedReply};
use ragdesk_llm::{Message, Tool, ToolCall};
use ragdesk_persist::{
    ConversationStore, InMemoryPersistenceClient, MessageType, PersistenceClient,
};
use serde_json::json;

struct LookupTool;

#[async_trait]
impl ToolExecutor for LookupTool {
    fn tools(&self) -> Vec<Tool> {
        vec![Tool::new(
            "lookup",
            "Look something up",
            json!({"type": "object", "properties": {"query": {"type": "string"}}}),
        )]
    }

    async fn execute(&self, _tool_name: &str, arguments: &str) -> Result<ToolOutput> {
        let args: serde_json::Value = serde_json::from_str(arguments)?;
        let query = args["query"].as_str().unwrap_or_default();
        if query == "boom" {
            anyhow::bail!("backend unavailable");
        }
        Ok(ToolOutput::text(format!("found: {}", query))
            .with_artifact(json!([{ "source": "doc.txt", "query": query }])))
    }
}

fn lookup_call(id: &str, query: &str) -> ToolCall {
    ToolCall::new(id, "lookup", json!({ "query": query }).to_string())
}

fn graph(client: Arc<ScriptedChatClient>, store: Option<Arc<dyn PersistenceClient>>) -> Graph {
    let mut builder = Graph::builder()
        .llm_client(client)
        .tools(Arc::new(ToolRegistry::new().register(Arc::new(LookupTool))));
    if let Some(store) = store {
        builder = builder.with_persistence(store);
    }
    builder.build().unwrap()
}

fn input(query: &str) -> GraphInput {
    GraphInput::new(
        "conv-1",
        vec![Message::system("Be brief."), Message::human(query)],
        LLMConfig::new("gpt-4o-mini"),
    )
}

#[tokio::test]
async fn test_invoke_runs_tool_loop_and_collects_artifacts() {
    let client = Arc::new(ScriptedChatClient::new(vec![
        ScriptedReply::ToolCalls(vec![lookup_call("call_1", "refunds")]),
        ScriptedReply::Text("Refunds take 5 days.".into()),
    ]));

    let outcome = graph(client.clone(), None)
        .invoke(input("refund policy?"), None)
        .await
        .unwrap();

    assert_eq!(outcome.final_response().as_deref(), Some("Refunds take 5 days."));
    assert_eq!(outcome.artifacts.len(), 1);
    assert_eq!(outcome.artifacts[0].tool_name, "lookup");
    assert_eq!(outcome.artifacts[0].data[0]["query"], "refunds");

    // AI(tool call), Tool, AI(answer)
    assert_eq!(outcome.messages.len(), 3);

    let requests = client.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].options.temperature, Some(0.0));
    assert_eq!(requests[0].options.tools.as_ref().map(Vec::len), Some(1));
    // second turn sees the tool result
    assert!(matches!(requests[1].messages.last(), Some(Message::Tool { .. })));
}

#[tokio::test]
async fn test_tool_failure_is_reported_to_the_model() {
    let client = Arc::new(ScriptedChatClient::new(vec![
        ScriptedReply::ToolCalls(vec![lookup_call("call_1", "boom")]),
        ScriptedReply::Text("Sorry, search is down.".into()),
    ]));

    let outcome = graph(client, None).invoke(input("x"), None).await.unwrap();

    assert!(outcome.artifacts.is_empty());
    let tool_message = outcome
        .messages
        .iter()
        .find_map(|m| match m {
            Message::Tool { content, .. } => Some(content.to_text()),
            _ => None,
        })
        .unwrap();
    assert!(tool_message.contains("backend unavailable"));
    assert_eq!(outcome.final_response().as_deref(), Some("Sorry, search is down."));
}

#[tokio::test]
async fn test_max_iterations_fails_invoke() {
    let client = Arc::new(ScriptedChatClient::new(
        (0..10)
            .map(|i| ScriptedReply::ToolCalls(vec![lookup_call(&format!("c{}", i), "again")]))
            .collect(),
    ));
    let graph = Graph::builder()
        .llm_client(client)
        .tools(Arc::new(LookupTool))
        .config(GraphConfig::new().with_max_iterations(3))
        .build()
        .unwrap();

    let err = graph.invoke(input("loop"), None).await.unwrap_err();
    assert!(err.to_string().contains("Max iterations (3)"));
}

#[tokio::test]
async fn test_spawn_run_event_sequence() {
    let client = Arc::new(ScriptedChatClient::new(vec![
        ScriptedReply::ToolCalls(vec![lookup_call("call_1", "pricing")]),
        ScriptedReply::Text("It costs 10.".into()),
    ]));

    let mut rx = graph(client, None).spawn_run(input("price?"), None);
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }

    assert!(matches!(events.first(), Some(StreamEvent::InitStream { conversation_id, .. }) if conversation_id == "conv-1"));
    assert!(events.iter().any(|e| matches!(
        e,
        StreamEvent::ToolResult { tool_name, is_error: false, .. } if tool_name == "lookup"
    )));
    let text: String = events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Message { content } => Some(content.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(text, "It costs 10.");
    assert!(matches!(
        events.last(),
        Some(StreamEvent::EndStream { status, .. }) if status == "success"
    ));
}

#[tokio::test]
async fn test_spawn_run_reports_llm_failure() {
    let client = Arc::new(ScriptedChatClient::new(vec![]));
    let mut rx = graph(client, None).spawn_run(input("hi"), None);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }

    assert!(events.iter().any(|e| matches!(e, StreamEvent::Error { .. })));
    assert!(matches!(
        events.last(),
        Some(StreamEvent::EndStream { status, .. }) if status == "error"
    ));
}

#[tokio::test]
async fn test_persistence_hook_stores_run_messages() {
    let store = Arc::new(InMemoryPersistenceClient::new());
    let conversation = store.create_conversation("u1", None).await.unwrap();

    let client = Arc::new(ScriptedChatClient::new(vec![
        ScriptedReply::ToolCalls(vec![lookup_call("a", "one"), lookup_call("b", "two")]),
        ScriptedReply::Text("Both found.".into()),
    ]));

    let ctx = PersistenceContext::new(&conversation.id, "u1");
    graph(client, Some(store.clone()))
        .invoke(input("find both"), Some(ctx))
        .await
        .unwrap();

    let stored = store.get_messages(&conversation.id).await.unwrap();
    let kinds: Vec<MessageType> = stored.iter().map(|m| m.message_type).collect();
    assert_eq!(
        kinds,
        vec![
            MessageType::ToolCall,
            MessageType::ToolCall,
            MessageType::ToolResult,
            MessageType::ToolResult,
            MessageType::Message,
        ]
    );
    assert_eq!(stored[4].content, "Both found.");
}

#[tokio::test]
async fn test_deferred_final_answer_is_not_stored() {
    let store = Arc::new(InMemoryPersistenceClient::new());
    let client = Arc::new(ScriptedChatClient::new(vec![ScriptedReply::Text("Hi.".into())]));

    let ctx = PersistenceContext::new("conv-x", "u1").defer_final_answer();
    let outcome = graph(client, Some(store.clone()))
        .invoke(input("hello"), Some(ctx))
        .await
        .unwrap();

    assert_eq!(outcome.final_response().as_deref(), Some("Hi."));
    assert!(store.get_messages("conv-x").await.unwrap().is_empty());
}
