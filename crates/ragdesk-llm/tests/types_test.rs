use ragdesk_llm::{Content, Message, Tool, ToolCall, ToolChoice};
use serde_json::json;

#[test]
fn test_human_message_serializes_as_user_role() {
    let value = serde_json::to_value(Message::human("Hello")).unwrap();
    assert_eq!(value, json!({"role": "user", "content": "Hello"}));
}

#[test]
fn test_ai_message_with_tool_calls() {
    let msg = Message::ai_with_tools(vec![ToolCall::new(
        "call_1",
        "retrieve_documents",
        r#"{"query":"pricing"}"#,
    )]);

    let value = serde_json::to_value(&msg).unwrap();
    assert_eq!(value["role"], "assistant");
    assert!(value.get("content").is_none());
    assert_eq!(value["tool_calls"][0]["type"], "function");
    assert_eq!(value["tool_calls"][0]["function"]["name"], "retrieve_documents");

    assert_eq!(msg.tool_calls().len(), 1);
    assert_eq!(msg.ai_text(), None);
}

#[test]
fn test_tool_result_roundtrip() {
    let msg = Message::tool_result("call_1", "No matching documents found.");
    let json = serde_json::to_string(&msg).unwrap();
    let back: Message = serde_json::from_str(&json).unwrap();
    assert_eq!(back, msg);
    assert_eq!(back.role(), "tool");
}

#[test]
fn test_ai_text_skips_blank_content() {
    assert_eq!(Message::ai("   ").ai_text(), None);
    assert_eq!(Message::ai("answer").ai_text().as_deref(), Some("answer"));
    assert_eq!(Message::human("question").ai_text(), None);
}

#[test]
fn test_content_parts_flatten() {
    let content: Content = serde_json::from_value(json!([
        {"type": "text", "text": "first"},
        {"type": "text", "text": "second"}
    ]))
    .unwrap();

    assert_eq!(content.to_text(), "first\nsecond");
    assert_eq!(content.as_text(), None);
    assert!(!content.is_empty());
}

#[test]
fn test_tool_call_argument_parsing() {
    #[derive(serde::Deserialize)]
    struct Args {
        query: String,
    }

    let call = ToolCall::new("id", "retrieve_documents", r#"{"query":"refund policy"}"#);
    let args: Args = call.parse_arguments().unwrap();
    assert_eq!(args.query, "refund policy");

    let bad = ToolCall::new("id", "retrieve_documents", "not json");
    assert!(bad.arguments_value().is_err());
}

#[test]
fn test_tool_definition_shape() {
    let tool = Tool::new(
        "retrieve_documents",
        "Search the knowledge base",
        json!({"type": "object", "properties": {"query": {"type": "string"}}}),
    );
    let value = serde_json::to_value(&tool).unwrap();
    assert_eq!(value["type"], "function");
    assert_eq!(value["function"]["name"], "retrieve_documents");
    assert_eq!(tool.name(), "retrieve_documents");
}

#[test]
fn test_tool_choice_serialization() {
    assert_eq!(serde_json::to_value(ToolChoice::auto()).unwrap(), json!("auto"));
    assert_eq!(
        serde_json::to_value(ToolChoice::force("retrieve_documents")).unwrap(),
        json!({"type": "function", "function": {"name": "retrieve_documents"}})
    );
}
