use ragdesk_llm::StreamEvent;
use serde_json::json;

#[test]
fn test_stream_event_wire_format() {
    let event = StreamEvent::Message {
        content: "Hello".to_string(),
    };
    assert_eq!(
        serde_json::to_value(&event).unwrap(),
        json!({"type": "message", "content": "Hello"})
    );

    let done = StreamEvent::Done { finish_reason: None };
    assert_eq!(serde_json::to_value(&done).unwrap(), json!({"type": "done"}));
}

#[test]
fn test_stream_event_tool_call_omits_missing_fields() {
    let event = StreamEvent::ToolCall {
        index: 1,
        id: None,
        name: None,
        arguments: Some(r#"ry":"x"}"#.to_string()),
    };

    let value = serde_json::to_value(&event).unwrap();
    assert_eq!(value["type"], "tool_call");
    assert_eq!(value["index"], 1);
    assert!(value.get("id").is_none());
    assert!(value.get("name").is_none());
}
