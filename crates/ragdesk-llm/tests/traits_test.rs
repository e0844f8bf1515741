use ragdesk_llm::mock::{HashEmbeddingClient, ScriptedChatClient, ScriptedReply};
use ragdesk_llm::{
    ChatClient, ChatOptions, ChatRequest, EmbeddingClient, EmbeddingRequest, Message, TokenUsage,
    Tool, ToolChoice,
};
use serde_json::json;

#[test]
fn test_chat_options_builder() {
    let options = ChatOptions::new()
        .temperature(0.0)
        .max_tokens(512)
        .tools(vec![Tool::new("t", "d", json!({"type": "object"}))])
        .tool_choice(ToolChoice::auto());

    assert_eq!(options.temperature, Some(0.0));
    assert_eq!(options.max_tokens, Some(512));
    assert_eq!(options.tools.as_ref().map(Vec::len), Some(1));
    assert_eq!(options.tool_choice, Some(ToolChoice::auto()));
}

#[test]
fn test_token_usage_add() {
    let mut usage = TokenUsage::default();
    usage.add(&TokenUsage {
        input_tokens: 10,
        output_tokens: 5,
        total_tokens: 15,
    });
    usage.add(&TokenUsage {
        input_tokens: 1,
        output_tokens: 1,
        total_tokens: 2,
    });
    assert_eq!(usage.total_tokens, 17);
    assert_eq!(usage.input_tokens, 11);
}

#[tokio::test]
async fn test_embed_query_default_method() {
    let client = HashEmbeddingClient::new(16);
    let vector = client.embed_query("any-model", "hello world").await.unwrap();
    assert_eq!(vector.len(), 16);
}

#[tokio::test]
async fn test_embed_keeps_input_order() {
    let client = HashEmbeddingClient::new(16);
    let response = client
        .embed(EmbeddingRequest::new(
            "any-model",
            vec!["alpha".into(), "beta".into()],
        ))
        .await
        .unwrap();

    assert_eq!(response.embeddings[0], client.embed_text("alpha"));
    assert_eq!(response.embeddings[1], client.embed_text("beta"));
}

#[tokio::test]
async fn test_chat_client_as_trait_object() {
    let client: Box<dyn ChatClient> =
        Box::new(ScriptedChatClient::new(vec![ScriptedReply::Text("hi".into())]));
    let response = client
        .chat(ChatRequest::new("gpt-4o-mini", vec![Message::human("hello")]))
        .await
        .unwrap();
    assert_eq!(response.content.as_deref(), Some("hi"));
}
