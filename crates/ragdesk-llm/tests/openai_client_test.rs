use futures::StreamExt;
use mockito::Matcher;
use ragdesk_llm::{
    ChatClient, ChatOptions, ChatRequest, EmbeddingClient, EmbeddingRequest, Message,
    OpenAIClient, StreamEvent, Tool,
};
use serde_json::json;

#[tokio::test]
async fn test_chat_completion_with_tool_call() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer test-key")
        .match_body(Matcher::PartialJson(json!({
            "model": "gpt-4o-mini",
            "temperature": 0.0,
            "stream": false,
            "tools": [{"type": "function", "function": {"name": "retrieve_documents"}}]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "chatcmpl-1",
                "object": "chat.completion",
                "created": 0,
                "model": "gpt-4o-mini",
                "choices": [{
                    "index": 0,
                    "message": {
                        "role": "assistant",
                        "content": null,
                        "tool_calls": [{
                            "id": "call_1",
                            "type": "function",
                            "function": {"name": "retrieve_documents", "arguments": "{\"query\":\"refunds\"}"}
                        }]
                    },
                    "finish_reason": "tool_calls"
                }],
                "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = OpenAIClient::new("test-key").unwrap().with_base_url(server.url());
    let request = ChatRequest::new("gpt-4o-mini", vec![Message::human("refund policy?")])
        .with_options(ChatOptions::new().temperature(0.0).tools(vec![Tool::new(
            "retrieve_documents",
            "Search",
            json!({"type": "object"}),
        )]));

    let response = client.chat(request).await.unwrap();
    mock.assert_async().await;

    let calls = response.tool_calls.unwrap();
    assert_eq!(calls[0].id, "call_1");
    assert_eq!(response.finish_reason.as_deref(), Some("tool_calls"));
    assert_eq!(response.usage.unwrap().total_tokens, 15);
}

#[tokio::test]
async fn test_chat_error_status_surfaces_body() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(401)
        .with_body(r#"{"error":{"message":"bad key"}}"#)
        .create_async()
        .await;

    let client = OpenAIClient::new("nope").unwrap().with_base_url(server.url());
    let err = client
        .chat(ChatRequest::new("gpt-4o-mini", vec![Message::human("hi")]))
        .await
        .unwrap_err()
        .to_string();

    assert!(err.contains("401"));
    assert!(err.contains("bad key"));
}

#[tokio::test]
async fn test_chat_stream() {
    let mut server = mockito::Server::new_async().await;
    let body = concat!(
        "data: {\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\",\"content\":\"Hi\"},\"finish_reason\":null}]}\n\n",
        "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\" there\"},\"finish_reason\":null}]}\n\n",
        "data: {\"choices\":[{\"index\":0,\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
        "data: [DONE]\n\n",
    );
    server
        .mock("POST", "/chat/completions")
        .match_body(Matcher::PartialJson(json!({"stream": true})))
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(body)
        .create_async()
        .await;

    let client = OpenAIClient::new("k").unwrap().with_base_url(server.url());
    let events: Vec<StreamEvent> = client
        .chat_stream(ChatRequest::new("gpt-4o-mini", vec![Message::human("hi")]))
        .await
        .unwrap()
        .map(|e| e.unwrap())
        .collect()
        .await;

    let text: String = events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Message { content } => Some(content.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(text, "Hi there");
    assert!(events.contains(&StreamEvent::Done {
        finish_reason: Some("stop".into())
    }));
}

#[tokio::test]
async fn test_embeddings_are_batched_and_reordered() {
    let mut server = mockito::Server::new_async().await;
    let first = server
        .mock("POST", "/embeddings")
        .match_body(Matcher::PartialJson(json!({"input": ["a", "b"]})))
        .with_status(200)
        .with_body(
            json!({
                "data": [
                    {"index": 1, "embedding": [0.0, 1.0]},
                    {"index": 0, "embedding": [1.0, 0.0]}
                ],
                "usage": {"prompt_tokens": 2, "total_tokens": 2}
            })
            .to_string(),
        )
        .create_async()
        .await;
    let second = server
        .mock("POST", "/embeddings")
        .match_body(Matcher::PartialJson(json!({"input": ["c"]})))
        .with_status(200)
        .with_body(
            json!({
                "data": [{"index": 0, "embedding": [0.5, 0.5]}],
                "usage": {"prompt_tokens": 1, "total_tokens": 1}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = OpenAIClient::new("k")
        .unwrap()
        .with_base_url(server.url())
        .with_embedding_batch_size(2);

    let response = client
        .embed(EmbeddingRequest::new(
            "text-embedding-3-small",
            vec!["a".into(), "b".into(), "c".into()],
        ))
        .await
        .unwrap();

    first.assert_async().await;
    second.assert_async().await;
    assert_eq!(
        response.embeddings,
        vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.5, 0.5]]
    );
    assert_eq!(response.usage.unwrap().total_tokens, 3);
}

#[tokio::test]
async fn test_embedding_count_mismatch_is_an_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/embeddings")
        .with_status(200)
        .with_body(json!({"data": [], "usage": null}).to_string())
        .create_async()
        .await;

    let client = OpenAIClient::new("k").unwrap().with_base_url(server.url());
    let result = client
        .embed(EmbeddingRequest::new("m", vec!["a".into()]))
        .await;
    assert!(result.is_err());
}
