//! Deterministic in-process clients for tests and offline development.

use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

use crate::streaming::StreamEvent;
use crate::traits::{
    ChatClient, ChatRequest, ChatResponse, EmbeddingClient, EmbeddingRequest, EmbeddingResponse,
    EventStream, LLMClient,
};
use crate::types::ToolCall;

/// A canned chat turn
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Text(String),
    ToolCalls(Vec<ToolCall>),
}

impl ScriptedReply {
    fn into_response(self) -> ChatResponse {
        match self {
            Self::Text(text) => ChatResponse {
                content: Some(text),
                tool_calls: None,
                usage: None,
                finish_reason: Some("stop".to_string()),
                raw: serde_json::Value::Null,
            },
            Self::ToolCalls(calls) => ChatResponse {
                content: None,
                tool_calls: Some(calls),
                usage: None,
                finish_reason: Some("tool_calls".to_string()),
                raw: serde_json::Value::Null,
            },
        }
    }

    fn into_events(self) -> Vec<StreamEvent> {
        match self {
            Self::Text(text) => {
                let mut events: Vec<StreamEvent> = text
                    .split_inclusive(' ')
                    .map(|piece| StreamEvent::Message {
                        content: piece.to_string(),
                    })
                    .collect();
                events.push(StreamEvent::Done {
                    finish_reason: Some("stop".to_string()),
                });
                events
            }
            Self::ToolCalls(calls) => {
                let mut events: Vec<StreamEvent> = calls
                    .into_iter()
                    .enumerate()
                    .map(|(index, call)| StreamEvent::ToolCall {
                        index: index as u32,
                        id: Some(call.id),
                        name: Some(call.function.name),
                        arguments: Some(call.function.arguments),
                    })
                    .collect();
                events.push(StreamEvent::Done {
                    finish_reason: Some("tool_calls".to_string()),
                });
                events
            }
        }
    }
}

/// Chat client that replays a fixed script and records every request it sees
#[derive(Default)]
pub struct ScriptedChatClient {
    replies: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedChatClient {
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, reply: ScriptedReply) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(reply);
        }
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn next_reply(&self, request: ChatRequest) -> Result<ScriptedReply> {
        self.requests
            .lock()
            .map_err(|_| anyhow::anyhow!("request log poisoned"))?
            .push(request);
        self.replies
            .lock()
            .map_err(|_| anyhow::anyhow!("script poisoned"))?
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("Scripted chat client ran out of replies"))
    }
}

#[async_trait]
impl ChatClient for ScriptedChatClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        Ok(self.next_reply(request)?.into_response())
    }

    async fn chat_stream(&self, request: ChatRequest) -> Result<EventStream> {
        let events = self.next_reply(request)?.into_events();
        Ok(Box::pin(futures::stream::iter(events.into_iter().map(Ok))))
    }
}

#[async_trait]
impl EmbeddingClient for ScriptedChatClient {
    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse> {
        HashEmbeddingClient::default().embed(request).await
    }
}

impl LLMClient for ScriptedChatClient {}

/// Bag-of-words feature hashing into a fixed-size, L2-normalised vector.
///
/// Texts sharing words land close together under cosine similarity.
#[derive(Debug, Clone)]
pub struct HashEmbeddingClient {
    dimensions: usize,
}

impl Default for HashEmbeddingClient {
    fn default() -> Self {
        Self { dimensions: 64 }
    }
}

impl HashEmbeddingClient {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let bucket = (fnv1a(&word.to_lowercase()) % self.dimensions as u64) as usize;
            vector[bucket] += 1.0;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

fn fnv1a(s: &str) -> u64 {
    s.bytes().fold(0xcbf29ce484222325u64, |hash, b| {
        (hash ^ b as u64).wrapping_mul(0x100000001b3)
    })
}

#[async_trait]
impl EmbeddingClient for HashEmbeddingClient {
    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse> {
        Ok(EmbeddingResponse {
            embeddings: request.input.iter().map(|t| self.embed_text(t)).collect(),
            usage: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Message;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_scripted_replies_in_order() {
        let client = ScriptedChatClient::new(vec![
            ScriptedReply::ToolCalls(vec![ToolCall::new("c1", "retrieve_documents", "{}")]),
            ScriptedReply::Text("done".into()),
        ]);

        let first = client
            .chat(ChatRequest::new("m", vec![Message::human("hi")]))
            .await
            .unwrap();
        assert_eq!(first.tool_calls.unwrap()[0].function.name, "retrieve_documents");

        let second = client.chat(ChatRequest::new("m", vec![])).await.unwrap();
        assert_eq!(second.content.as_deref(), Some("done"));

        assert!(client.chat(ChatRequest::new("m", vec![])).await.is_err());
        assert_eq!(client.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_scripted_stream_reassembles_text() {
        let client = ScriptedChatClient::new(vec![ScriptedReply::Text("a b c".into())]);
        let events: Vec<StreamEvent> = client
            .chat_stream(ChatRequest::new("m", vec![]))
            .await
            .unwrap()
            .map(|e| e.unwrap())
            .collect()
            .await;

        let text: String = events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::Message { content } => Some(content.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(text, "a b c");
        assert!(matches!(events.last(), Some(StreamEvent::Done { .. })));
    }

    #[test]
    fn test_hash_embeddings_are_normalised_and_stable() {
        let client = HashEmbeddingClient::new(32);
        let a = client.embed_text("Rust ownership rules");
        let b = client.embed_text("rust OWNERSHIP rules");
        assert_eq!(a, b);

        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);

        assert!(client.embed_text("").iter().all(|v| *v == 0.0));
    }
}
