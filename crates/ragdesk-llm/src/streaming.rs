use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::buffer_utils::{parse_sse_stream, SseLineParser};
use crate::traits::EventStream;

/// Incremental output of a streamed chat completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Message {
        content: String,
    },

    /// Tool-call fragment; fragments sharing an `index` belong to the same call
    ToolCall {
        index: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        arguments: Option<String>,
    },

    Done {
        #[serde(skip_serializing_if = "Option::is_none")]
        finish_reason: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatStreamChunk {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub choices: Vec<StreamChoice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChoice {
    #[serde(default)]
    pub index: u32,
    pub delta: Delta,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Delta {
    pub role: Option<String>,
    pub content: Option<String>,
    pub tool_calls: Option<Vec<ToolCallDelta>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallDelta {
    pub index: u32,
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub tool_type: Option<String>,
    pub function: Option<FunctionDelta>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDelta {
    pub name: Option<String>,
    pub arguments: Option<String>,
}

impl ChatStreamChunk {
    pub fn content(&self) -> Option<&str> {
        self.choices.first().and_then(|c| c.delta.content.as_deref())
    }

    pub fn to_stream_events(&self) -> Vec<StreamEvent> {
        let mut events = Vec::new();

        let Some(choice) = self.choices.first() else {
            return events;
        };

        if let Some(content) = &choice.delta.content {
            if !content.is_empty() {
                events.push(StreamEvent::Message {
                    content: content.clone(),
                });
            }
        }

        if let Some(tool_calls) = &choice.delta.tool_calls {
            for tc in tool_calls {
                events.push(StreamEvent::ToolCall {
                    index: tc.index,
                    id: tc.id.clone(),
                    name: tc.function.as_ref().and_then(|f| f.name.clone()),
                    arguments: tc.function.as_ref().and_then(|f| f.arguments.clone()),
                });
            }
        }

        if let Some(finish_reason) = &choice.finish_reason {
            events.push(StreamEvent::Done {
                finish_reason: Some(finish_reason.clone()),
            });
        }

        events
    }
}

/// Parser for `/chat/completions` stream chunks
pub struct ChatLineParser;

impl SseLineParser for ChatLineParser {
    fn parse_data_line(&self, data: &str) -> Result<Vec<StreamEvent>> {
        let chunk: ChatStreamChunk = serde_json::from_str(data)
            .map_err(|e| anyhow::anyhow!("Failed to parse chat chunk: {}", e))?;
        Ok(chunk.to_stream_events())
    }
}

pub fn parse_chat_sse_stream(response: reqwest::Response) -> EventStream {
    parse_sse_stream(response.bytes_stream(), ChatLineParser)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn byte_stream(
        parts: Vec<&'static str>,
    ) -> impl futures::Stream<Item = std::result::Result<Vec<u8>, std::io::Error>> {
        futures::stream::iter(parts.into_iter().map(|p| Ok(p.as_bytes().to_vec())))
    }

    #[tokio::test]
    async fn test_parses_content_and_tool_call_deltas() {
        let body = vec![
            "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Hel\"},\"finish_reason\":null}]}\n\n",
            "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"lo\"},\"finish_reason\":null}]}\n",
            "\ndata: {\"choices\":[{\"index\":0,\"delta\":{\"tool_calls\":[{\"index\":0,\"id\":\"call_1\",\"type\":\"function\",\"function\":{\"name\":\"retrieve_documents\",\"arguments\":\"{\\\"q\"}}]},\"finish_reason\":null}]}\n",
            "data: {\"choices\":[{\"index\":0,\"delta\":{},\"finish_reason\":\"tool_calls\"}]}\n",
            "data: [DONE]\n",
        ];

        let events: Vec<StreamEvent> = parse_sse_stream(byte_stream(body), ChatLineParser)
            .map(|e| e.unwrap())
            .collect()
            .await;

        assert_eq!(events[0], StreamEvent::Message { content: "Hel".into() });
        assert_eq!(events[1], StreamEvent::Message { content: "lo".into() });
        assert!(matches!(
            &events[2],
            StreamEvent::ToolCall { index: 0, id: Some(id), name: Some(name), .. }
                if id == "call_1" && name == "retrieve_documents"
        ));
        assert_eq!(
            events[3],
            StreamEvent::Done { finish_reason: Some("tool_calls".into()) }
        );
        assert_eq!(events[4], StreamEvent::Done { finish_reason: None });
        assert_eq!(events.len(), 5);
    }

    #[tokio::test]
    async fn test_line_split_across_chunks() {
        let body = vec![
            "data: {\"choices\":[{\"index\":0,\"delta\":{\"con",
            "tent\":\"split\"},\"finish_reason\":null}]}\n",
        ];

        let events: Vec<StreamEvent> = parse_sse_stream(byte_stream(body), ChatLineParser)
            .map(|e| e.unwrap())
            .collect()
            .await;

        assert_eq!(events, vec![StreamEvent::Message { content: "split".into() }]);
    }

    #[tokio::test]
    async fn test_malformed_chunk_is_an_error() {
        let body = vec!["data: {not json}\n"];
        let results: Vec<Result<StreamEvent>> =
            parse_sse_stream(byte_stream(body), ChatLineParser).collect().await;
        assert_eq!(results.len(), 1);
        assert!(results[0].is_err());
    }
}
