use serde::{Deserialize, Serialize};

/// Everything a run emits: LLM deltas plus orchestration events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    InitStream {
        run_id: String,
        conversation_id: String,
        timestamp: i64,
    },

    /// Assistant text, token by token
    Message {
        content: String,
    },

    ToolCall {
        index: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        arguments: Option<String>,
    },

    ToolResult {
        tool_call_id: String,
        tool_name: String,
        result: String,
        is_error: bool,
        duration_ms: u64,
        /// Structured output kept out of the model's context
        #[serde(default, skip_serializing_if = "Option::is_none")]
        artifact: Option<serde_json::Value>,
    },

    /// One LLM completion finished
    Done {
        #[serde(skip_serializing_if = "Option::is_none")]
        finish_reason: Option<String>,
    },

    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        node_id: Option<String>,
    },

    EndStream {
        status: String,
        total_duration_ms: u64,
    },
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::EndStream { .. })
    }
}

impl From<ragdesk_llm::StreamEvent> for StreamEvent {
    fn from(event: ragdesk_llm::StreamEvent) -> Self {
        match event {
            ragdesk_llm::StreamEvent::Message { content } => Self::Message { content },
            ragdesk_llm::StreamEvent::ToolCall {
                index,
                id,
                name,
                arguments,
            } => Self::ToolCall {
                index,
                id,
                name,
                arguments,
            },
            ragdesk_llm::StreamEvent::Done { finish_reason } => Self::Done { finish_reason },
        }
    }
}
