use ragdesk_llm::{Content, Message, ToolCall};
use serde::{Deserialize, Serialize};

use crate::types::config::LLMConfig;

/// Structured tool output kept out of the model's context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolArtifact {
    pub tool_call_id: String,
    pub tool_name: String,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct GraphState {
    pub conversation_id: String,
    pub run_id: String,
    pub messages: Vec<Message>,
    pub llm_config: LLMConfig,
    pub artifacts: Vec<ToolArtifact>,
    /// Index of the first message produced by this run
    pub input_len: usize,
}

impl GraphState {
    pub fn new(
        conversation_id: String,
        run_id: String,
        messages: Vec<Message>,
        llm_config: LLMConfig,
    ) -> Self {
        Self {
            conversation_id,
            run_id,
            input_len: messages.len(),
            messages,
            llm_config,
            artifacts: Vec::new(),
        }
    }

    pub fn from_input(input: GraphInput) -> Self {
        Self::new(
            input.conversation_id,
            uuid::Uuid::new_v4().to_string(),
            input.messages,
            input.llm_config,
        )
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn add_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn has_pending_tool_calls(&self) -> bool {
        self.last_message()
            .is_some_and(|msg| !msg.tool_calls().is_empty())
    }

    pub fn get_pending_tool_calls(&self) -> Vec<ToolCall> {
        self.last_message()
            .map(|msg| msg.tool_calls().to_vec())
            .unwrap_or_default()
    }

    pub fn add_tool_result(&mut self, tool_call_id: String, result: String) {
        self.messages.push(Message::Tool {
            tool_call_id,
            content: Content::text(result),
        });
    }

    pub fn add_artifact(&mut self, artifact: ToolArtifact) {
        self.artifacts.push(artifact);
    }

    /// Messages appended since the run started
    pub fn new_messages(&self) -> &[Message] {
        &self.messages[self.input_len.min(self.messages.len())..]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphInput {
    pub conversation_id: String,
    pub messages: Vec<Message>,
    pub llm_config: LLMConfig,
}

impl GraphInput {
    pub fn new(
        conversation_id: impl Into<String>,
        messages: Vec<Message>,
        llm_config: LLMConfig,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            messages,
            llm_config,
        }
    }
}
