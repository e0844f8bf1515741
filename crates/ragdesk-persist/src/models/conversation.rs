use chrono::{DateTime, Utc};
use ragdesk_llm::types::FunctionCall;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_CONVERSATION_TITLE: &str = "New Chat";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(user_id: impl Into<String>, title: Option<&str>) -> Self {
        let now = Utc::now();
        let title = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_CONVERSATION_TITLE);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            title: title.to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Message,
    ToolCall,
    ToolResult,
}

/// One persisted conversation turn fragment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: String,
    pub conversation_id: String,
    pub user_id: String,
    pub role: MessageRole,
    pub message_type: MessageType,
    pub content: String,
    pub tool_call_id: Option<String>,
    pub tool_name: Option<String>,
    pub arguments: Option<Value>,
    pub sources: Option<Value>,
    pub created_at: DateTime<Utc>,
}

impl StoredMessage {
    fn base(conversation_id: &str, user_id: &str, role: MessageRole, message_type: MessageType) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conversation_id.to_string(),
            user_id: user_id.to_string(),
            role,
            message_type,
            content: String::new(),
            tool_call_id: None,
            tool_name: None,
            arguments: None,
            sources: None,
            created_at: Utc::now(),
        }
    }

    pub fn user_text(conversation_id: &str, user_id: &str, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::base(conversation_id, user_id, MessageRole::User, MessageType::Message)
        }
    }

    pub fn assistant_text(conversation_id: &str, user_id: &str, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::base(conversation_id, user_id, MessageRole::Assistant, MessageType::Message)
        }
    }

    /// Arguments that are not valid JSON are kept as a JSON string
    pub fn tool_call(
        conversation_id: &str,
        user_id: &str,
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        arguments: &str,
    ) -> Self {
        let arguments = serde_json::from_str(arguments)
            .unwrap_or_else(|_| Value::String(arguments.to_string()));
        Self {
            tool_call_id: Some(tool_call_id.into()),
            tool_name: Some(tool_name.into()),
            arguments: Some(arguments),
            ..Self::base(conversation_id, user_id, MessageRole::Assistant, MessageType::ToolCall)
        }
    }

    pub fn tool_result(
        conversation_id: &str,
        user_id: &str,
        tool_call_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            content: content.into(),
            ..Self::base(conversation_id, user_id, MessageRole::Assistant, MessageType::ToolResult)
        }
    }

    pub fn with_sources(mut self, sources: Value) -> Self {
        self.sources = Some(sources);
        self
    }

    /// Rebuild the tool call this record describes, if it is one
    pub fn as_tool_call(&self) -> Option<ragdesk_llm::ToolCall> {
        if self.message_type != MessageType::ToolCall {
            return None;
        }
        let id = self.tool_call_id.clone()?;
        let name = self.tool_name.clone()?;
        let arguments = match &self.arguments {
            Some(Value::String(raw)) => raw.clone(),
            Some(value) => value.to_string(),
            None => "{}".to_string(),
        };
        Some(ragdesk_llm::ToolCall {
            id,
            tool_type: "function".to_string(),
            function: FunctionCall { name, arguments },
        })
    }
}

impl TryFrom<StoredMessage> for ragdesk_llm::Message {
    type Error = anyhow::Error;

    fn try_from(msg: StoredMessage) -> Result<Self, Self::Error> {
        match (msg.role, msg.message_type) {
            (MessageRole::User, MessageType::Message) => {
                Ok(ragdesk_llm::Message::human(msg.content))
            }
            (MessageRole::Assistant, MessageType::Message) => {
                Ok(ragdesk_llm::Message::ai(msg.content))
            }
            (_, MessageType::ToolCall) => msg
                .as_tool_call()
                .map(|call| ragdesk_llm::Message::ai_with_tools(vec![call]))
                .ok_or_else(|| anyhow::anyhow!("Invalid tool call message: missing required fields")),
            (_, MessageType::ToolResult) => match msg.tool_call_id {
                Some(tool_call_id) => Ok(ragdesk_llm::Message::tool_result(tool_call_id, msg.content)),
                None => Err(anyhow::anyhow!("Invalid tool result message: missing tool_call_id")),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragdesk_llm::Message;

    #[test]
    fn test_conversation_title_defaults() {
        assert_eq!(Conversation::new("u", None).title, DEFAULT_CONVERSATION_TITLE);
        assert_eq!(Conversation::new("u", Some("  ")).title, DEFAULT_CONVERSATION_TITLE);
        assert_eq!(Conversation::new("u", Some("Pricing")).title, "Pricing");
    }

    #[test]
    fn test_tool_call_roundtrip_into_llm_message() {
        let stored = StoredMessage::tool_call("c", "u", "call_1", "retrieve_documents", r#"{"query":"x"}"#);
        assert_eq!(stored.arguments, Some(serde_json::json!({"query": "x"})));

        let msg = Message::try_from(stored).unwrap();
        let calls = msg.tool_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].function.name, "retrieve_documents");
        assert_eq!(calls[0].arguments_value().unwrap()["query"], "x");
    }

    #[test]
    fn test_unparseable_arguments_are_preserved() {
        let stored = StoredMessage::tool_call("c", "u", "call_1", "t", "{broken");
        let call = stored.as_tool_call().unwrap();
        assert_eq!(call.function.arguments, "{broken");
    }

    #[test]
    fn test_tool_result_requires_call_id() {
        let mut stored = StoredMessage::tool_result("c", "u", "call_1", "ok");
        assert!(Message::try_from(stored.clone()).is_ok());
        stored.tool_call_id = None;
        assert!(Message::try_from(stored).is_err());
    }
}
