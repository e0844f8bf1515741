use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use futures::StreamExt;
use ragdesk_llm::types::FunctionCall;
use ragdesk_llm::{ChatClient, ChatOptions, ChatRequest, Content, EventStream, Message, ToolCall, ToolChoice};

use crate::node::{EventSender, Node, NodeType};
use crate::tools::ToolExecutor;
use crate::types::{GraphState, StreamEvent};

#[derive(Default)]
struct ToolCallBuffer {
    id: Option<String>,
    name: Option<String>,
    arguments: String,
}

pub struct LLMNode {
    client: Arc<dyn ChatClient>,
    tools: Arc<dyn ToolExecutor>,
}

impl LLMNode {
    pub fn new(client: Arc<dyn ChatClient>, tools: Arc<dyn ToolExecutor>) -> Self {
        Self { client, tools }
    }

    async fn create_stream(&self, state: &GraphState) -> Result<EventStream> {
        let mut options = ChatOptions::new();

        let tools = self.tools.tools();
        if !tools.is_empty() {
            options = options.tools(tools).tool_choice(ToolChoice::auto());
        }
        if let Some(temp) = state.llm_config.temperature {
            options = options.temperature(temp);
        }
        if let Some(max_tokens) = state.llm_config.max_tokens {
            options = options.max_tokens(max_tokens);
        }

        tracing::debug!(
            model = %state.llm_config.model,
            messages = state.messages.len(),
            "Requesting chat completion"
        );

        let request = ChatRequest::new(state.llm_config.model.clone(), state.messages.clone())
            .with_options(options);

        self.client.chat_stream(request).await
    }

    /// Forward every delta and fold them into one assistant message
    async fn process_stream(&self, mut stream: EventStream, event_tx: EventSender) -> Result<Message> {
        let mut content = String::new();
        let mut buffers: BTreeMap<u32, ToolCallBuffer> = BTreeMap::new();

        while let Some(event) = stream.next().await {
            let event = event?;

            match &event {
                ragdesk_llm::StreamEvent::Message { content: delta } => content.push_str(delta),
                ragdesk_llm::StreamEvent::ToolCall {
                    index,
                    id,
                    name,
                    arguments,
                } => {
                    let buffer = buffers.entry(*index).or_default();
                    if let Some(id) = id {
                        buffer.id = Some(id.clone());
                    }
                    if let Some(name) = name {
                        buffer.name = Some(name.clone());
                    }
                    if let Some(args) = arguments {
                        buffer.arguments.push_str(args);
                    }
                }
                ragdesk_llm::StreamEvent::Done { .. } => {}
            }

            event_tx.send(StreamEvent::from(event)).await?;
        }

        let tool_calls: Vec<ToolCall> = buffers
            .into_values()
            .filter_map(|buffer| match (buffer.id, buffer.name) {
                (Some(id), Some(name)) => Some(ToolCall {
                    id,
                    tool_type: "function".to_string(),
                    function: FunctionCall {
                        name,
                        arguments: buffer.arguments,
                    },
                }),
                _ => {
                    tracing::warn!("Dropping tool call delta without id or name");
                    None
                }
            })
            .collect();

        Ok(Message::AI {
            content: (!content.is_empty()).then(|| Content::Text(content)),
            tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
            name: None,
        })
    }
}

#[async_trait]
impl Node for LLMNode {
    async fn execute(&self, state: &mut GraphState, event_tx: EventSender) -> Result<()> {
        let stream = self.create_stream(state).await?;
        let message = self.process_stream(stream, event_tx).await?;
        state.add_message(message);
        Ok(())
    }

    fn node_type(&self) -> NodeType {
        NodeType::LLM
    }
}
