use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use async_trait::async_trait;

use crate::node::{EventSender, Node, NodeType};
use crate::tools::ToolExecutor;
use crate::types::{GraphState, StreamEvent, ToolArtifact};

pub struct ToolNode {
    executor: Arc<dyn ToolExecutor>,
}

impl ToolNode {
    pub fn new(executor: Arc<dyn ToolExecutor>) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl Node for ToolNode {
    async fn execute(&self, state: &mut GraphState, event_tx: EventSender) -> Result<()> {
        let tool_calls = state.get_pending_tool_calls();

        for tool_call in tool_calls {
            let start = Instant::now();
            let tool_name = tool_call.function.name.clone();

            // Failures go back to the model as results; the run continues
            let (result, is_error, artifact) = match self
                .executor
                .execute(&tool_name, &tool_call.function.arguments)
                .await
            {
                Ok(output) => {
                    if let Some(data) = &output.artifact {
                        state.add_artifact(ToolArtifact {
                            tool_call_id: tool_call.id.clone(),
                            tool_name: tool_name.clone(),
                            data: data.clone(),
                        });
                    }
                    (output.content, false, output.artifact)
                }
                Err(e) => {
                    tracing::warn!(tool = %tool_name, error = %e, "Tool execution failed");
                    (format!("Tool execution failed: {}", e), true, None)
                }
            };

            event_tx
                .send(StreamEvent::ToolResult {
                    tool_call_id: tool_call.id.clone(),
                    tool_name,
                    result: result.clone(),
                    is_error,
                    duration_ms: start.elapsed().as_millis() as u64,
                    artifact,
                })
                .await?;

            state.add_tool_result(tool_call.id, result);
        }

        Ok(())
    }

    fn node_type(&self) -> NodeType {
        NodeType::Tool
    }
}
