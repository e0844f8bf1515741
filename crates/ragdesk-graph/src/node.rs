use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::types::{GraphState, StreamEvent};

pub type EventSender = mpsc::Sender<StreamEvent>;

/// A unit of computation in the graph
#[async_trait]
pub trait Node: Send + Sync {
    /// Run the node, mutating state and emitting events as it goes
    async fn execute(&self, state: &mut GraphState, event_tx: EventSender) -> Result<()>;

    fn node_type(&self) -> NodeType;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    LLM,
    Tool,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LLM => "llm",
            Self::Tool => "tool",
        }
    }
}
