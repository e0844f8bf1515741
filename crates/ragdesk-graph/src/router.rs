use crate::node::NodeType;
use crate::types::GraphState;

pub trait Router: Send + Sync {
    fn next(&self, state: &GraphState, current: NodeType) -> NextNode;
}

#[derive(Debug, Clone, PartialEq)]
pub enum NextNode {
    LLM,
    Tool,
    End,
}

/// LLM -> Tool while the model asks for tools, Tool -> LLM, otherwise End
pub struct SimpleRouter;

impl Router for SimpleRouter {
    fn next(&self, state: &GraphState, current: NodeType) -> NextNode {
        match current {
            NodeType::LLM if state.has_pending_tool_calls() => NextNode::Tool,
            NodeType::LLM => NextNode::End,
            NodeType::Tool => NextNode::LLM,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LLMConfig;
    use ragdesk_llm::{Message, ToolCall};

    fn state(messages: Vec<Message>) -> GraphState {
        GraphState::new("c".into(), "r".into(), messages, LLMConfig::default())
    }

    #[test]
    fn test_routes_to_tool_when_calls_pending() {
        let s = state(vec![Message::ai_with_tools(vec![ToolCall::new("1", "t", "{}")])]);
        assert_eq!(SimpleRouter.next(&s, NodeType::LLM), NextNode::Tool);
    }

    #[test]
    fn test_ends_after_plain_answer() {
        let s = state(vec![Message::ai("done")]);
        assert_eq!(SimpleRouter.next(&s, NodeType::LLM), NextNode::End);
    }

    #[test]
    fn test_tool_always_returns_to_llm() {
        let s = state(vec![Message::tool_result("1", "ok")]);
        assert_eq!(SimpleRouter.next(&s, NodeType::Tool), NextNode::LLM);
    }
}
