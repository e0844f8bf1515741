use ragdesk_llm::Message;

use crate::types::state::{GraphState, ToolArtifact};

/// Result of driving a run to completion
#[derive(Debug, Clone)]
pub struct GraphOutcome {
    pub run_id: String,
    /// Only the messages produced by the run
    pub messages: Vec<Message>,
    pub artifacts: Vec<ToolArtifact>,
}

impl GraphOutcome {
    pub fn from_state(state: GraphState) -> Self {
        let messages = state.new_messages().to_vec();
        Self {
            run_id: state.run_id,
            messages,
            artifacts: state.artifacts,
        }
    }

    /// Text of the last assistant message that has any
    pub fn final_response(&self) -> Option<String> {
        self.messages.iter().rev().find_map(Message::ai_text)
    }
}
