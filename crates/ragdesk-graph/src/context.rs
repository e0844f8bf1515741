//! Replays stored conversation records as chat history.

use std::collections::HashSet;

use ragdesk_llm::Message;
use ragdesk_persist::{MessageType, StoredMessage};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContextPolicy {
    LastK { k: usize },
    AllMessages,
}

impl Default for ContextPolicy {
    fn default() -> Self {
        Self::LastK { k: 10 }
    }
}

/// Rebuild replayable chat history from stored records.
///
/// Consecutive tool-call records fold into one assistant message. Tool calls
/// lacking a result for every call are dropped along with their partial
/// results, as are results with no matching call. The window never opens on
/// a tool result.
pub fn build_history(records: Vec<StoredMessage>, policy: &ContextPolicy) -> Vec<Message> {
    let messages = sanitize(fold_tool_calls(records));

    match policy {
        ContextPolicy::AllMessages => messages,
        ContextPolicy::LastK { k } => {
            let start = messages.len().saturating_sub(*k);
            let mut window: Vec<Message> = messages.into_iter().skip(start).collect();
            let orphans = window
                .iter()
                .take_while(|m| matches!(m, Message::Tool { .. }))
                .count();
            window.drain(..orphans);
            window
        }
    }
}

fn fold_tool_calls(records: Vec<StoredMessage>) -> Vec<Message> {
    let mut messages: Vec<Message> = Vec::with_capacity(records.len());

    for record in records {
        if record.message_type == MessageType::ToolCall {
            let Some(call) = record.as_tool_call() else {
                tracing::warn!(id = %record.id, "Skipping malformed tool call record");
                continue;
            };
            if let Some(Message::AI {
                tool_calls: Some(calls),
                ..
            }) = messages.last_mut()
            {
                calls.push(call);
                continue;
            }
            messages.push(Message::ai_with_tools(vec![call]));
            continue;
        }

        match Message::try_from(record) {
            Ok(message) => messages.push(message),
            Err(e) => tracing::warn!(error = %e, "Skipping stored message"),
        }
    }

    messages
}

fn sanitize(messages: Vec<Message>) -> Vec<Message> {
    let mut out: Vec<Message> = Vec::with_capacity(messages.len());
    let mut i = 0;

    while i < messages.len() {
        let message = &messages[i];
        let calls = message.tool_calls();

        if !calls.is_empty() {
            let expected: HashSet<&str> = calls.iter().map(|c| c.id.as_str()).collect();
            let mut j = i + 1;
            let mut answered: HashSet<&str> = HashSet::new();
            while let Some(Message::Tool { tool_call_id, .. }) = messages.get(j) {
                answered.insert(tool_call_id.as_str());
                j += 1;
            }

            if expected.is_subset(&answered) {
                out.push(message.clone());
                for result in &messages[i + 1..j] {
                    if let Message::Tool { tool_call_id, .. } = result {
                        if expected.contains(tool_call_id.as_str()) {
                            out.push(result.clone());
                        }
                    }
                }
            }
            i = j;
            continue;
        }

        // results reached here have no preceding call
        if !matches!(message, Message::Tool { .. }) {
            out.push(message.clone());
        }
        i += 1;
    }

    out
}
