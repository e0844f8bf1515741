use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use ragdesk_llm::{ChatClient, Message};
use ragdesk_persist::{PersistenceClient, StoredMessage};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::node::{Node, NodeType};
use crate::nodes::{LLMNode, ToolNode};
use crate::router::{NextNode, Router, SimpleRouter};
use crate::tools::ToolExecutor;
use crate::types::{GraphConfig, GraphInput, GraphOutcome, GraphState, StreamEvent};

/// Where a run's messages are written
#[derive(Debug, Clone)]
pub struct PersistenceContext {
    pub conversation_id: String,
    pub user_id: String,
    /// When false the caller stores the final answer itself (e.g. together with its sources)
    pub persist_final_answer: bool,
}

impl PersistenceContext {
    pub fn new(conversation_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            user_id: user_id.into(),
            persist_final_answer: true,
        }
    }

    pub fn defer_final_answer(mut self) -> Self {
        self.persist_final_answer = false;
        self
    }
}

#[derive(Clone)]
pub struct Graph {
    llm_client: Arc<dyn ChatClient>,
    tools: Arc<dyn ToolExecutor>,
    config: GraphConfig,
    persistence: Option<Arc<dyn PersistenceClient>>,
}

impl Graph {
    pub fn new(
        llm_client: Arc<dyn ChatClient>,
        tools: Arc<dyn ToolExecutor>,
        config: GraphConfig,
        persistence: Option<Arc<dyn PersistenceClient>>,
    ) -> Self {
        Self {
            llm_client,
            tools,
            config,
            persistence,
        }
    }

    pub fn builder() -> crate::builder::GraphBuilder {
        crate::builder::GraphBuilder::new()
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Run in the background; events arrive on the returned receiver, ending with `EndStream`
    pub fn spawn_run(
        &self,
        input: GraphInput,
        persistence_ctx: Option<PersistenceContext>,
    ) -> mpsc::Receiver<StreamEvent> {
        let (tx, rx) = mpsc::channel(self.config.event_buffer.max(1));
        let graph = self.clone();

        tokio::spawn(async move {
            let start = Instant::now();
            let status = match graph.run_with_timeout(input, tx.clone(), persistence_ctx).await {
                Ok(_) => "success",
                Err(e) => {
                    tracing::error!(error = %e, "Graph run failed");
                    let _ = tx
                        .send(StreamEvent::Error {
                            message: e.to_string(),
                            node_id: None,
                        })
                        .await;
                    "error"
                }
            };
            let _ = tx
                .send(StreamEvent::EndStream {
                    status: status.to_string(),
                    total_duration_ms: start.elapsed().as_millis() as u64,
                })
                .await;
        });

        rx
    }

    /// Drive a run to completion, discarding the event stream
    pub async fn invoke(
        &self,
        input: GraphInput,
        persistence_ctx: Option<PersistenceContext>,
    ) -> Result<GraphOutcome> {
        let (tx, mut rx) = mpsc::channel(self.config.event_buffer.max(1));
        let drain = tokio::spawn(async move { while rx.recv().await.is_some() {} });

        let result = self.run_with_timeout(input, tx, persistence_ctx).await;
        let _ = drain.await;

        Ok(GraphOutcome::from_state(result?))
    }

    async fn run_with_timeout(
        &self,
        input: GraphInput,
        event_tx: mpsc::Sender<StreamEvent>,
        ctx: Option<PersistenceContext>,
    ) -> Result<GraphState> {
        tokio::time::timeout(
            self.config.execution_timeout,
            self.execute_loop(input, event_tx, ctx),
        )
        .await
        .map_err(|_| {
            anyhow::anyhow!(
                "Run timed out after {}s",
                self.config.execution_timeout.as_secs()
            )
        })?
    }

    async fn execute_loop(
        &self,
        input: GraphInput,
        event_tx: mpsc::Sender<StreamEvent>,
        ctx: Option<PersistenceContext>,
    ) -> Result<GraphState> {
        let mut state = GraphState::from_input(input);

        event_tx
            .send(StreamEvent::InitStream {
                run_id: state.run_id.clone(),
                conversation_id: state.conversation_id.clone(),
                timestamp: chrono::Utc::now().timestamp_millis(),
            })
            .await?;

        let llm_node = LLMNode::new(Arc::clone(&self.llm_client), Arc::clone(&self.tools));
        let tool_node = ToolNode::new(Arc::clone(&self.tools));
        let router = SimpleRouter;

        let mut pending_writes: Vec<JoinHandle<()>> = Vec::new();
        let mut current_node = NodeType::LLM;
        let mut iteration = 0;

        let outcome = loop {
            if iteration >= self.config.max_iterations {
                break Err(anyhow::anyhow!(
                    "Max iterations ({}) reached",
                    self.config.max_iterations
                ));
            }

            let messages_before = state.messages.len();
            let node_start = Instant::now();

            let executed = match current_node {
                NodeType::LLM => llm_node.execute(&mut state, event_tx.clone()).await,
                NodeType::Tool => tool_node.execute(&mut state, event_tx.clone()).await,
            };
            if let Err(e) = executed {
                break Err(e);
            }

            tracing::debug!(
                run_id = %state.run_id,
                node = current_node.as_str(),
                duration_ms = node_start.elapsed().as_millis() as u64,
                "Node finished"
            );

            let next = router.next(&state, current_node);

            if let (Some(store), Some(ctx)) = (&self.persistence, &ctx) {
                let is_final = next == NextNode::End;
                pending_writes.extend(Self::persist_new_messages(
                    store,
                    ctx,
                    &state.messages[messages_before..],
                    is_final,
                ));
            }

            match next {
                NextNode::End => break Ok(()),
                NextNode::LLM => current_node = NodeType::LLM,
                NextNode::Tool => current_node = NodeType::Tool,
            }

            iteration += 1;
        };

        for write in pending_writes {
            let _ = write.await;
        }

        outcome.map(|_| state)
    }

    /// Spawn one write per stored record; the loop does not wait on them
    fn persist_new_messages(
        store: &Arc<dyn PersistenceClient>,
        ctx: &PersistenceContext,
        new_messages: &[Message],
        is_final: bool,
    ) -> Vec<JoinHandle<()>> {
        new_messages
            .iter()
            .flat_map(|msg| Self::convert_message_to_db(msg, ctx, is_final))
            .map(|record| {
                let store = Arc::clone(store);
                tokio::spawn(async move {
                    if let Err(e) = store.save_message(record).await {
                        tracing::error!("Failed to save message: {}", e);
                    }
                })
            })
            .collect()
    }

    fn convert_message_to_db(
        msg: &Message,
        ctx: &PersistenceContext,
        is_final: bool,
    ) -> Vec<StoredMessage> {
        let conversation_id = ctx.conversation_id.as_str();
        let user_id = ctx.user_id.as_str();

        match msg {
            Message::AI { .. } if !msg.tool_calls().is_empty() => {
                let mut records = Vec::new();
                if let Some(text) = msg.ai_text() {
                    records.push(StoredMessage::assistant_text(conversation_id, user_id, text));
                }
                records.extend(msg.tool_calls().iter().map(|call| {
                    StoredMessage::tool_call(
                        conversation_id,
                        user_id,
                        call.id.clone(),
                        call.function.name.clone(),
                        &call.function.arguments,
                    )
                }));
                records
            }
            Message::AI { .. } => {
                if is_final && !ctx.persist_final_answer {
                    return Vec::new();
                }
                msg.ai_text()
                    .map(|text| StoredMessage::assistant_text(conversation_id, user_id, text))
                    .into_iter()
                    .collect()
            }
            Message::Tool {
                tool_call_id,
                content,
            } => vec![StoredMessage::tool_result(
                conversation_id,
                user_id,
                tool_call_id.clone(),
                content.to_text(),
            )],
            Message::System { .. } | Message::Human { .. } => Vec::new(),
        }
    }
}
