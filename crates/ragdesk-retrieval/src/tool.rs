use anyhow::Result;
use async_trait::async_trait;
use ragdesk_graph::{ToolExecutor, ToolOutput};
use ragdesk_llm::Tool;
use ragdesk_persist::KnowledgeBase;
use serde::Deserialize;
use serde_json::json;

use crate::retriever::Retriever;

pub const RETRIEVE_DOCUMENTS: &str = "retrieve_documents";

#[derive(Debug, Deserialize)]
struct RetrieveArgs {
    query: String,
}

/// `retrieve_documents(query)` bound to one knowledge base for the lifetime of a query
pub struct RetrieverTool {
    retriever: Retriever,
    kb: KnowledgeBase,
}

impl RetrieverTool {
    pub fn new(retriever: Retriever, kb: KnowledgeBase) -> Self {
        Self { retriever, kb }
    }

    pub fn knowledge_base(&self) -> &KnowledgeBase {
        &self.kb
    }

    pub fn definition() -> Tool {
        Tool::new(
            RETRIEVE_DOCUMENTS,
            "Retrieve relevant documents from the knowledge base based on semantic similarity.",
            json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query describing the information needed"
                    }
                },
                "required": ["query"]
            }),
        )
    }
}

#[async_trait]
impl ToolExecutor for RetrieverTool {
    fn tools(&self) -> Vec<Tool> {
        vec![Self::definition()]
    }

    async fn execute(&self, tool_name: &str, arguments: &str) -> Result<ToolOutput> {
        if tool_name != RETRIEVE_DOCUMENTS {
            anyhow::bail!("Unknown tool: {}", tool_name);
        }

        let args: RetrieveArgs = serde_json::from_str(arguments)
            .map_err(|e| anyhow::anyhow!("Invalid arguments for {}: {}", RETRIEVE_DOCUMENTS, e))?;

        tracing::info!(kb = %self.kb, query = %args.query, "Retrieving documents");
        let retrieval = self.retriever.retrieve(&self.kb, &args.query).await?;

        Ok(ToolOutput::text(retrieval.serialized)
            .with_artifact(serde_json::to_value(&retrieval.documents)?))
    }
}
