use std::sync::Arc;

use anyhow::{anyhow, Result};
use ragdesk_llm::ChatClient;
use ragdesk_persist::PersistenceClient;

use crate::graph::Graph;
use crate::tools::{ToolExecutor, ToolRegistry};
use crate::types::GraphConfig;

pub struct GraphBuilder {
    llm_client: Option<Arc<dyn ChatClient>>,
    tools: Option<Arc<dyn ToolExecutor>>,
    config: GraphConfig,
    persistence: Option<Arc<dyn PersistenceClient>>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            llm_client: None,
            tools: None,
            config: GraphConfig::default(),
            persistence: None,
        }
    }

    pub fn llm_client(mut self, client: Arc<dyn ChatClient>) -> Self {
        self.llm_client = Some(client);
        self
    }

    pub fn tools(mut self, tools: Arc<dyn ToolExecutor>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn config(mut self, config: GraphConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_persistence(mut self, client: Arc<dyn PersistenceClient>) -> Self {
        self.persistence = Some(client);
        self
    }

    pub fn build(self) -> Result<Graph> {
        let llm_client = self
            .llm_client
            .ok_or_else(|| anyhow!("LLM client is required"))?;
        if self.config.max_iterations == 0 {
            return Err(anyhow!("max_iterations must be at least 1"));
        }
        let tools = self
            .tools
            .unwrap_or_else(|| Arc::new(ToolRegistry::new()));

        Ok(Graph::new(llm_client, tools, self.config, self.persistence))
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}
