use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use ragdesk_llm::Tool;

/// What a tool hands back: text for the model, plus optional structured data for the caller
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub content: String,
    pub artifact: Option<serde_json::Value>,
}

impl ToolOutput {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            artifact: None,
        }
    }

    pub fn with_artifact(mut self, artifact: serde_json::Value) -> Self {
        self.artifact = Some(artifact);
        self
    }
}

#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Definitions bound to the chat request
    fn tools(&self) -> Vec<Tool>;

    /// `arguments` is the raw JSON string produced by the model
    async fn execute(&self, tool_name: &str, arguments: &str) -> Result<ToolOutput>;
}

/// Dispatches calls to whichever executor advertises the tool
#[derive(Default, Clone)]
pub struct ToolRegistry {
    executors: Vec<Arc<dyn ToolExecutor>>,
    by_name: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, executor: Arc<dyn ToolExecutor>) -> Self {
        let index = self.executors.len();
        for tool in executor.tools() {
            self.by_name.insert(tool.name().to_string(), index);
        }
        self.executors.push(executor);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

#[async_trait]
impl ToolExecutor for ToolRegistry {
    fn tools(&self) -> Vec<Tool> {
        self.executors.iter().flat_map(|e| e.tools()).collect()
    }

    async fn execute(&self, tool_name: &str, arguments: &str) -> Result<ToolOutput> {
        let index = self
            .by_name
            .get(tool_name)
            .ok_or_else(|| anyhow::anyhow!("Unknown tool: {}", tool_name))?;
        self.executors[*index].execute(tool_name, arguments).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Upper;

    #[async_trait]
    impl ToolExecutor for Upper {
        fn tools(&self) -> Vec<Tool> {
            vec![Tool::new("upper", "Uppercase", json!({"type": "object"}))]
        }

        async fn execute(&self, _tool_name: &str, arguments: &str) -> Result<ToolOutput> {
            Ok(ToolOutput::text(arguments.to_uppercase()).with_artifact(json!({"len": arguments.len()})))
        }
    }

    #[tokio::test]
    async fn test_registry_dispatch() {
        let registry = ToolRegistry::new().register(Arc::new(Upper));
        assert_eq!(registry.tools().len(), 1);

        let out = registry.execute("upper", "abc").await.unwrap();
        assert_eq!(out.content, "ABC");
        assert_eq!(out.artifact, Some(json!({"len": 3})));

        assert!(registry.execute("lower", "abc").await.is_err());
    }
}
