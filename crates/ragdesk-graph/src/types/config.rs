use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Limits applied to every agent run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Node executions allowed per run before it is aborted
    pub max_iterations: usize,
    /// Wall-clock budget for a whole run
    pub execution_timeout: Duration,
    /// Capacity of the event channel between the run and its consumer
    pub event_buffer: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            execution_timeout: Duration::from_secs(300),
            event_buffer: 1000,
        }
    }
}

impl GraphConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.execution_timeout = timeout;
        self
    }
}

/// Chat-completion settings for the LLM node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LLMConfig {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl LLMConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: Some(0.0),
            max_tokens: None,
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self::new("gpt-4o-mini")
    }
}
