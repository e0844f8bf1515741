use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::openai::{OpenAIClient, DEFAULT_EMBEDDING_BATCH_SIZE};
use crate::traits::{ChatClient, EmbeddingClient, LLMClient};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    #[default]
    OpenAI,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    pub api_key: String,
    /// Defaults to https://api.openai.com/v1
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default = "default_embedding_batch_size")]
    pub embedding_batch_size: usize,
}

fn default_embedding_batch_size() -> usize {
    DEFAULT_EMBEDDING_BATCH_SIZE
}

impl OpenAIConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: None,
            embedding_batch_size: DEFAULT_EMBEDDING_BATCH_SIZE,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderDetails {
    OpenAI(OpenAIConfig),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(flatten)]
    pub details: ProviderDetails,
}

impl ProviderConfig {
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self {
            details: ProviderDetails::OpenAI(OpenAIConfig::new(api_key)),
        }
    }

    pub fn openai_with(config: OpenAIConfig) -> Self {
        Self {
            details: ProviderDetails::OpenAI(config),
        }
    }

    pub fn provider_type(&self) -> ProviderType {
        match self.details {
            ProviderDetails::OpenAI(_) => ProviderType::OpenAI,
        }
    }
}

/// One provider client seen through each capability trait
#[derive(Clone)]
pub struct ProviderClients {
    pub chat: Arc<dyn ChatClient>,
    pub embeddings: Arc<dyn EmbeddingClient>,
}

/// Builds clients from configuration
pub struct ClientFactory;

impl ClientFactory {
    pub fn create_client(config: ProviderConfig) -> Result<Arc<dyn LLMClient>> {
        match config.details {
            ProviderDetails::OpenAI(openai_config) => Ok(Arc::new(Self::openai(openai_config)?)),
        }
    }

    pub fn create_clients(config: ProviderConfig) -> Result<ProviderClients> {
        match config.details {
            ProviderDetails::OpenAI(openai_config) => {
                let client = Arc::new(Self::openai(openai_config)?);
                Ok(ProviderClients {
                    chat: client.clone(),
                    embeddings: client,
                })
            }
        }
    }

    fn openai(config: OpenAIConfig) -> Result<OpenAIClient> {
        let mut client = OpenAIClient::new(config.api_key)?
            .with_embedding_batch_size(config.embedding_batch_size);
        if let Some(base_url) = config.base_url {
            client = client.with_base_url(base_url);
        }
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_config() {
        let config = ProviderConfig::openai("test-key");
        assert_eq!(config.provider_type(), ProviderType::OpenAI);
    }

    #[test]
    fn test_deserialize_tagged_config() {
        let json = r#"{"type":"openai","api_key":"k","base_url":"http://localhost:9000/v1"}"#;
        let config: ProviderConfig = serde_json::from_str(json).unwrap();
        let ProviderDetails::OpenAI(openai) = config.details;
        assert_eq!(openai.base_url.as_deref(), Some("http://localhost:9000/v1"));
        assert_eq!(openai.embedding_batch_size, DEFAULT_EMBEDDING_BATCH_SIZE);
    }

    #[test]
    fn test_factory_builds_client() {
        let config = ProviderConfig::openai_with(
            OpenAIConfig::new("test-key").with_base_url("http://localhost:1"),
        );
        assert!(ClientFactory::create_client(config.clone()).is_ok());
        assert!(ClientFactory::create_clients(config).is_ok());
    }
}
