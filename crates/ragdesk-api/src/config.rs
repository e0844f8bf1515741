use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use ragdesk_graph::{ContextPolicy, GraphConfig, LLMConfig};
use ragdesk_retrieval::{IngestConfig, RetrieverConfig, SelectionPolicy};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub mongodb: MongoDbConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,

    // Secrets (from ENV only)
    #[serde(default)]
    pub mongodb_uri: String,
    #[serde(default)]
    pub openai_api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            request_timeout_secs: 300,
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub enabled: bool,
    pub origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            origins: vec!["*".to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MongoDbConfig {
    pub database: String,
}

impl Default for MongoDbConfig {
    fn default() -> Self {
        Self {
            database: "ragdesk".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub embedding_model: String,
    pub embedding_batch_size: usize,
    /// OpenAI-compatible endpoint; the public API when unset
    pub base_url: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.0,
            max_tokens: None,
            embedding_model: "text-embedding-3-small".to_string(),
            embedding_batch_size: 256,
            base_url: None,
        }
    }
}

impl From<&LlmConfig> for LLMConfig {
    fn from(config: &LlmConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: Some(config.temperature),
            max_tokens: config.max_tokens,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub candidate_count: usize,
    pub top_k: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Cross-encoder re-ranking; vector similarity is used when off
    pub rerank: bool,
    pub rerank_model: String,
    pub restrict_default_kb: bool,
    pub vector_index: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            candidate_count: 5,
            top_k: 3,
            chunk_size: 1000,
            chunk_overlap: 200,
            rerank: true,
            rerank_model: "cross-encoder/ms-marco-MiniLM-L-6-v2".to_string(),
            restrict_default_kb: false,
            vector_index: "vector_index".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub max_iterations: usize,
    pub timeout_secs: u64,
    pub history: ContextPolicy,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            timeout_secs: 300,
            history: ContextPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Mongodb,
    /// Process-local, lost on restart
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub upload_dir: PathBuf,
    /// Pages `ragdesk-ingest --web` loads into the default knowledge base
    pub web_urls: Vec<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            upload_dir: PathBuf::from("uploads"),
            web_urls: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{ENV}.toml (if ENV is set)
    /// 3. `RAGDESK_<SECTION>__<KEY>` environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let builder = ConfigLoader::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix("RAGDESK")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("cors.origins")
                    .with_list_parse_key("storage.web_urls"),
            );

        let mut cfg: Config = builder.build()?.try_deserialize()?;
        cfg.load_secrets()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load config from a specific path (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let cfg: Config = ConfigLoader::builder()
            .add_source(File::from(path.as_ref()))
            .build()?
            .try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn load_secrets(&mut self) -> Result<(), ConfigError> {
        self.openai_api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            ConfigError::Message("OPENAI_API_KEY environment variable is required".to_string())
        })?;

        match std::env::var("MONGODB_URI") {
            Ok(uri) => self.mongodb_uri = uri,
            Err(_) if self.storage.backend == StorageBackend::Mongodb => {
                return Err(ConfigError::Message(
                    "MONGODB_URI environment variable is required".to_string(),
                ))
            }
            Err(_) => {}
        }

        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            self.llm.base_url = Some(base_url);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let r = &self.retrieval;
        let problem = if r.candidate_count == 0 || r.top_k == 0 {
            Some("retrieval.candidate_count and retrieval.top_k must be positive".to_string())
        } else if r.top_k > r.candidate_count {
            Some(format!(
                "retrieval.top_k ({}) cannot exceed retrieval.candidate_count ({})",
                r.top_k, r.candidate_count
            ))
        } else if r.chunk_size == 0 {
            Some("retrieval.chunk_size must be positive".to_string())
        } else if r.chunk_overlap >= r.chunk_size {
            Some(format!(
                "retrieval.chunk_overlap ({}) must be smaller than retrieval.chunk_size ({})",
                r.chunk_overlap, r.chunk_size
            ))
        } else if self.llm.embedding_batch_size == 0 {
            Some("llm.embedding_batch_size must be positive".to_string())
        } else if self.agent.max_iterations == 0 {
            Some("agent.max_iterations must be positive".to_string())
        } else if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            Some(format!(
                "logging.format must be \"pretty\" or \"json\", got {:?}",
                self.logging.format
            ))
        } else {
            None
        };

        match problem {
            Some(message) => Err(ConfigError::Message(message)),
            None => Ok(()),
        }
    }

    pub fn retriever_config(&self) -> RetrieverConfig {
        RetrieverConfig {
            embedding_model: self.llm.embedding_model.clone(),
            candidate_count: self.retrieval.candidate_count,
            top_k: self.retrieval.top_k,
        }
    }

    pub fn ingest_config(&self) -> IngestConfig {
        IngestConfig {
            chunk_size: self.retrieval.chunk_size,
            chunk_overlap: self.retrieval.chunk_overlap,
            embedding_model: self.llm.embedding_model.clone(),
            embedding_batch_size: self.llm.embedding_batch_size,
            upload_dir: self.storage.upload_dir.clone(),
        }
    }

    pub fn graph_config(&self) -> GraphConfig {
        GraphConfig::new()
            .with_max_iterations(self.agent.max_iterations)
            .with_timeout(Duration::from_secs(self.agent.timeout_secs))
    }

    pub fn selection_policy(&self) -> SelectionPolicy {
        SelectionPolicy {
            restrict_default_kb: self.retrieval.restrict_default_kb,
        }
    }
}
